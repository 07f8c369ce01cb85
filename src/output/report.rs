// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/output/report.rs - 检测报告与展示
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{io::Write, path::Path, time::Duration};

use serde::Serialize;

use crate::{
  alert::{Alert, AlertState, classify},
  labels::label_text,
  model::DetectResult,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4],
}

/// 单次上传的检测报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
  pub source: String,
  pub labels: Vec<String>,
  pub label_text: String,
  pub state: AlertState,
  pub alerts: Vec<Alert>,
  pub detections: Vec<DetectionRecord>,
  pub elapsed_ms: u128,
}

impl DetectionReport {
  /// `labels` 须由 `extract_labels` 从 `result` 得到，两者一一对应
  pub fn new(
    source: impl Into<String>,
    labels: Vec<String>,
    result: &DetectResult,
    elapsed: Duration,
  ) -> Self {
    let state = classify(&labels);
    let detections = result
      .items
      .iter()
      .zip(labels.iter())
      .map(|(item, label)| DetectionRecord {
        label: label.clone(),
        score: item.score,
        bbox: item.bbox,
      })
      .collect();

    Self {
      source: source.into(),
      label_text: label_text(&labels),
      labels,
      alerts: state.alerts(),
      state,
      detections,
      elapsed_ms: elapsed.as_millis(),
    }
  }

  pub fn has_detections(&self) -> bool {
    !self.labels.is_empty()
  }
}

/// 在终端展示报告
pub fn display<W: Write>(report: &DetectionReport, mut writer: W) -> std::io::Result<()> {
  writeln!(writer, "Source: {}", report.source)?;
  writeln!(writer, "Detected classes: {}", report.label_text)?;
  for alert in &report.alerts {
    writeln!(writer, "[{}] {}", alert.severity, alert.message)?;
  }
  Ok(())
}

/// 将报告写为 JSON 数组
pub fn write_reports<P: AsRef<Path>>(path: P, reports: &[DetectionReport]) -> std::io::Result<()> {
  let path = path.as_ref();
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  let json = serde_json::to_string_pretty(reports)?;
  std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alert::Severity;
  use crate::model::DetectItem;

  fn result_of(n: usize) -> DetectResult {
    DetectResult::new(
      (0..n)
        .map(|i| DetectItem {
          class_id: i as u32,
          score: 0.5,
          bbox: [0.1, 0.1, 0.2, 0.2],
        })
        .collect(),
    )
  }

  #[test]
  fn no_detections_report() {
    let report = DetectionReport::new("a.jpg", vec![], &result_of(0), Duration::from_millis(12));
    assert_eq!(report.label_text, "None");
    assert!(report.state.no_detections);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].severity, Severity::Info);
    assert_eq!(report.elapsed_ms, 12);

    let mut out = Vec::new();
    display(&report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(
      text,
      "Source: a.jpg\nDetected classes: None\n[info] No relevant detections found.\n"
    );
  }

  #[test]
  fn both_alerts_displayed() {
    let labels = vec!["phone".to_string(), "drowsy".to_string()];
    let report = DetectionReport::new("b.png", labels, &result_of(2), Duration::ZERO);
    assert_eq!(report.label_text, "phone, drowsy");
    assert_eq!(report.detections[1].label, "drowsy");

    let mut out = Vec::new();
    display(&report, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[error] Drowsiness detected!"));
    assert!(text.contains("[warning] Phone use detected!"));
    assert!(!text.contains("[info]"));
  }

  #[test]
  fn json_report_round_trip_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/report.json");
    let report = DetectionReport::new("c.jpg", vec!["drowsy".into()], &result_of(1), Duration::ZERO);
    write_reports(&path, &[report]).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value[0]["source"], "c.jpg");
    assert_eq!(value[0]["label_text"], "drowsy");
    assert_eq!(value[0]["state"]["drowsiness"], true);
    assert_eq!(value[0]["alerts"][0]["severity"], "error");
  }
}
