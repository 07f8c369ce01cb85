// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/alert.rs - 告警判定
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

use serde::Serialize;

/// 触发疲劳告警的标签（小写后完全相等）
pub const DROWSY_LABEL: &str = "drowsy";
/// 触发手机使用告警的标签（小写后完全相等）
pub const PHONE_LABEL: &str = "phone";

pub const DROWSINESS_MESSAGE: &str = "Drowsiness detected!";
pub const PHONE_USE_MESSAGE: &str = "Phone use detected!";
pub const NO_DETECTIONS_MESSAGE: &str = "No relevant detections found.";

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
  Info,
}

impl std::fmt::Display for Severity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
      Severity::Info => "info",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Alert {
  pub severity: Severity,
  pub message: &'static str,
}

/// 告警状态
///
/// `drowsiness` 与 `phone_use` 相互独立，可以同时成立；
/// `no_detections` 仅在标签序列为空时成立，此时另外两项必为假。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlertState {
  pub drowsiness: bool,
  pub phone_use: bool,
  pub no_detections: bool,
}

impl AlertState {
  /// 需要展示的告警，按 疲劳 / 手机 / 无检测 的顺序
  pub fn alerts(&self) -> Vec<Alert> {
    let mut alerts = Vec::with_capacity(2);
    if self.drowsiness {
      alerts.push(Alert {
        severity: Severity::Error,
        message: DROWSINESS_MESSAGE,
      });
    }
    if self.phone_use {
      alerts.push(Alert {
        severity: Severity::Warning,
        message: PHONE_USE_MESSAGE,
      });
    }
    if self.no_detections {
      alerts.push(Alert {
        severity: Severity::Info,
        message: NO_DETECTIONS_MESSAGE,
      });
    }
    alerts
  }
}

/// 根据检测标签判定告警状态
///
/// 只做小写后的完全匹配，`"drowsiness"` 或 `"using_phone"` 不会触发告警。
pub fn classify<S: AsRef<str>>(labels: &[S]) -> AlertState {
  if labels.is_empty() {
    return AlertState {
      no_detections: true,
      ..AlertState::default()
    };
  }

  let lowered: Vec<String> = labels.iter().map(|l| l.as_ref().to_lowercase()).collect();
  AlertState {
    drowsiness: lowered.iter().any(|l| l == DROWSY_LABEL),
    phone_use: lowered.iter().any(|l| l == PHONE_LABEL),
    no_detections: false,
  }
}
