// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};

use xingyan::{
  FromUrl,
  alert::{DROWSY_LABEL, PHONE_LABEL},
  input::open_inputs,
  model::{Model, ModelLoader, YoloV8Builder},
  output::{Draw, OutputWrapper, report},
  task::{BatchTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入数量: {}", args.input.len());
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.iou);

  let builder = YoloV8Builder::from_url(&args.model)?
    .confidence(args.confidence)
    .iou(args.iou)
    .max_detections(args.max_detections);
  let loader = ModelLoader::new(builder);
  let model = loader.get_model().context("模型加载失败")?;

  let names = model.class_names();
  debug!("模型类别: {:?}", names.iter().collect::<Vec<_>>());
  if !names.contains_label(DROWSY_LABEL) && !names.contains_label(PHONE_LABEL) {
    warn!(
      "类别表中没有 '{}' 或 '{}'，告警永远不会触发，请核对模型类别",
      DROWSY_LABEL, PHONE_LABEL
    );
  }

  let output = args
    .output
    .as_ref()
    .map(|url| OutputWrapper::from_url(url).map(|o| o.per_source(args.input.len() > 1)))
    .transpose()?;
  let draw = Draw::new()?;
  let inputs = open_inputs(&args.input);

  let mut stdout = std::io::stdout().lock();
  if args.input.len() == 1 {
    let report = OneShotTask::new(draw).run_task(inputs, &*model, &output)?;
    report::display(&report, &mut stdout)?;
    if let Some(path) = &args.report {
      report::write_reports(path, std::slice::from_ref(&report))?;
    }
    return Ok(());
  }

  let outcome = BatchTask::new(draw).run_task(inputs, &*model, &output)?;
  for report in &outcome.reports {
    report::display(report, &mut stdout)?;
  }
  for (name, err) in &outcome.failures {
    eprintln!("Failed: {}: {}", name, err);
  }
  if let Some(path) = &args.report {
    report::write_reports(path, &outcome.reports)?;
  }
  if !outcome.is_success() {
    bail!("{} 个输入处理失败", outcome.failures.len());
  }

  Ok(())
}
