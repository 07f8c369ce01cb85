// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/task.rs - 检测任务
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

use image::RgbImage;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  input::{InputError, Upload},
  labels::{LabelError, extract_labels},
  model::{DetectResult, Model},
  output::{Draw, Render, report::DetectionReport},
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("没有输入图像")]
  NoInput,
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("推理失败: {0}")]
  Inference(#[source] BoxError),
  #[error("标签提取失败: {0}")]
  Label(#[from] LabelError),
  #[error("输出失败: {0}")]
  Output(#[source] BoxError),
}

/// 一次上传的完整处理结果
#[derive(Debug, Clone)]
pub struct Analysis {
  pub result: DetectResult,
  pub annotated: RgbImage,
  pub report: DetectionReport,
}

/// 推理 -> 提取标签 -> 判定告警 -> 绘制标注图
pub fn analyze<M, ME>(model: &M, draw: &Draw, upload: &Upload) -> Result<Analysis, TaskError>
where
  M: Model<Input = RgbImage, Output = DetectResult, Error = ME>,
  ME: std::error::Error + Send + Sync + 'static,
{
  info!("开始推理: {}", upload.name);
  let now = std::time::Instant::now();
  let result = model
    .infer(&upload.image)
    .map_err(|e| TaskError::Inference(Box::new(e)))?;
  let elapsed = now.elapsed();
  info!("推理完成，耗时: {:.2?}，检测到 {} 个对象", elapsed, result.len());

  let labels = extract_labels([&result], model.class_names())?;
  let annotated = draw.draw_detection(&upload.image, &result, model.class_names());
  let report = DetectionReport::new(upload.name.clone(), labels, &result, elapsed);

  Ok(Analysis {
    result,
    annotated,
    report,
  })
}

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: &M, output: &O) -> Result<Self::Output, Self::Error>;
}

/// 单张图像：任何错误都直接返回
pub struct OneShotTask {
  draw: Draw,
}

impl OneShotTask {
  pub fn new(draw: Draw) -> Self {
    Self { draw }
  }
}

impl<I, M, ME, O, RE> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = (String, Result<Upload, InputError>)>,
  M: Model<Input = RgbImage, Output = DetectResult, Error = ME>,
  ME: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectionReport, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Output = DetectionReport;
  type Error = TaskError;

  fn run_task(self, mut input: I, model: &M, output: &O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let (_, upload) = input.next().ok_or(TaskError::NoInput)?;
    let upload = upload?;

    let analysis = analyze(model, &self.draw, &upload)?;
    output
      .render_result(&analysis.annotated, &analysis.report)
      .map_err(|e| TaskError::Output(Box::new(e)))?;

    info!("任务完成");
    Ok(analysis.report)
  }
}

/// 批处理的结果：成功的报告与失败的输入
#[derive(Debug, Default)]
pub struct BatchOutcome {
  pub reports: Vec<DetectionReport>,
  pub failures: Vec<(String, TaskError)>,
}

impl BatchOutcome {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }
}

/// 多张图像：单张失败只影响该输入，模型继续复用
pub struct BatchTask {
  draw: Draw,
}

impl BatchTask {
  pub fn new(draw: Draw) -> Self {
    Self { draw }
  }
}

impl<I, M, ME, O, RE> Task<I, M, O> for BatchTask
where
  I: Iterator<Item = (String, Result<Upload, InputError>)>,
  M: Model<Input = RgbImage, Output = DetectResult, Error = ME>,
  ME: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectionReport, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Output = BatchOutcome;
  type Error = TaskError;

  fn run_task(self, input: I, model: &M, output: &O) -> Result<Self::Output, Self::Error> {
    info!("开始批处理任务...");
    let mut outcome = BatchOutcome::default();

    for (index, (name, upload)) in input.enumerate() {
      info!("处理第 {} 张图像: {}", index + 1, name);
      let analysis = upload
        .map_err(TaskError::from)
        .and_then(|upload| analyze(model, &self.draw, &upload));
      let rendered = analysis.and_then(|analysis| {
        output
          .render_result(&analysis.annotated, &analysis.report)
          .map_err(|e| TaskError::Output(Box::new(e)))?;
        Ok(analysis.report)
      });

      match rendered {
        Ok(report) => outcome.reports.push(report),
        Err(err) => {
          error!("处理 {} 失败: {}", name, err);
          outcome.failures.push((name, err));
        }
      }
    }

    if outcome.reports.is_empty() && outcome.failures.is_empty() {
      return Err(TaskError::NoInput);
    }
    if !outcome.is_success() {
      warn!(
        "批处理完成: 成功 {} 张，失败 {} 张",
        outcome.reports.len(),
        outcome.failures.len()
      );
    } else {
      info!("批处理完成: 共 {} 张", outcome.reports.len());
    }
    Ok(outcome)
  }
}
