// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::LetterboxFrame,
  model::{BuildModel, ClassNameTable, ClassNameTableError, DetectItem, DetectResult, Model},
  url_local_path,
};

const YOLOV8_NUM_INPUTS: usize = 1;
const YOLOV8_BOX_ROWS: usize = 4;
const YOLOV8_INPUT_SIZE: u32 = 640;
const YOLOV8_CONF_THRESH: f32 = 0.25;
const YOLOV8_IOU_THRESH: f32 = 0.7;
const YOLOV8_MAX_DET: usize = 300;

type YoloPlan = TypedRunnableModel<TypedModel>;

#[derive(Error, Debug)]
pub enum YoloV8Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("类别文件错误: {0}")]
  ClassNameError(#[from] ClassNameTableError),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理后端错误: {0:#}")]
  TractError(TractError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入图像尺寸无效: {0}x{1}")]
  EmptyImage(u32, u32),
  #[error("模型输出形状异常: {0:?}")]
  UnexpectedOutput(Vec<usize>),
}

impl From<TractError> for YoloV8Error {
  fn from(err: TractError) -> Self {
    YoloV8Error::TractError(err)
  }
}

/// 后处理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessParams {
  pub confidence: f32,
  pub iou: f32,
  pub max_detections: usize,
}

impl Default for PostprocessParams {
  fn default() -> Self {
    Self {
      confidence: YOLOV8_CONF_THRESH,
      iou: YOLOV8_IOU_THRESH,
      max_detections: YOLOV8_MAX_DET,
    }
  }
}

pub struct YoloV8 {
  plan: YoloPlan,
  names: ClassNameTable,
  input_size: u32,
  params: PostprocessParams,
}

#[derive(Debug, Clone)]
pub struct YoloV8Builder {
  model_path: PathBuf,
  labels_path: PathBuf,
  input_size: u32,
  params: PostprocessParams,
}

impl FromUrlWithScheme for YoloV8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for YoloV8Builder {
  type Error = YoloV8Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloV8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let model_path = url_local_path(url);
    if model_path.as_os_str().is_empty() {
      return Err(YoloV8Error::ModelPathError("模型路径为空".to_string()));
    }

    let mut builder = YoloV8Builder::new(model_path);
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "labels" => builder.labels_path = PathBuf::from(value.as_ref()),
        "imgsz" => builder.input_size = parse_query(&key, &value)?,
        "conf" => builder.params.confidence = parse_query(&key, &value)?,
        "iou" => builder.params.iou = parse_query(&key, &value)?,
        "max_det" => builder.params.max_detections = parse_query(&key, &value)?,
        other => warn!("忽略未知的模型参数: {}", other),
      }
    }

    Ok(builder)
  }
}

fn parse_query<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, YoloV8Error> {
  value
    .parse()
    .map_err(|_| YoloV8Error::ModelPathError(format!("参数 {} 的值无效: {}", key, value)))
}

impl YoloV8Builder {
  /// 类别文件默认与权重文件同名，扩展名为 `.toml`
  pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
    let model_path = model_path.into();
    let labels_path = model_path.with_extension("toml");
    Self {
      model_path,
      labels_path,
      input_size: YOLOV8_INPUT_SIZE,
      params: PostprocessParams::default(),
    }
  }

  pub fn labels<P: Into<PathBuf>>(mut self, labels_path: P) -> Self {
    self.labels_path = labels_path.into();
    self
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.params.confidence = confidence;
    self
  }

  pub fn iou(mut self, iou: f32) -> Self {
    self.params.iou = iou;
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.params.max_detections = max_detections;
    self
  }

  pub fn model_path(&self) -> &std::path::Path {
    &self.model_path
  }

  pub fn labels_path(&self) -> &std::path::Path {
    &self.labels_path
  }
}

impl BuildModel for YoloV8Builder {
  type Model = YoloV8;
  type Error = YoloV8Error;

  fn build(&self) -> Result<YoloV8, YoloV8Error> {
    info!("加载类别文件: {}", self.labels_path.display());
    let names = ClassNameTable::from_file(&self.labels_path)?;
    debug!("类别数量: {}", names.len());

    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = tract_onnx::onnx().model_for_read(&mut model_data.as_slice())?;
    if model.inputs.len() != YOLOV8_NUM_INPUTS {
      return Err(YoloV8Error::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLOV8_NUM_INPUTS,
        model.inputs.len()
      )));
    }
    if model.outputs.is_empty() {
      return Err(YoloV8Error::ModelInvalid("模型没有输出".to_string()));
    }

    let size = self.input_size as usize;
    let typed = model
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )?
      .into_optimized()?;

    if let Some(shape) = typed.output_fact(0)?.shape.as_concrete() {
      debug!("模型输出形状: {:?}", shape);
      let (rows, _) = output_layout(shape, names.len())?;
      let num_classes = rows - YOLOV8_BOX_ROWS;
      if num_classes != names.len() {
        warn!(
          "模型类别数 {} 与类别文件条目数 {} 不一致，请确认模型为未做 NMS 的 [1, 4 + nc, anchors] 导出",
          num_classes,
          names.len()
        );
      }
    }

    let plan = typed.into_runnable()?;
    info!("模型加载完成");

    Ok(YoloV8 {
      plan,
      names,
      input_size: self.input_size,
      params: self.params,
    })
  }
}

impl Model for YoloV8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = YoloV8Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let frame = LetterboxFrame::from_image(input, self.input_size)
      .ok_or(YoloV8Error::EmptyImage(input.width(), input.height()))?;

    debug!("设置模型输入");
    let size = self.input_size as usize;
    let tensor = Tensor::from_shape(&[1, frame.channels(), size, size], frame.as_nchw())?;

    debug!("执行模型推理");
    let outputs = self.plan.run(tvec!(tensor.into()))?;

    debug!("获取模型输出");
    let output = outputs
      .first()
      .ok_or_else(|| YoloV8Error::UnexpectedOutput(Vec::new()))?
      .to_array_view::<f32>()?;
    let (rows, anchors) = output_layout(output.shape(), self.names.len())?;
    let data: Vec<f32> = output.iter().copied().collect();

    Ok(postprocess(&data, rows, anchors, &frame, &self.params))
  }

  fn class_names(&self) -> &ClassNameTable {
    &self.names
  }
}

/// 校验输出形状为 `[1, 4 + nc, anchors]`，返回 `(4 + nc, anchors)`
///
/// 行数多于 anchor 数且与类别表不符时，视为已做 NMS 的 `[1, N, 6]` 一类导出并拒绝。
fn output_layout(shape: &[usize], num_classes: usize) -> Result<(usize, usize), YoloV8Error> {
  match shape {
    [1, rows, anchors] if *rows > YOLOV8_BOX_ROWS => {
      if rows - YOLOV8_BOX_ROWS != num_classes && rows > anchors {
        return Err(YoloV8Error::UnexpectedOutput(shape.to_vec()));
      }
      Ok((*rows, *anchors))
    }
    _ => Err(YoloV8Error::UnexpectedOutput(shape.to_vec())),
  }
}

/// 解码 `[4 + nc, anchors]` 的输出：选最高类别，阈值过滤，按类别做 NMS，映射回原图
fn postprocess(
  output: &[f32],
  rows: usize,
  anchors: usize,
  frame: &LetterboxFrame,
  params: &PostprocessParams,
) -> DetectResult {
  debug!("后处理模型输出");
  let num_classes = rows - YOLOV8_BOX_ROWS;
  let at = |row: usize, anchor: usize| output[row * anchors + anchor];

  let mut candidates = Vec::new();
  for anchor in 0..anchors {
    let (class_id, score) = (0..num_classes)
      .map(|c| (c, at(YOLOV8_BOX_ROWS + c, anchor)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score < params.confidence {
      continue;
    }

    let cx = at(0, anchor);
    let cy = at(1, anchor);
    let w = at(2, anchor);
    let h = at(3, anchor);
    candidates.push(DetectItem {
      class_id: class_id as u32,
      score,
      bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  let mut items = nms(candidates, params.iou);
  items.truncate(params.max_detections);
  for item in items.iter_mut() {
    item.bbox = frame.unletterbox(item.bbox);
  }

  debug!("检测到 {} 个物体", items.len());
  debug!("检测结果: {:?}", items);

  DetectResult::new(items)
}

/// 按类别的非极大值抑制，结果按置信度降序
fn nms(mut candidates: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<DetectItem> = Vec::new();
  for candidate in candidates {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
