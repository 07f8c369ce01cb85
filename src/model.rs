// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/model.rs - 模型
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

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 模型加载时固定下来的类别名称表
  fn class_names(&self) -> &ClassNameTable;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，相对原图归一化
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn new(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

#[derive(Error, Debug)]
pub enum ClassNameTableError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别文件解析错误: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("无效的类别索引: {0}")]
  InvalidIndex(String),
}

#[derive(Deserialize)]
struct ClassNameFile {
  names: BTreeMap<String, String>,
}

/// 类别名称表：类别索引 -> 标签
///
/// 构造后不可修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNameTable {
  names: BTreeMap<u32, String>,
}

impl ClassNameTable {
  pub fn get(&self, class_id: u32) -> Option<&str> {
    self.names.get(&class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
    self.names.iter().map(|(id, name)| (*id, name.as_str()))
  }

  /// 是否存在与 `label` 小写后完全相同的类别名
  pub fn contains_label(&self, label: &str) -> bool {
    self.names.values().any(|name| name.to_lowercase() == label)
  }

  pub fn from_toml_str(content: &str) -> Result<Self, ClassNameTableError> {
    let file: ClassNameFile = toml::from_str(content)?;
    let names = file
      .names
      .into_iter()
      .map(|(key, name)| {
        key
          .trim()
          .parse::<u32>()
          .map(|id| (id, name))
          .map_err(|_| ClassNameTableError::InvalidIndex(key))
      })
      .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(Self { names })
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassNameTableError> {
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }
}

impl<S: Into<String>> FromIterator<(u32, S)> for ClassNameTable {
  fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
    Self {
      names: iter.into_iter().map(|(id, name)| (id, name.into())).collect(),
    }
  }
}

pub mod loader;
pub use self::loader::{BuildModel, ModelLoader};

#[cfg(feature = "model_yolov8")]
mod yolov8;
#[cfg(feature = "model_yolov8")]
pub use self::yolov8::{YoloV8, YoloV8Builder, YoloV8Error};
