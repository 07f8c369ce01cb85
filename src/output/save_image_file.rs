// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, report::DetectionReport},
  url_local_path,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  per_source: bool,
  written: Mutex<HashSet<PathBuf>>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: url_local_path(uri),
      per_source: false,
      written: Mutex::new(HashSet::new()),
    })
  }
}

impl SaveImageFileOutput {
  /// 多个输入共用一个输出路径时，在文件名后追加输入文件名
  pub fn per_source(mut self, per_source: bool) -> Self {
    self.per_source = per_source;
    self
  }

  pub fn path_for(&self, source: &str) -> PathBuf {
    self.numbered_path(source, 1)
  }

  /// 为本次输出分配文件名；同一输出中重复的文件名追加序号 `-2`, `-3` ...
  pub fn reserve_path(&self, source: &str) -> PathBuf {
    if !self.per_source {
      return self.path.clone();
    }

    let mut written = self
      .written
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let mut occurrence = 1;
    let mut path = self.numbered_path(source, occurrence);
    while written.contains(&path) {
      occurrence += 1;
      path = self.numbered_path(source, occurrence);
    }
    written.insert(path.clone());
    path
  }

  fn numbered_path(&self, source: &str, occurrence: u32) -> PathBuf {
    if !self.per_source {
      return self.path.clone();
    }

    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let source_stem = Path::new(source)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "input".to_string());
    let extension = self
      .path
      .extension()
      .map(|e| e.to_string_lossy().into_owned())
      .unwrap_or_else(|| "png".to_string());

    let name = if occurrence > 1 {
      format!("{}-{}-{}.{}", stem, source_stem, occurrence, extension)
    } else {
      format!("{}-{}.{}", stem, source_stem, extension)
    };
    self.path.with_file_name(name)
  }

  fn save_image(&self, path: &Path, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(path)?;
    info!("保存标注图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<RgbImage, DetectionReport> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &DetectionReport) -> Result<(), Self::Error> {
    let path = self.reserve_path(&result.source);
    self.save_image(&path, frame)
  }
}
