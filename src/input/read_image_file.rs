// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::Upload, url_local_path};

/// 允许上传的文件扩展名
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Unsupported image format: {0}")]
  UnsupportedFormat(String),
}

/// 单张图像输入，迭代一次后耗尽
pub struct ImageFileInput {
  name: String,
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_local_path(url);
    let extension = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_lowercase)
      .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
      return Err(ImageFileInputError::UnsupportedFormat(
        path.display().to_string(),
      ));
    }

    let bytes = std::fs::read(&path)?;
    Self::from_bytes(path.display().to_string(), &bytes)
  }
}

impl ImageFileInput {
  /// 从上传的字节流解码，只接受 JPEG / PNG
  pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ImageFileInputError> {
    let name = name.into();
    let format = image::guess_format(bytes)?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
      return Err(ImageFileInputError::UnsupportedFormat(format!(
        "{} ({:?})",
        name, format
      )));
    }

    let image = image::load_from_memory_with_format(bytes, format)?.to_rgb8();
    debug!(
      "解码图像 {}: {}x{} {:?}",
      name,
      image.width(),
      image.height(),
      format
    );

    Ok(ImageFileInput {
      name,
      image: Some(image),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl Iterator for ImageFileInput {
  type Item = Upload;

  fn next(&mut self) -> Option<Self::Item> {
    let name = self.name.clone();
    self.image.take().map(|image| Upload { name, image })
  }
}
