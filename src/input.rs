// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/input.rs - 图像输入
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod read_image_file;
pub use self::read_image_file::{ACCEPTED_EXTENSIONS, ImageFileInput, ImageFileInputError};

/// 一次上传：来源名称与解码后的 RGB 图像
#[derive(Debug, Clone)]
pub struct Upload {
  pub name: String,
  pub image: RgbImage,
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Upload;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}

/// 依次打开多个输入，每个输入单独报告错误
pub fn open_inputs(urls: &[Url]) -> impl Iterator<Item = (String, Result<Upload, InputError>)> + '_ {
  urls.iter().flat_map(|url| {
    let uploads: Vec<(String, Result<Upload, InputError>)> = match InputWrapper::from_url(url) {
      Ok(input) => input.map(|upload| (upload.name.clone(), Ok(upload))).collect(),
      Err(err) => vec![(url.to_string(), Err(err))],
    };
    uploads
  })
}
