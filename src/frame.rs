// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/frame.rs - Letterbox NCHW 帧定义
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

use image::{Rgb, RgbImage, imageops::FilterType};

const RGB_CHANNELS: usize = 3;
const LETTERBOX_FILL: u8 = 114;

/// 等比缩放并居中填充到正方形模型输入后的帧，数据为 NCHW `f32` (0..1)
#[derive(Debug, Clone)]
pub struct LetterboxFrame {
  data: Box<[f32]>,
  size: u32,
  scale: f32,
  pad: (f32, f32),
  original: (u32, u32),
}

impl LetterboxFrame {
  /// 从 RGB 图像构造，`size` 为模型输入边长。零尺寸图像返回 `None`。
  pub fn from_image(image: &RgbImage, size: u32) -> Option<Self> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || size == 0 {
      return None;
    }

    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) as f32 / 2.0;
    let pad_y = (size - new_h) as f32 / 2.0;

    let resized = if (new_w, new_h) == (width, height) {
      image.clone()
    } else {
      image::imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    let mut canvas = RgbImage::from_pixel(size, size, Rgb([LETTERBOX_FILL; 3]));
    image::imageops::replace(
      &mut canvas,
      &resized,
      pad_x.floor() as i64,
      pad_y.floor() as i64,
    );

    let plane = (size as usize) * (size as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
      let idx = (y as usize) * (size as usize) + (x as usize);
      for c in 0..RGB_CHANNELS {
        data[c * plane + idx] = pixel[c] as f32 / 255.0;
      }
    }

    Some(Self {
      data: data.into_boxed_slice(),
      size,
      scale,
      pad: (pad_x.floor(), pad_y.floor()),
      original: (width, height),
    })
  }

  pub fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn scale(&self) -> f32 {
    self.scale
  }

  pub fn pad(&self) -> (f32, f32) {
    self.pad
  }

  pub fn original_dimensions(&self) -> (u32, u32) {
    self.original
  }

  /// 将模型输入坐标系下的 `[x_min, y_min, x_max, y_max]` 映射回原图，并归一化
  pub fn unletterbox(&self, bbox: [f32; 4]) -> [f32; 4] {
    let (w, h) = (self.original.0 as f32, self.original.1 as f32);
    let (pad_x, pad_y) = self.pad;
    let x_min = ((bbox[0] - pad_x) / self.scale).clamp(0.0, w);
    let y_min = ((bbox[1] - pad_y) / self.scale).clamp(0.0, h);
    let x_max = ((bbox[2] - pad_x) / self.scale).clamp(0.0, w);
    let y_max = ((bbox[3] - pad_y) / self.scale).clamp(0.0, h);
    [x_min / w, y_min / h, x_max / w, y_max / h]
  }
}
