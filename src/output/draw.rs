// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;

use crate::model::{ClassNameTable, DetectItem, DetectResult};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const PALETTE_SIZE: usize = 20;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法加载字体: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 检测结果绘制工具
pub struct Draw {
  font: FontArc,
  font_scale: PxScale,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  colors: Vec<Rgb<u8>>,
}

impl Draw {
  pub fn new() -> Result<Self, DrawError> {
    let font_data: &'static [u8] = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    let colors = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Ok(Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      colors,
    })
  }

  pub fn color_of(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  /// 返回绘制了检测框与标签的新图像，原图不变
  pub fn draw_detection(
    &self,
    image: &RgbImage,
    result: &DetectResult,
    names: &ClassNameTable,
  ) -> RgbImage {
    let mut canvas = image.clone();
    for item in result.items.iter() {
      let label = match names.get(item.class_id) {
        Some(name) => name.to_string(),
        None => format!("#{}", item.class_id),
      };
      self.draw_bbox_with_label(&mut canvas, item, &label);
    }
    canvas
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem, label: &str) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }
    let (w, h) = (image.width() as f32, image.height() as f32);
    let color = self.color_of(item.class_id);

    let x_min = ((item.bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((item.bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((item.bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((item.bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框加粗为 2 像素
    let width = (x_max - x_min + 1) as u32;
    let height = (y_max - y_min + 1) as u32;
    draw_hollow_rect_mut(image, Rect::at(x_min, y_min).of_size(width, height), color);
    if width > 2 && height > 2 {
      draw_hollow_rect_mut(
        image,
        Rect::at(x_min + 1, y_min + 1).of_size(width - 2, height - 2),
        color,
      );
    }

    let caption = format!("{} {:.2}", label, item.score);
    let text_width = (caption.chars().count() as f32 * self.label_char_width) as i32;
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(w as i32 - label_x).max(0) as u32;
    let label_height = self.label_text_height as u32;

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + self.label_text_vertical_padding,
        self.font_scale,
        &self.font,
        &caption,
      );
    }
  }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(class_id: u32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id,
      score: 0.87,
      bbox,
    }
  }

  #[test]
  fn draws_on_copy_only() {
    let draw = Draw::new().unwrap();
    let image = RgbImage::new(100, 100);
    let names: ClassNameTable = [(0, "drowsy")].into_iter().collect();
    let result = DetectResult::new(vec![item(0, [0.2, 0.4, 0.8, 0.9])]);

    let annotated = draw.draw_detection(&image, &result, &names);

    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    assert_eq!(annotated.dimensions(), image.dimensions());
    // 左边框
    assert_eq!(*annotated.get_pixel(20, 70), draw.color_of(0));
    // 框内部保持原样
    assert_eq!(*annotated.get_pixel(50, 70), Rgb([0, 0, 0]));
  }

  #[test]
  fn empty_result_is_identical_copy() {
    let draw = Draw::new().unwrap();
    let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
    let annotated = draw.draw_detection(&image, &DetectResult::default(), &ClassNameTable::default());
    assert_eq!(annotated, image);
  }

  #[test]
  fn unknown_class_and_degenerate_boxes_do_not_panic() {
    let draw = Draw::new().unwrap();
    let image = RgbImage::new(10, 10);
    let result = DetectResult::new(vec![
      item(42, [0.0, 0.0, 1.0, 1.0]),
      item(1, [0.5, 0.5, 0.5, 0.5]),
    ]);
    let annotated = draw.draw_detection(&image, &result, &ClassNameTable::default());
    assert_ne!(annotated, image);
  }

  #[test]
  fn palette_wraps() {
    let draw = Draw::new().unwrap();
    assert_eq!(draw.color_of(3), draw.color_of(3 + PALETTE_SIZE as u32));
  }
}
