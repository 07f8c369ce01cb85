// 该文件是 Xingyan （醒眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// 疲劳 / 手机使用检测（图像上传）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// YOLOv8 ONNX 模型路径，类别文件默认为同名 .toml
  /// 例如: yolov8:best.onnx 或 yolov8:///opt/models/best.onnx?labels=/opt/models/names.toml
  #[arg(long, env = "XINGYAN_MODEL", default_value = "yolov8:best.onnx", value_name = "MODEL")]
  pub model: Url,

  /// 输入图像（jpg, jpeg, png），可重复指定，也可用逗号分隔
  /// 例如: image:photo.jpg 或 image:///data/photo.png
  /// 路径中的逗号需写作 %2C，例如 image:a%2Cb.jpg
  #[arg(
    long,
    env = "XINGYAN_INPUT",
    value_delimiter = ',',
    required = true,
    value_name = "SOURCE"
  )]
  pub input: Vec<Url>,

  /// 标注结果输出
  /// - image:<path> 保存标注图像
  /// - folder:<dir>[?always] 按日期目录记录标注图像与 JSON
  #[arg(long, env = "XINGYAN_OUTPUT", value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, env = "XINGYAN_CONFIDENCE", default_value = "0.25", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, env = "XINGYAN_IOU", default_value = "0.7", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每张图像最多保留的检测数
  #[arg(long, default_value = "300", value_name = "COUNT")]
  pub max_detections: usize,

  /// 将检测报告写入 JSON 文件
  #[arg(long, env = "XINGYAN_REPORT", value_name = "FILE")]
  pub report: Option<PathBuf>,
}
