// 该文件是 Amenity Vision 项目的一部分。
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
// Copyright (C) 2026 Amenity Vision Authors

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use amenity_vision::{
  DetectorConfig,
  config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FONT_SCALE, DEFAULT_LINE_THICKNESS, DEFAULT_PADDING},
};

/// 设施检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径（相对路径按当前工作目录解析）
  #[arg(long, value_name = "MODEL")]
  pub model: PathBuf,

  /// 输入图像，例如 image:///data/room.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 标注图像输出路径，例如 image:///data/room_annotated.jpg
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 置信度阈值 (0.0, 1.0]
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 绘制检测框；未指定 --output 时保存为输入图像旁的 <名称>_annotated.jpg
  #[arg(long)]
  pub draw_boxes: bool,

  /// 在 JSON 结果中内嵌标注图像（data URI）
  #[arg(long)]
  pub embed_image: bool,

  /// 边框线宽（像素）
  #[arg(long, default_value_t = DEFAULT_LINE_THICKNESS, value_name = "PX")]
  pub line_thickness: u32,

  /// 标签字体缩放
  #[arg(long, default_value_t = DEFAULT_FONT_SCALE, value_name = "SCALE")]
  pub font_scale: f32,

  /// 标签背景内边距（像素）
  #[arg(long, default_value_t = DEFAULT_PADDING, value_name = "PX")]
  pub padding: u32,

  /// 标签字体文件（TTF/OTF）
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
}

impl Args {
  pub fn detector_config(&self) -> DetectorConfig {
    let mut config = DetectorConfig::new(&self.model);
    config.options.confidence_threshold = self.confidence;
    config.options.draw_boxes = self.draw_boxes;
    config.render.line_thickness = self.line_thickness;
    config.render.font_scale = self.font_scale;
    config.render.padding = self.padding;
    config.render.font_path = self.font.clone();
    config
  }
}
