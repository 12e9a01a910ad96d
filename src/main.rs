// 该文件是 Amenity Vision 项目的一部分。
// src/main.rs - 单次检测程序
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

mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use amenity_vision::{
  AmenityDetector, FromUrl, ModelHandle,
  input::ImageFileInput,
  output::{BoxRenderer, SaveImageFileOutput, encode_jpeg_data_uri},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  let config = args.detector_config();
  config.validate()?;

  info!("模型文件路径: {}", config.model_path.display());
  info!("输入来源: {}", args.input);
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }

  // 模型加载失败即终止启动
  let model = ModelHandle::load(&config.model_path).context("模型加载失败")?;
  let renderer = BoxRenderer::new(config.render.clone())?;
  let detector = AmenityDetector::new(Arc::new(model), renderer).with_defaults(config.options);

  let input = ImageFileInput::from_url(&args.input)?;
  // 仅指定 --draw-boxes 时，标注图像保存在输入图像旁
  let output = match &args.output {
    Some(url) => Some(SaveImageFileOutput::from_url(url)?),
    None if args.draw_boxes => Some(SaveImageFileOutput::annotated_beside(input.path())),
    None => None,
  };
  let mut options = detector.defaults();
  if output.is_some() || args.embed_image {
    options.draw_boxes = true;
  }

  info!("开始检测...");
  let result = detector.detect(input.bytes(), options)?;

  if let (Some(output), Some(image)) = (&output, &result.annotated_image) {
    output.save_image(image)?;
  }

  let annotated_image = match (&result.annotated_image, args.embed_image) {
    (Some(image), true) => Some(encode_jpeg_data_uri(image)?),
    (None, true) => {
      warn!("未生成标注图像, 跳过内嵌");
      None
    }
    _ => None,
  };

  println!("{}", serde_json::to_string_pretty(&result.body(annotated_image))?);

  Ok(())
}
