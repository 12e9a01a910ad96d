// 该文件是 Amenity Vision 项目的一部分。
// src/pipeline.rs - 检测流水线
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

use std::{sync::Arc, time::Instant};

use image::RgbImage;
use tracing::{debug, info};

use crate::{
  config::DetectOptions,
  error::{DetectError, InferenceError},
  input::decode_image,
  model::{DetectResult, Model},
  output::BoxRenderer,
  postprocess::post_process,
  response::DetectionResult,
};

/// 启动时构造一次的检测服务，请求之间共享同一模型句柄
pub struct AmenityDetector<M> {
  model: Arc<M>,
  renderer: BoxRenderer,
  defaults: DetectOptions,
}

impl<M> Clone for AmenityDetector<M> {
  fn clone(&self) -> Self {
    AmenityDetector {
      model: Arc::clone(&self.model),
      renderer: self.renderer.clone(),
      defaults: self.defaults,
    }
  }
}

impl<M> AmenityDetector<M>
where
  M: Model<Input = RgbImage, Output = DetectResult, Error = InferenceError>,
{
  pub fn new(model: Arc<M>, renderer: BoxRenderer) -> Self {
    AmenityDetector {
      model,
      renderer,
      defaults: DetectOptions::default(),
    }
  }

  pub fn with_defaults(mut self, defaults: DetectOptions) -> Self {
    self.defaults = defaults;
    self
  }

  pub fn defaults(&self) -> DetectOptions {
    self.defaults
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  /// 解码图像字节后执行检测
  pub fn detect(&self, bytes: &[u8], options: DetectOptions) -> Result<DetectionResult, DetectError> {
    options.validate()?;
    let image = decode_image(bytes)?;
    self.run(&image, options)
  }

  pub fn detect_image(
    &self,
    image: &RgbImage,
    options: DetectOptions,
  ) -> Result<DetectionResult, DetectError> {
    options.validate()?;
    self.run(image, options)
  }

  fn run(&self, image: &RgbImage, options: DetectOptions) -> Result<DetectionResult, DetectError> {
    let now = Instant::now();
    let raw = self.model.infer(image, options.confidence_threshold)?;
    let infer_elapsed = now.elapsed();
    debug!("推理完成，耗时: {:.2?}", infer_elapsed);

    let processed = post_process(&raw, self.model.labels());

    let annotated_image = if options.draw_boxes {
      let annotated = self.renderer.render(image, &processed.draw_specs)?;
      debug!("渲染完成，耗时: {:.2?}", now.elapsed() - infer_elapsed);
      Some(annotated)
    } else {
      None
    };

    let result = DetectionResult::assemble(processed.detections, annotated_image);
    info!(
      "检测到 {} 个设施，总耗时: {:.2?}",
      result.count(),
      now.elapsed()
    );
    Ok(result)
  }
}
