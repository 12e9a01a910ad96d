// 该文件是 Amenity Vision 项目的一部分。
// src/config.rs - 检测配置
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

use crate::error::ConfigError;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_LINE_THICKNESS: u32 = 3;
pub const DEFAULT_FONT_SCALE: f32 = 0.7;
pub const DEFAULT_PADDING: u32 = 5;
pub const DEFAULT_FONT_THICKNESS: u32 = 2;

/// 单次检测请求的选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
  pub confidence_threshold: f32,
  pub draw_boxes: bool,
}

impl Default for DetectOptions {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      draw_boxes: false,
    }
  }
}

impl DetectOptions {
  pub fn with_draw_boxes(mut self, draw_boxes: bool) -> Self {
    self.draw_boxes = draw_boxes;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let t = self.confidence_threshold;
    if !(t > 0.0 && t <= 1.0) {
      return Err(ConfigError::ConfidenceThreshold(t));
    }
    Ok(())
  }
}

/// 标注绘制参数
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
  /// 边框线宽（像素）
  pub line_thickness: u32,
  /// 字体缩放
  pub font_scale: f32,
  /// 字体笔画粗细
  pub font_thickness: u32,
  /// 标签背景内边距（像素）
  pub padding: u32,
  /// TrueType 字体文件，未设置时使用内置的 DejaVu Sans
  pub font_path: Option<PathBuf>,
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      line_thickness: DEFAULT_LINE_THICKNESS,
      font_scale: DEFAULT_FONT_SCALE,
      font_thickness: DEFAULT_FONT_THICKNESS,
      padding: DEFAULT_PADDING,
      font_path: None,
    }
  }
}

impl RenderConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.line_thickness == 0 {
      return Err(ConfigError::LineThickness);
    }
    if !(self.font_scale > 0.0 && self.font_scale.is_finite()) {
      return Err(ConfigError::FontScale(self.font_scale));
    }
    Ok(())
  }
}

/// 启动时使用的完整配置
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  pub model_path: PathBuf,
  pub options: DetectOptions,
  pub render: RenderConfig,
}

impl DetectorConfig {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      options: DetectOptions::default(),
      render: RenderConfig::default(),
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.options.validate()?;
    self.render.validate()
  }
}
