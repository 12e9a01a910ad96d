// 该文件是 Amenity Vision 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::{debug, info, warn};

use crate::{config::RenderConfig, error::RenderError, postprocess::BoxDrawSpec};

/// 按检测顺序循环使用的颜色
pub const PALETTE: [Rgb<u8>; 6] = [
  Rgb([0, 255, 0]),   // 绿色
  Rgb([0, 0, 255]),   // 蓝色
  Rgb([255, 0, 0]),   // 红色
  Rgb([0, 255, 255]), // 青色
  Rgb([255, 0, 255]), // 品红
  Rgb([255, 255, 0]), // 黄色
];

const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// 内置字体，`font_path` 可覆盖
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// 字体不可用时使用的 Hershey Simplex 近似度量（缩放为 1.0 时的像素值）
const HERSHEY_CAP_HEIGHT: f32 = 22.0;
const HERSHEY_ADVANCE: f32 = 17.5;
const HERSHEY_BASELINE: f32 = 10.0;

// TrueType 字体像素大小与缩放系数之比
const TRUETYPE_PX_PER_SCALE: f32 = 30.0;

fn embedded_font() -> Result<FontArc, RenderError> {
  Ok(FontArc::try_from_slice(EMBEDDED_FONT)?)
}

/// 将含端点的矩形限制在画布外扩一像素的范围内，可见像素不变
fn clipped_rect(left: i64, top: i64, right: i64, bottom: i64, (width, height): (u32, u32)) -> Option<Rect> {
  if right < left || bottom < top {
    return None;
  }
  let (w, h) = (i64::from(width), i64::from(height));
  let (left, right) = (left.clamp(-1, w), right.clamp(-1, w));
  let (top, bottom) = (top.clamp(-1, h), bottom.clamp(-1, h));
  Some(Rect::at(left as i32, top as i32).of_size((right - left + 1) as u32, (bottom - top + 1) as u32))
}

/// 第 `index` 个检测框的颜色
pub fn palette_color(index: usize) -> Rgb<u8> {
  PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
  pub width: u32,
  pub height: u32,
  pub baseline: u32,
}

/// 标签背景矩形（含端点）与文本左上角位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
  pub text_x: i32,
  pub text_y: i32,
  /// 标签因靠近图像顶部而翻转到框顶边之下
  pub flipped: bool,
}

impl LabelLayout {
  fn intersects(&self, (width, height): (u32, u32)) -> bool {
    self.right >= 0
      && self.bottom >= 0
      && i64::from(self.left) < i64::from(width)
      && i64::from(self.top) < i64::from(height)
  }
}

pub trait DrawDetectionOnImage {
  fn draw_detections_on_image(&self, image: &mut RgbImage, specs: &[BoxDrawSpec]);
}

/// 在副本上绘制检测框，不修改输入图像
#[derive(Clone)]
pub struct BoxRenderer {
  config: RenderConfig,
  font: Option<FontArc>,
}

impl std::fmt::Debug for BoxRenderer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoxRenderer")
      .field("config", &self.config)
      .field("font", &self.font.is_some())
      .finish()
  }
}

impl Default for BoxRenderer {
  fn default() -> Self {
    let font = embedded_font()
      .inspect_err(|e| warn!("内置字体加载失败, 标签仅绘制背景: {}", e))
      .ok();
    BoxRenderer {
      config: RenderConfig::default(),
      font,
    }
  }
}

impl BoxRenderer {
  pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
    let font = match &config.font_path {
      Some(path) => {
        info!("加载标签字体: {}", path.display());
        let data = std::fs::read(path)?;
        Some(FontArc::try_from_vec(data)?)
      }
      None => {
        debug!("使用内置字体 DejaVu Sans");
        Some(embedded_font()?)
      }
    };
    Ok(BoxRenderer { config, font })
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn config(&self) -> &RenderConfig {
    &self.config
  }

  fn font_px_scale(&self) -> PxScale {
    PxScale::from(self.config.font_scale * TRUETYPE_PX_PER_SCALE)
  }

  /// 测量标签文本占用的像素尺寸
  pub fn measure_text(&self, text: &str) -> TextMetrics {
    match &self.font {
      Some(font) => {
        let scale = self.font_px_scale();
        let (width, _) = text_size(scale, font, text);
        let scaled = font.as_scaled(scale);
        TextMetrics {
          width,
          height: scaled.ascent().ceil().max(0.0) as u32,
          baseline: (-scaled.descent()).ceil().max(0.0) as u32,
        }
      }
      None => {
        let scale = self.config.font_scale;
        let chars = text.chars().count() as f32;
        TextMetrics {
          width: (chars * HERSHEY_ADVANCE * scale).round() as u32 + self.config.font_thickness,
          height: (HERSHEY_CAP_HEIGHT * scale).round() as u32,
          baseline: (HERSHEY_BASELINE * scale).round() as u32,
        }
      }
    }
  }

  /// 计算标签背景位置：默认贴在框顶边之上；
  /// 若背景顶边会越过图像顶部，则翻转到框顶边之下
  pub fn label_layout(&self, bbox: &[i32; 4], metrics: &TextMetrics) -> LabelLayout {
    let padding = self.config.padding as i32;
    let label_width = i32::try_from(metrics.width)
      .unwrap_or(i32::MAX)
      .saturating_add(2 * padding);
    let label_height = i32::try_from(metrics.height.saturating_add(metrics.baseline))
      .unwrap_or(i32::MAX)
      .saturating_add(2 * padding);

    // 坐标未经裁剪，可能接近 i32 边界
    let left = bbox[0];
    let right = left.saturating_add(label_width);
    let (top, bottom, flipped) = if bbox[1].saturating_sub(label_height) < 0 {
      let anchor = bbox[1].max(0);
      (anchor, anchor.saturating_add(label_height), true)
    } else {
      (bbox[1] - label_height, bbox[1], false)
    };

    LabelLayout {
      left,
      top,
      right,
      bottom,
      text_x: left.saturating_add(padding),
      text_y: top.saturating_add(padding),
      flipped,
    }
  }

  fn draw_outline(&self, image: &mut RgbImage, bbox: &[i32; 4], color: Rgb<u8>) {
    let [x1, y1, x2, y2] = bbox.map(i64::from);
    let thickness = i64::from(self.config.line_thickness);
    // 线宽以名义边为中心
    let first = -((thickness - 1) / 2);
    for inset in first..first + thickness {
      let Some(rect) = clipped_rect(
        x1 + inset,
        y1 + inset,
        x2 - inset,
        y2 - inset,
        image.dimensions(),
      ) else {
        break;
      };
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  fn draw_spec(&self, image: &mut RgbImage, spec: &BoxDrawSpec) {
    let color = palette_color(spec.palette_index);
    self.draw_outline(image, &spec.bbox, color);

    let label = spec.label_text();
    let metrics = self.measure_text(&label);
    let layout = self.label_layout(&spec.bbox, &metrics);

    if !layout.intersects(image.dimensions()) {
      return;
    }
    if let Some(rect) = clipped_rect(
      layout.left.into(),
      layout.top.into(),
      layout.right.into(),
      layout.bottom.into(),
      image.dimensions(),
    ) {
      draw_filled_rect_mut(image, rect, color);
    }

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        LABEL_TEXT_COLOR,
        layout.text_x,
        layout.text_y,
        self.font_px_scale(),
        font,
        &label,
      );
    }
  }

  /// 返回绘制了全部检测框的新图像
  pub fn render(&self, image: &RgbImage, specs: &[BoxDrawSpec]) -> Result<RgbImage, RenderError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || image.as_raw().len() != width as usize * height as usize * 3 {
      return Err(RenderError::EmptyImage { width, height });
    }

    let mut annotated = image.clone();
    self.draw_detections_on_image(&mut annotated, specs);
    Ok(annotated)
  }
}

impl DrawDetectionOnImage for BoxRenderer {
  fn draw_detections_on_image(&self, image: &mut RgbImage, specs: &[BoxDrawSpec]) {
    for spec in specs {
      self.draw_spec(image, spec);
    }
    debug!("绘制了 {} 个检测框", specs.len());
  }
}
