// 该文件是 Amenity Vision 项目的一部分。
// src/postprocess.rs - 检测结果后处理
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

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::model::{DetectResult, LabelTable, RawDetection};

/// 对外报告的置信度保留的小数位数
pub const REPORTED_CONFIDENCE_DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  /// 按角点构造，保证 x1 <= x2、y1 <= y2，坐标不裁剪到图像范围
  pub fn from_xyxy(xyxy: [f32; 4]) -> Self {
    BBox {
      x1: xyxy[0].min(xyxy[2]),
      y1: xyxy[1].min(xyxy[3]),
      x2: xyxy[0].max(xyxy[2]),
      y2: xyxy[1].max(xyxy[3]),
    }
  }

  /// 向零截断的整数坐标，供绘制使用
  pub fn truncated(&self) -> [i32; 4] {
    [self.x1 as i32, self.y1 as i32, self.x2 as i32, self.y2 as i32]
  }
}

/// 一个检测到的设施。`confidence` 保存未经舍入的原始值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  #[serde(rename = "amenity")]
  pub label: String,
  #[serde(serialize_with = "serialize_reported_confidence")]
  pub confidence: f32,
  pub bbox: BBox,
}

impl Detection {
  /// 对外报告的置信度（三位小数）
  pub fn reported_confidence(&self) -> f64 {
    round_to(self.confidence, REPORTED_CONFIDENCE_DECIMALS)
  }
}

fn round_to(value: f32, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value as f64 * factor).round() / factor
}

fn serialize_reported_confidence<S: Serializer>(confidence: &f32, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(round_to(*confidence, REPORTED_CONFIDENCE_DECIMALS))
}

/// 仅供绘制使用的检测框投影
#[derive(Debug, Clone, PartialEq)]
pub struct BoxDrawSpec {
  pub bbox: [i32; 4], // [x_min, y_min, x_max, y_max]
  pub label: String,
  pub confidence: f32,
  pub palette_index: usize,
}

impl BoxDrawSpec {
  /// 绘制在图像上的标签文本，置信度取两位小数
  pub fn label_text(&self) -> String {
    format!("{} {:.2}", self.label, self.confidence)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostProcessed {
  pub detections: Vec<Detection>,
  pub draw_specs: Vec<BoxDrawSpec>,
}

/// 将模型原始输出转换为检测记录与绘制描述，保持模型输出的枚举顺序
pub fn post_process(result: &DetectResult, labels: &LabelTable) -> PostProcessed {
  let mut processed = PostProcessed {
    detections: Vec::with_capacity(result.len()),
    draw_specs: Vec::with_capacity(result.len()),
  };

  for (index, &RawDetection { class_id, confidence, xyxy }) in result.items.iter().enumerate() {
    let label = match labels.get(class_id) {
      Some(name) => name.to_string(),
      None => {
        warn!("类别 {} 不在标签表中", class_id);
        format!("class_{}", class_id)
      }
    };
    let confidence = if confidence.is_nan() {
      0.0
    } else {
      confidence.clamp(0.0, 1.0)
    };
    let bbox = BBox::from_xyxy(xyxy);

    processed.draw_specs.push(BoxDrawSpec {
      bbox: bbox.truncated(),
      label: label.clone(),
      confidence,
      palette_index: index,
    });
    processed.detections.push(Detection {
      label,
      confidence,
      bbox,
    });
  }

  debug!("后处理完成, 共 {} 个检测结果", processed.detections.len());
  processed
}
