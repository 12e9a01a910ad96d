// 该文件是 Amenity Vision 项目的一部分。
// src/response.rs - 检测结果组装
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

use image::RgbImage;
use serde::Serialize;

use crate::postprocess::Detection;

#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
  pub detections: Vec<Detection>,
  /// 仅在请求绘制且绘制成功时存在
  pub annotated_image: Option<RgbImage>,
}

impl DetectionResult {
  pub fn assemble(detections: Vec<Detection>, annotated_image: Option<RgbImage>) -> Self {
    DetectionResult {
      detections,
      annotated_image,
    }
  }

  pub fn count(&self) -> usize {
    self.detections.len()
  }

  /// 对外输出结构，`annotated_image` 由传输层编码后传入
  pub fn body(&self, annotated_image: Option<String>) -> ResponseBody<'_> {
    ResponseBody {
      amenities_detected: &self.detections,
      count: self.count(),
      annotated_image,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ResponseBody<'a> {
  pub amenities_detected: &'a [Detection],
  pub count: usize,
  pub annotated_image: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::BBox;

  fn detection(label: &str, confidence: f32) -> Detection {
    Detection {
      label: label.to_string(),
      confidence,
      bbox: BBox::from_xyxy([1.5, 2.0, 30.25, 40.0]),
    }
  }

  #[test]
  fn count_tracks_detections() {
    let mut result = DetectionResult::assemble(vec![detection("tv", 0.5)], None);
    assert_eq!(result.count(), 1);
    result.detections.push(detection("bed", 0.4));
    assert_eq!(result.count(), 2);
    assert_eq!(DetectionResult::default().count(), 0);
  }

  #[test]
  fn body_serializes_wire_contract() {
    let result = DetectionResult::assemble(vec![detection("smoke_detector", 0.8234567)], None);
    let json = serde_json::to_value(result.body(None)).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "amenities_detected": [{
          "amenity": "smoke_detector",
          "confidence": 0.823,
          "bbox": { "x1": 1.5, "y1": 2.0, "x2": 30.25, "y2": 40.0 }
        }],
        "count": 1,
        "annotated_image": null
      })
    );
  }

  #[test]
  fn body_carries_encoded_image() {
    let result = DetectionResult::assemble(Vec::new(), Some(RgbImage::new(2, 2)));
    let body = result.body(Some("data:image/jpeg;base64,AAAA".to_string()));
    assert_eq!(body.count, 0);
    assert_eq!(body.annotated_image.as_deref(), Some("data:image/jpeg;base64,AAAA"));
  }
}
