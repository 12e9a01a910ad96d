// 该文件是 Amenity Vision 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  /// 执行一次前向推理，仅保留置信度不低于 `confidence_threshold` 的结果
  fn infer(&self, input: &Self::Input, confidence_threshold: f32) -> Result<Self::Output, Self::Error>;

  /// 模型附带的类别标签表
  fn labels(&self) -> &LabelTable;
}

/// 模型输出的原始检测框，坐标为原图像素坐标
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  pub class_id: u32,
  pub confidence: f32,
  pub xyxy: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 一次推理的全部原始检测框，不保证顺序
#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[RawDetection]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl From<Vec<RawDetection>> for DetectResult {
  fn from(items: Vec<RawDetection>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

mod labels;
mod yolov8;
pub use self::labels::LabelTable;
pub use self::yolov8::{ModelHandle, Yolov8, Yolov8Builder, normalize_path, resolve_model_path};
