// 该文件是 Amenity Vision 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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

use std::{
  path::{Component, Path, PathBuf},
  sync::Mutex,
};

use image::{Rgb, RgbImage, imageops::FilterType};
use ndarray::{Array4, ArrayViewD};
use ort::{
  execution_providers::CPUExecutionProvider,
  session::{Session, builder::GraphOptimizationLevel},
  value::{Value, ValueType},
};
use tracing::{debug, error, info, warn};

use crate::{
  error::{InferenceError, ModelLoadError},
  model::{DetectResult, LabelTable, Model, RawDetection},
};

const YOLOV8_NUM_INPUTS: usize = 1;
const YOLOV8_DEFAULT_INPUT_SIZE: u32 = 640;
const YOLOV8_BOX_CHANNELS: usize = 4;
const YOLOV8_IOU_THRESH: f32 = 0.7;
const YOLOV8_MAX_DETECTIONS: usize = 300;
const YOLOV8_PAD_VALUE: u8 = 114;
const YOLOV8_NAMES_KEY: &str = "names";
const YOLOV8_LABELS_SUFFIX: &str = "labels.json";
const YOLOV8_INTRA_THREADS: usize = 4;

/// 启动时加载一次、之后只读共享的模型句柄
pub type ModelHandle = Yolov8;

pub struct Yolov8 {
  // 单槽队列：同一模型实例同时只执行一次推理
  session: Mutex<Session>,
  input_name: String,
  input_width: u32,
  input_height: u32,
  labels: LabelTable,
  model_path: PathBuf,
}

impl std::fmt::Debug for Yolov8 {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Yolov8")
      .field("model_path", &self.model_path)
      .field("input_name", &self.input_name)
      .field("input_width", &self.input_width)
      .field("input_height", &self.input_height)
      .field("labels", &self.labels.len())
      .finish_non_exhaustive()
  }
}

/// 词法规范化路径：去掉 `.`，折叠 `..`，不访问文件系统
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        let popped = match normalized.components().next_back() {
          Some(Component::Normal(_)) => normalized.pop(),
          Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
          _ => false,
        };
        if !popped {
          normalized.push("..");
        }
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

/// 将模型路径解析为规范化的绝对路径，并确认文件存在
pub fn resolve_model_path(path: impl AsRef<Path>) -> Result<PathBuf, ModelLoadError> {
  let path = path.as_ref();
  let cwd = std::env::current_dir()?;
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    cwd.join(path)
  };
  let resolved = normalize_path(&absolute);

  if !resolved.is_file() {
    error!("模型文件不存在: {}", resolved.display());
    return Err(ModelLoadError::NotFound {
      path: resolved,
      cwd,
    });
  }

  Ok(resolved)
}

pub struct Yolov8Builder {
  model_path: PathBuf,
  intra_threads: usize,
  labels: Option<LabelTable>,
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Yolov8Builder {
      model_path: model_path.into(),
      intra_threads: YOLOV8_INTRA_THREADS,
      labels: None,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads.max(1);
    self
  }

  /// 显式指定标签表，跳过元数据与旁路文件
  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = Some(labels);
    self
  }

  pub fn build(self) -> Result<Yolov8, ModelLoadError> {
    let model_path = resolve_model_path(&self.model_path)?;
    info!("加载模型文件: {}", model_path.display());

    let session = Session::builder()
      .map_err(runtime_error)?
      .with_execution_providers([CPUExecutionProvider::default().build()])
      .map_err(runtime_error)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(runtime_error)?
      .with_intra_threads(self.intra_threads)
      .map_err(runtime_error)?
      .commit_from_file(&model_path)
      .map_err(runtime_error)?;

    if session.inputs.len() != YOLOV8_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLOV8_NUM_INPUTS,
        session.inputs.len()
      );
      return Err(ModelLoadError::InvalidModel(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        YOLOV8_NUM_INPUTS,
        session.inputs.len()
      )));
    }
    if session.outputs.is_empty() {
      return Err(ModelLoadError::InvalidModel("模型没有输出".to_string()));
    }

    let input = &session.inputs[0];
    let input_name = input.name.clone();
    let (input_width, input_height) = static_input_size(&input.input_type);
    debug!(
      "模型输入: {} {:?}, 推理尺寸 {}x{}",
      input_name, input.input_type, input_width, input_height
    );

    let labels = match self.labels {
      Some(labels) => labels,
      None => load_labels(&session, &model_path)?,
    };
    info!("模型加载完成, 类别数量: {}", labels.len());

    Ok(Yolov8 {
      session: Mutex::new(session),
      input_name,
      input_width,
      input_height,
      labels,
      model_path,
    })
  }
}

fn runtime_error(e: impl std::fmt::Display) -> ModelLoadError {
  error!("ONNX Runtime 错误: {}", e);
  ModelLoadError::Runtime(e.to_string())
}

fn static_input_size(input_type: &ValueType) -> (u32, u32) {
  if let ValueType::Tensor { shape, .. } = input_type
    && shape.len() == 4
    && shape[2] > 0
    && shape[3] > 0
  {
    return (shape[3] as u32, shape[2] as u32);
  }
  (YOLOV8_DEFAULT_INPUT_SIZE, YOLOV8_DEFAULT_INPUT_SIZE)
}

fn load_labels(session: &Session, model_path: &Path) -> Result<LabelTable, ModelLoadError> {
  let names = session
    .metadata()
    .ok()
    .and_then(|metadata| metadata.custom(YOLOV8_NAMES_KEY).ok().flatten());
  if let Some(names) = names {
    debug!("从模型元数据读取类别标签");
    return LabelTable::from_metadata(&names);
  }

  let sidecar = model_path.with_extension(YOLOV8_LABELS_SUFFIX);
  if sidecar.is_file() {
    debug!("从旁路文件读取类别标签: {}", sidecar.display());
    let text = std::fs::read_to_string(&sidecar)?;
    return LabelTable::from_json(&text);
  }

  error!("模型未附带类别标签表: {}", model_path.display());
  Err(ModelLoadError::MissingLabels(model_path.to_path_buf()))
}

impl Yolov8 {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
    Yolov8Builder::new(path.as_ref()).build()
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn input_size(&self) -> (u32, u32) {
    (self.input_width, self.input_height)
  }
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = InferenceError;

  fn infer(&self, input: &Self::Input, confidence_threshold: f32) -> Result<Self::Output, Self::Error> {
    debug!("预处理输入图像 {}x{}", input.width(), input.height());
    let (canvas, letterbox) = Letterbox::fit(input, self.input_width, self.input_height);
    let tensor = to_nchw_tensor(&canvas);
    let input_value = Value::from_array(tensor)?;

    let candidates = {
      let mut session = self
        .session
        .lock()
        .map_err(|e| InferenceError::Busy(e.to_string()))?;

      debug!("执行模型推理");
      let outputs = session.run(ort::inputs![&self.input_name => input_value])?;
      let output = outputs[0].try_extract_array::<f32>()?;
      debug!("模型输出形状: {:?}", output.shape());
      decode_output(output, confidence_threshold, self.labels.len())?
    };

    let items: Vec<RawDetection> = nms(candidates, YOLOV8_IOU_THRESH)
      .into_iter()
      .take(YOLOV8_MAX_DETECTIONS)
      .map(|item| RawDetection {
        xyxy: letterbox.unmap(item.xyxy),
        ..item
      })
      .collect();

    debug!("检测到 {} 个物体", items.len());
    Ok(DetectResult::from(items))
  }

  fn labels(&self) -> &LabelTable {
    &self.labels
  }
}

/// 等比缩放并居中填充到模型输入尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Letterbox {
  scale: f32,
  pad_x: f32,
  pad_y: f32,
}

impl Letterbox {
  pub(crate) fn fit(image: &RgbImage, width: u32, height: u32) -> (RgbImage, Letterbox) {
    let (src_w, src_h) = image.dimensions();
    let scale = (width as f32 / src_w.max(1) as f32).min(height as f32 / src_h.max(1) as f32);
    let new_w = ((src_w as f32 * scale).round() as u32).clamp(1, width);
    let new_h = ((src_h as f32 * scale).round() as u32).clamp(1, height);
    let pad_x = (width - new_w) / 2;
    let pad_y = (height - new_h) / 2;

    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([YOLOV8_PAD_VALUE; 3]));
    image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
      canvas,
      Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
      },
    )
  }

  /// 将模型输入坐标映射回原图坐标
  pub(crate) fn unmap(&self, xyxy: [f32; 4]) -> [f32; 4] {
    [
      (xyxy[0] - self.pad_x) / self.scale,
      (xyxy[1] - self.pad_y) / self.scale,
      (xyxy[2] - self.pad_x) / self.scale,
      (xyxy[3] - self.pad_y) / self.scale,
    ]
  }
}

fn to_nchw_tensor(image: &RgbImage) -> Array4<f32> {
  let (width, height) = image.dimensions();
  Array4::from_shape_fn((1, 3, height as usize, width as usize), |(_, c, y, x)| {
    image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
  })
}

/// 解码 `[1, 4 + nc, N]`（或转置后的 `[1, N, 4 + nc]`）输出，
/// 每列为 cx, cy, w, h 与各类别分数
pub(crate) fn decode_output(
  output: ArrayViewD<f32>,
  confidence_threshold: f32,
  num_classes: usize,
) -> Result<Vec<RawDetection>, InferenceError> {
  let shape = output.shape().to_vec();
  if shape.len() != 3 || shape[0] != 1 {
    return Err(InferenceError::UnexpectedOutput(format!(
      "预期输出为三维且批大小为 1, 实际形状 {:?}",
      shape
    )));
  }

  let expected = YOLOV8_BOX_CHANNELS + num_classes;
  let channels_first = if num_classes > 0 && shape[1] == expected {
    true
  } else if num_classes > 0 && shape[2] == expected {
    false
  } else {
    shape[1] <= shape[2]
  };
  let (channels, anchors) = if channels_first {
    (shape[1], shape[2])
  } else {
    (shape[2], shape[1])
  };

  if channels <= YOLOV8_BOX_CHANNELS {
    return Err(InferenceError::UnexpectedOutput(format!(
      "输出通道数 {} 不足以包含类别分数",
      channels
    )));
  }
  if num_classes > 0 && channels != expected {
    warn!("输出类别数 {} 与标签表 {} 不一致", channels - YOLOV8_BOX_CHANNELS, num_classes);
  }

  let at = |c: usize, a: usize| {
    if channels_first {
      output[[0, c, a]]
    } else {
      output[[0, a, c]]
    }
  };

  let mut items = Vec::new();
  for a in 0..anchors {
    let (class_id, score) = (YOLOV8_BOX_CHANNELS..channels)
      .map(|c| (c - YOLOV8_BOX_CHANNELS, at(c, a)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score < confidence_threshold {
      continue;
    }

    let (cx, cy, w, h) = (at(0, a), at(1, a), at(2, a), at(3, a));
    items.push(RawDetection {
      class_id: class_id as u32,
      confidence: score,
      xyxy: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
    });
  }

  debug!("阈值 {} 之上的候选框: {}", confidence_threshold, items.len());
  Ok(items)
}

/// 按类别的非极大值抑制，结果按置信度降序
pub(crate) fn nms(mut items: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
  items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut kept: Vec<RawDetection> = Vec::new();
  for item in items {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == item.class_id && iou(&k.xyxy, &item.xyxy) >= iou_threshold);
    if !suppressed {
      kept.push(item);
    }
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::Array3;

  fn raw(class_id: u32, confidence: f32, xyxy: [f32; 4]) -> RawDetection {
    RawDetection {
      class_id,
      confidence,
      xyxy,
    }
  }

  #[test]
  fn normalize_collapses_dot_segments() {
    assert_eq!(
      normalize_path(Path::new("/srv/app/./models/../weights/best.onnx")),
      PathBuf::from("/srv/app/weights/best.onnx")
    );
    assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    assert_eq!(normalize_path(Path::new("../a/./b")), PathBuf::from("../a/b"));
  }

  #[test]
  fn missing_model_is_reported_with_absolute_path() {
    let err = resolve_model_path("definitely/not/here/model.onnx").unwrap_err();
    match err {
      ModelLoadError::NotFound { path, cwd } => {
        assert!(path.is_absolute());
        assert!(path.ends_with("definitely/not/here/model.onnx"));
        assert_eq!(cwd, std::env::current_dir().unwrap());
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn load_fails_before_any_inference_for_missing_path() {
    let err = Yolov8::load("/nonexistent/amenity.onnx").unwrap_err();
    assert!(matches!(err, ModelLoadError::NotFound { .. }));
  }

  #[test]
  fn existing_file_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("weights.onnx");
    std::fs::write(&file, b"onnx").unwrap();
    let resolved = resolve_model_path(dir.path().join("sub/../weights.onnx")).unwrap();
    assert_eq!(resolved, normalize_path(&file));
  }

  #[test]
  fn decode_channels_first_output() {
    // 2 个类别, 3 个锚点
    let mut out = Array3::<f32>::zeros((1, 6, 3));
    let anchors = [
      [100.0, 100.0, 20.0, 40.0, 0.9, 0.1],
      [50.0, 60.0, 10.0, 10.0, 0.1, 0.2],
      [300.0, 200.0, 100.0, 50.0, 0.3, 0.6],
    ];
    for (a, values) in anchors.iter().enumerate() {
      for (c, v) in values.iter().enumerate() {
        out[[0, c, a]] = *v;
      }
    }

    let items = decode_output(out.into_dyn().view(), 0.25, 2).unwrap();
    assert_eq!(
      items,
      vec![
        raw(0, 0.9, [90.0, 80.0, 110.0, 120.0]),
        raw(1, 0.6, [250.0, 175.0, 350.0, 225.0]),
      ]
    );
  }

  #[test]
  fn decode_transposed_output() {
    let mut out = Array3::<f32>::zeros((1, 2, 5));
    out[[0, 0, 0]] = 10.0;
    out[[0, 0, 1]] = 10.0;
    out[[0, 0, 2]] = 4.0;
    out[[0, 0, 3]] = 4.0;
    out[[0, 0, 4]] = 0.8;
    out[[0, 1, 4]] = 0.1;

    let items = decode_output(out.into_dyn().view(), 0.25, 1).unwrap();
    assert_eq!(items, vec![raw(0, 0.8, [8.0, 8.0, 12.0, 12.0])]);
  }

  #[test]
  fn decode_rejects_unexpected_rank() {
    let out = ndarray::Array2::<f32>::zeros((6, 3));
    assert!(matches!(
      decode_output(out.into_dyn().view(), 0.25, 2),
      Err(InferenceError::UnexpectedOutput(_))
    ));
  }

  #[test]
  fn nms_suppresses_same_class_overlaps_only() {
    let items = vec![
      raw(0, 0.6, [0.0, 0.0, 10.0, 10.0]),
      raw(0, 0.9, [1.0, 1.0, 10.0, 10.0]),
      raw(1, 0.5, [0.0, 0.0, 10.0, 10.0]),
      raw(0, 0.4, [50.0, 50.0, 60.0, 60.0]),
    ];
    let kept = nms(items, 0.7);
    assert_eq!(kept.len(), 3);
    assert_eq!(kept[0].confidence, 0.9);
    assert_eq!(kept[1].class_id, 1);
    assert_eq!(kept[2].xyxy, [50.0, 50.0, 60.0, 60.0]);
  }

  #[test]
  fn letterbox_round_trips_coordinates() {
    let image = RgbImage::from_pixel(1280, 960, Rgb([10, 20, 30]));
    let (canvas, letterbox) = Letterbox::fit(&image, 640, 640);
    assert_eq!(canvas.dimensions(), (640, 640));
    // 上下各填充 80 像素
    assert_eq!(canvas.get_pixel(320, 10), &Rgb([YOLOV8_PAD_VALUE; 3]));
    assert_eq!(canvas.get_pixel(320, 320), &Rgb([10, 20, 30]));

    let mapped = letterbox.unmap([25.0, 100.0, 100.0, 140.0]);
    assert_eq!(mapped, [50.0, 40.0, 200.0, 120.0]);
  }

  #[test]
  fn tensor_is_nchw_and_normalized() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(1, 0, Rgb([255, 0, 51]));
    let tensor = to_nchw_tensor(&image);
    assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
    assert_eq!(tensor[[0, 0, 0, 1]], 1.0);
    assert_eq!(tensor[[0, 2, 0, 1]], 0.2);
    assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
  }
}
