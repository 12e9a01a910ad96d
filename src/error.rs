// 该文件是 Amenity Vision 项目的一部分。
// src/error.rs - 错误定义
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

use thiserror::Error;

/// 模型加载错误，仅在启动阶段出现
#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型文件不存在: {path}（当前工作目录: {cwd}）")]
  NotFound { path: PathBuf, cwd: PathBuf },
  #[error("模型文件读取错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("ONNX Runtime 无法加载模型: {0}")]
  Runtime(String),
  #[error("模型无效: {0}")]
  InvalidModel(String),
  #[error("模型未附带类别标签表: {0}")]
  MissingLabels(PathBuf),
  #[error("类别标签表格式错误: {0}")]
  InvalidLabels(String),
}

/// 单次推理错误，可在请求边界恢复
#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("ONNX Runtime 推理错误: {0}")]
  Runtime(#[from] ort::Error),
  #[error("模型输出格式异常: {0}")]
  UnexpectedOutput(String),
  #[error("推理会话不可用: {0}")]
  Busy(String),
}

/// 渲染错误，发生在推理之后
#[derive(Error, Debug)]
pub enum RenderError {
  #[error("图像缓冲区不可读: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("字体文件读取错误: {0}")]
  FontIo(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  FontInvalid(#[from] ab_glyph::InvalidFont),
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("置信度阈值必须位于 (0, 1] 区间, 实际为 {0}")]
  ConfidenceThreshold(f32),
  #[error("边框线宽必须至少为 1 像素")]
  LineThickness,
  #[error("字体缩放必须为正数, 实际为 {0}")]
  FontScale(f32),
}

/// 检测流水线错误，区分推理阶段与渲染阶段
#[derive(Error, Debug)]
pub enum DetectError {
  #[error("检测参数无效: {0}")]
  Config(#[from] ConfigError),
  #[error("推理失败: {0}")]
  Inference(#[from] InferenceError),
  #[error("渲染失败: {0}")]
  Render(#[from] RenderError),
}
