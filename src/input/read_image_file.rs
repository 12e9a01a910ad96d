// 该文件是 Amenity Vision 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: &'static str, found: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 从 `image:///path/to/photo.jpg` 读取原始图像字节，解码交给检测流水线
#[derive(Debug)]
pub struct ImageFileInput {
  path: PathBuf,
  bytes: Vec<u8>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    Self::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref().to_path_buf();
    let bytes = std::fs::read(&path)?;
    debug!("读取图像文件: {} ({} 字节)", path.display(), bytes.len());
    Ok(ImageFileInput { path, bytes })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_bytes_from_image_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("room.jpg");
    std::fs::write(&path, b"jpeg bytes").unwrap();

    let url = Url::from_file_path(&path)
      .map(|u| Url::parse(&format!("image://{}", u.path())).unwrap())
      .unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.bytes(), b"jpeg bytes");
    assert_eq!(input.path(), path.as_path());
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/room.jpg").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///nonexistent/room.jpg").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }
}
