// 该文件是 Amenity Vision 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub struct SaveImageFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: PathBuf::from(uri.path()),
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    SaveImageFileOutput { path: path.into() }
  }

  /// 与输入图像同目录的 `<文件名>_annotated.jpg`
  pub fn annotated_beside(input: &Path) -> Self {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let path = input.with_file_name(format!("{stem}_annotated.jpg"));
    SaveImageFileOutput { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 保存图像，格式由扩展名决定，必要时创建父目录
  pub fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    info!("保存标注图像到文件: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn saves_into_new_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out.png");
    let output = SaveImageFileOutput::new(&path);

    let image = RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7]));
    output.save_image(&image).unwrap();

    let reloaded = image::open(&path).unwrap().into_rgb8();
    assert_eq!(reloaded, image);
  }

  #[test]
  fn annotated_path_sits_beside_input() {
    let output = SaveImageFileOutput::annotated_beside(Path::new("/data/rooms/bedroom.png"));
    assert_eq!(output.path(), Path::new("/data/rooms/bedroom_annotated.jpg"));

    let output = SaveImageFileOutput::annotated_beside(Path::new("kitchen.v2.jpeg"));
    assert_eq!(output.path(), Path::new("kitchen.v2_annotated.jpg"));
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
    let url = Url::parse("image:///tmp/annotated.jpg").unwrap();
    assert_eq!(
      SaveImageFileOutput::from_url(&url).unwrap().path(),
      Path::new("/tmp/annotated.jpg")
    );
  }
}
