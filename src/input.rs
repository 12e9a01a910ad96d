// 该文件是 Amenity Vision 项目的一部分。
// src/input.rs - 图像输入
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
use tracing::debug;

use crate::error::InferenceError;

/// 将编码后的图像字节解码为 RGB 图像，格式由内容推断
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InferenceError> {
  let image = image::load_from_memory(bytes)?;
  debug!("解码图像: {}x{}", image.width(), image.height());
  Ok(image.into_rgb8())
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn decodes_png_bytes() {
    let image = RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3]));
    let mut bytes = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
      .unwrap();

    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded, image);
  }

  #[test]
  fn garbage_is_an_inference_error() {
    assert!(matches!(
      decode_image(b"definitely not an image"),
      Err(InferenceError::Decode(_))
    ));
  }
}
