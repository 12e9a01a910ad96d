// 该文件是 Amenity Vision 项目的一部分。
// src/output/data_uri.rs - 标注图像的 data URI 编码
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

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use thiserror::Error;

const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum DataUriError {
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 在内存中把图像编码为 JPEG 并包装为 data URI，不经过临时文件
pub fn encode_jpeg_data_uri(image: &RgbImage) -> Result<String, DataUriError> {
  let mut jpeg = Vec::new();
  image.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
  Ok(format!("{}{}", JPEG_DATA_URI_PREFIX, STANDARD.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn produces_decodable_jpeg_data_uri() {
    let image = RgbImage::from_pixel(16, 8, image::Rgb([0, 255, 0]));
    let uri = encode_jpeg_data_uri(&image).unwrap();
    let payload = uri.strip_prefix(JPEG_DATA_URI_PREFIX).unwrap();

    let jpeg = STANDARD.decode(payload).unwrap();
    let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 8));
  }
}
