// 该文件是 Qianlu （前路） 项目的一部分。
// src/output/image_output.rs - 单文件图片输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::{Context, Result};
use image::RgbImage;

use super::OutputWriter;
use crate::interpret::Detection;

/// 单文件图片输出
///
/// 每帧覆盖写同一个文件，可以当作简陋的“实时画面”查看。
pub struct ImageOutput {
  output_path: String,
}

impl ImageOutput {
  pub fn new(output_path: &str) -> Self {
    Self {
      output_path: output_path.to_string(),
    }
  }
}

impl OutputWriter for ImageOutput {
  fn write_frame(&mut self, image: &RgbImage, _detections: &[Detection]) -> Result<()> {
    image
      .save(&self.output_path)
      .with_context(|| format!("无法保存图片: {}", self.output_path))
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn image_output_overwrites_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.png");
    let mut output = ImageOutput::new(path.to_str().unwrap());

    output
      .write_frame(&RgbImage::from_pixel(4, 4, Rgb([1, 1, 1])), &[])
      .unwrap();
    output
      .write_frame(&RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])), &[])
      .unwrap();
    output.finish().unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(*saved.get_pixel(0, 0), Rgb([9, 9, 9]));
  }
}
