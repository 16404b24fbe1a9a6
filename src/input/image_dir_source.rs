// 该文件是 Qianlu （前路） 项目的一部分。
// src/input/image_dir_source.rs - 图片目录输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use image::ImageReader;
use tracing::debug;

use super::{Frame, InputSource, InputSourceType};

/// 图片目录输入源
///
/// 按文件名排序依次产出目录下的图片帧，给没有摄像头的环境一条
/// 连续处理路径。尺寸以第一张图片为准。
pub struct ImageDirSource {
  files: std::vec::IntoIter<PathBuf>,
  index: u64,
  width: u32,
  height: u32,
  start_time: Instant,
}

impl ImageDirSource {
  pub fn new(dir: &str) -> Result<Self> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
      .with_context(|| format!("无法读取目录: {}", dir))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| {
        matches!(
          path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref(),
          Some("jpg" | "jpeg" | "png" | "bmp" | "webp")
        )
      })
      .collect();
    files.sort();

    anyhow::ensure!(!files.is_empty(), "目录中没有图片: {}", dir);

    let (width, height) = ImageReader::open(&files[0])
      .with_context(|| format!("无法打开图片: {}", files[0].display()))?
      .into_dimensions()
      .with_context(|| format!("无法读取图片尺寸: {}", files[0].display()))?;
    debug!("目录输入: {} 张图片, {}x{}", files.len(), width, height);

    Ok(Self {
      files: files.into_iter(),
      index: 0,
      width,
      height,
      start_time: Instant::now(),
    })
  }
}

impl Iterator for ImageDirSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let index = self.index;
    self.index += 1;

    let result = ImageReader::open(&path)
      .with_context(|| format!("无法打开图片: {}", path.display()))
      .and_then(|reader| {
        reader
          .decode()
          .with_context(|| format!("无法解码图片: {}", path.display()))
      })
      .map(|image| Frame {
        image: image.to_rgb8(),
        index,
        timestamp_ms: self.start_time.elapsed().as_millis() as u64,
      });

    Some(result)
  }
}

impl InputSource for ImageDirSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::ImageDir
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn image_dir_source_yields_frames_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(4, 4, Rgb([1, 0, 0]))
      .save(dir.path().join("b.png"))
      .unwrap();
    RgbImage::from_pixel(4, 4, Rgb([2, 0, 0]))
      .save(dir.path().join("a.png"))
      .unwrap();

    let mut source = ImageDirSource::new(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(source.source_type(), InputSourceType::ImageDir);

    let first = source.next().unwrap().unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(*first.image.get_pixel(0, 0), Rgb([2, 0, 0])); // a.png 在前
    let second = source.next().unwrap().unwrap();
    assert_eq!(second.index, 1);
    assert_eq!(*second.image.get_pixel(0, 0), Rgb([1, 0, 0]));
    assert!(source.next().is_none());
  }

  #[test]
  fn image_dir_source_rejects_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ImageDirSource::new(dir.path().to_str().unwrap()).is_err());
  }
}
