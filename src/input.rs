// 该文件是 Qianlu （前路） 项目的一部分。
// src/input.rs - 帧输入源
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod image_dir_source;
mod image_source;
#[cfg(feature = "v4l2_input")]
mod v4l2_source;

use anyhow::Result;
use image::RgbImage;

pub use image_dir_source::ImageDirSource;
pub use image_source::ImageSource;
#[cfg(feature = "v4l2_input")]
pub use v4l2_source::V4l2Source;

/// 帧数据
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// 图片目录
  ImageDir,
  /// V4L2 摄像头
  V4l2,
}

/// 输入源 trait
///
/// 帧在单一线程上串行产出，同一时刻只有一帧在处理。
/// 采集随构造开始，随析构停止。
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从来源字符串创建输入源
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  // V4L2 设备
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    #[cfg(feature = "v4l2_input")]
    {
      let device_path = source.trim_start_matches("v4l2://");
      return Ok(Box::new(V4l2Source::new(device_path)?));
    }
    #[cfg(not(feature = "v4l2_input"))]
    anyhow::bail!("未启用 v4l2_input 特性，无法打开摄像头: {}", source);
  }

  // 图片文件
  let lower = source.to_lowercase();
  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
    || lower.ends_with(".webp")
  {
    return Ok(Box::new(ImageSource::new(source)?));
  }

  // 图片目录
  if std::path::Path::new(source).is_dir() {
    return Ok(Box::new(ImageDirSource::new(source)?));
  }

  anyhow::bail!("无法识别的输入来源: {}", source)
}
