// 该文件是 Qianlu （前路） 项目的一部分。
// src/output.rs - 标注帧输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

#[cfg(feature = "directory_record")]
mod directory_record;
mod image_output;
mod visualizer;

use anyhow::Result;
use image::RgbImage;

#[cfg(feature = "directory_record")]
pub use directory_record::DirectoryRecord;
pub use image_output::ImageOutput;
pub use visualizer::Visualizer;

use crate::interpret::Detection;

/// 输出写入器 trait
///
/// 收到的帧已经画好标注，检测列表给需要记录明细的输出用。
pub trait OutputWriter {
  /// 写入一帧
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 丢弃输出，只要预警不要留存时使用
pub struct NullOutput;

impl OutputWriter for NullOutput {
  fn write_frame(&mut self, _image: &RgbImage, _detections: &[Detection]) -> Result<()> {
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

/// 从输出路径创建输出写入器
pub fn create_output_writer(output_path: &str) -> Result<Box<dyn OutputWriter>> {
  if output_path == "none" {
    return Ok(Box::new(NullOutput));
  }

  let lower = output_path.to_lowercase();
  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
  {
    return Ok(Box::new(ImageOutput::new(output_path)));
  }

  // 其余一律按记录目录处理
  #[cfg(feature = "directory_record")]
  return Ok(Box::new(DirectoryRecord::new(output_path)?));

  #[cfg(not(feature = "directory_record"))]
  anyhow::bail!("无法识别的输出路径: {}", output_path)
}
