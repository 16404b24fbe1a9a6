// 该文件是 Qianlu （前路） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::pin::Pin;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::info;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use super::{Frame, InputSource, InputSourceType};

/// 默认采集分辨率
const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;
/// 驱动缓冲数量
const CAPTURE_BUFFERS: u32 = 4;

/// V4L2 摄像头输入源
///
/// v4l 的 Stream 借用 Device，这里用 Pin<Box> 固定 Device 的内存
/// 位置，再把引用延长到 'static 交给 Stream 持有。析构时先收掉
/// Stream 再释放 Device。
pub struct V4l2Source {
  device: Pin<Box<Device>>,
  stream: Option<Stream<'static>>,
  frame_index: u64,
  width: u32,
  height: u32,
  start_time: Instant,
}

impl V4l2Source {
  pub fn new(device_path: &str) -> Result<Self> {
    let device = Box::pin(
      Device::with_path(device_path).with_context(|| format!("无法打开设备: {}", device_path))?,
    );

    let mut format = device.format()?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    info!("摄像头格式: {}x{} {}", format.width, format.height, format.fourcc);

    let mut source = Self {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      start_time: Instant::now(),
    };

    // SAFETY: device 被 Pin<Box> 固定在堆上不会移动；stream 与 device
    // 存放在同一结构体里，Drop 保证 stream 先于 device 释放。
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, CAPTURE_BUFFERS)
        .context("无法创建捕获流")?
    };
    source.stream = Some(stream);

    Ok(source)
  }

  /// YUYV 转 RGB
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for chunk in yuyv.chunks_exact(4) {
      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      for y in [y0, y1] {
        let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
        let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
        rgb.extend_from_slice(&[r, g, b]);
      }
    }

    rgb
  }
}

impl Drop for V4l2Source {
  fn drop(&mut self) {
    // stream 必须先于 device 释放
    self.stream.take();
  }
}

impl Iterator for V4l2Source {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let stream = self.stream.as_mut()?;

    match stream.next() {
      Ok((buffer, _meta)) => {
        let rgb = Self::yuyv_to_rgb(buffer, self.width, self.height);
        let Some(image) = RgbImage::from_raw(self.width, self.height, rgb) else {
          return Some(Err(anyhow::anyhow!("无法构造 RGB 图像")));
        };

        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms: self.start_time.elapsed().as_millis() as u64,
        };
        self.frame_index += 1;
        Some(Ok(frame))
      }
      Err(e) => Some(Err(anyhow::anyhow!("无法捕获帧: {}", e))),
    }
  }
}

impl InputSource for V4l2Source {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::V4l2
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    Some(30.0) // V4L2 默认帧率
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_gray_converts_to_gray_rgb() {
    // Y=128, U=V=128 是中灰，两个像素共用一组色度
    let yuyv = [128u8, 128, 128, 128];
    let rgb = V4l2Source::yuyv_to_rgb(&yuyv, 2, 1);
    assert_eq!(rgb, vec![128, 128, 128, 128, 128, 128]);
  }

  #[test]
  fn yuyv_ignores_trailing_partial_chunk() {
    let yuyv = [128u8, 128, 128, 128, 0, 0];
    let rgb = V4l2Source::yuyv_to_rgb(&yuyv, 2, 1);
    assert_eq!(rgb.len(), 6);
  }
}
