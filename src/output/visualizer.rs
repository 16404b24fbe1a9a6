// 该文件是 Qianlu （前路） 项目的一部分。
// src/output/visualizer.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::interpret::Detection;

/// 障碍检测框固定用红色
const OBSTRUCTION_COLOR: Rgb<u8> = Rgb([220, 30, 30]);
/// 标签字号
const LABEL_FONT_SIZE: f32 = 16.0;

/// 可视化工具：在帧上绘制检测框和标签
pub struct Visualizer {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
  /// 类别颜色映射
  colors: Vec<Rgb<u8>>,
}

impl Visualizer {
  /// num_classes 决定类别颜色的色相间隔
  pub fn new(num_classes: usize) -> Self {
    // 使用内置的默认字体数据
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载内置字体");

    let num_classes = num_classes.max(1);
    let colors: Vec<Rgb<u8>> = (0..num_classes)
      .map(|i| {
        let hue = (i as f32 / num_classes as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      colors,
    }
  }

  /// 在图像上绘制检测结果
  ///
  /// 框线画两层以增加可见度；标签文本画在框的左上角。
  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      let color = if detection.obstruction {
        OBSTRUCTION_COLOR
      } else {
        self.colors[detection.class_id % self.colors.len()]
      };

      let x = detection.left.max(0.0) as i32;
      let y = detection.top.max(0.0) as i32;
      let width = detection.width().min(image.width() as f32 - detection.left) as u32;
      let height = detection.height().min(image.height() as f32 - detection.top) as u32;

      if width > 0 && height > 0 {
        let rect = Rect::at(x, y).of_size(width, height);
        draw_hollow_rect_mut(image, rect, color);

        // 第二层边框
        if x > 0 && y > 0 && width > 2 && height > 2 {
          let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
          draw_hollow_rect_mut(image, inner, color);
        }
      }

      let label = format!("{}: {:.2}", detection.label, detection.score);
      draw_text_mut(image, color, x, y, self.font_scale, &self.font, &label);
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}
