// 该文件是 Qianlu （前路） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图片推理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use tracing::info;

use qianlu::context::{ContextConfig, DetectionContext};
use qianlu::detector::SsdMobileNetBuilder;
use qianlu::interpret::InterpreterConfig;

/// 单张图片推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, value_name = "MODEL")]
  pub model: String,

  /// 标签文件路径
  #[arg(long, default_value = "assets/labelmap.txt", value_name = "FILE")]
  pub labels: String,

  /// 输入图片
  #[arg(long, value_name = "IMAGE")]
  pub input: String,

  /// 标注后的输出图片
  #[arg(long, value_name = "IMAGE")]
  pub output: String,

  /// 置信度阈值
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入图片: {}", args.input);

  let config = ContextConfig {
    interpreter: InterpreterConfig {
      score_threshold: args.confidence,
    },
    portrait: false,
  };
  let context = DetectionContext::open(
    SsdMobileNetBuilder::new(&args.model),
    Path::new(&args.labels),
    config,
    None,
  )?;

  let image = ImageReader::open(&args.input)
    .with_context(|| format!("无法打开图片: {}", args.input))?
    .decode()
    .with_context(|| format!("无法解码图片: {}", args.input))?
    .to_rgb8();

  info!("开始推理...");
  let now = std::time::Instant::now();
  let processed = context.process_frame(&image)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  for det in &processed.detections {
    info!(
      "{}: {:.2}% at ({:.0}, {:.0}) - ({:.0}, {:.0}){}",
      det.label,
      det.score * 100.0,
      det.left,
      det.top,
      det.right,
      det.bottom,
      if det.obstruction { " [障碍]" } else { "" }
    );
  }

  processed
    .image
    .save(&args.output)
    .with_context(|| format!("无法保存图片: {}", args.output))?;
  info!("已保存标注图片: {}", args.output);

  Ok(())
}
