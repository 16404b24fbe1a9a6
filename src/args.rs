// 该文件是 Qianlu （前路） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;

/// Qianlu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径（SSD-MobileNet，NHWC uint8 输入）
  #[arg(long, value_name = "FILE")]
  pub model: String,

  /// 标签文件路径，每行一个标签，行号即类别编号
  #[arg(long, default_value = "assets/labelmap.txt", value_name = "FILE")]
  pub labels: String,

  /// 输入来源（图片文件、图片目录或 V4L2 设备路径）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.webp
  /// - 目录: 按文件名顺序处理目录下的图片
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出（图片文件每帧覆盖写；目录则记录帧与明细；none 丢弃）
  #[arg(long, default_value = "none", value_name = "OUTPUT")]
  pub output: String,

  /// 置信度阈值 (0.0 - 1.0)，得分需严格大于该值
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 模型输入边长，必须与模型声明一致
  #[arg(long, default_value = "300", value_name = "SIZE")]
  pub input_size: u32,

  /// 推理线程数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub threads: usize,

  /// 启用 CUDA 执行提供者（注册失败直接报错，没有 CPU 回退）
  #[arg(long)]
  pub cuda: bool,

  /// 竖屏模式：处理前将帧顺时针旋转 90°
  #[arg(long)]
  pub portrait: bool,

  /// 最大处理帧数（仅对目录/摄像头有意义，0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 关闭语音预警
  #[arg(long)]
  pub no_alert: bool,

  /// 预警语句
  #[arg(long, default_value = "Obstruction Ahead!", value_name = "TEXT")]
  pub alert_phrase: String,

  /// 触发到播报的延迟（毫秒）
  #[arg(long, default_value = "500", value_name = "MS")]
  pub alert_delay_ms: u64,

  /// espeak 音色
  #[arg(long, default_value = "en-gb", value_name = "VOICE")]
  pub espeak_voice: String,
}
