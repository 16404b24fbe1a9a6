// 该文件是 Qianlu （前路） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use qianlu::alert::{AlertConfig, AlertDispatcher, EspeakSpeaker};
use qianlu::context::{ContextConfig, DetectionContext};
use qianlu::detector::SsdMobileNetBuilder;
use qianlu::input::create_input_source;
use qianlu::interpret::InterpreterConfig;
use qianlu::output::create_output_writer;
use qianlu::task::{run_continuous, RunOptions};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  println!("Qianlu 障碍预警");
  println!("===============");
  println!("模型文件路径: {}", args.model);
  println!("标签文件路径: {}", args.labels);
  println!("输入来源: {}", args.input);
  println!("输出: {}", args.output);
  println!("置信度阈值: {}", args.confidence);
  println!();

  // 语音预警：引擎缺失时降级为只检测不播报
  let alerts = if args.no_alert {
    None
  } else {
    match EspeakSpeaker::new(&args.espeak_voice) {
      Ok(speaker) => {
        let config = AlertConfig {
          phrase: args.alert_phrase.clone(),
          delay: Duration::from_millis(args.alert_delay_ms),
        };
        Some(AlertDispatcher::spawn(speaker, config))
      }
      Err(e) => {
        println!("语音引擎不可用，预警关闭: {}", e);
        None
      }
    }
  };

  // 创建检测上下文
  println!("正在加载模型...");
  let builder = SsdMobileNetBuilder::new(&args.model)
    .input_size(args.input_size)
    .threads(args.threads)
    .cuda(args.cuda);
  let config = ContextConfig {
    interpreter: InterpreterConfig {
      score_threshold: args.confidence,
    },
    portrait: args.portrait,
  };
  let context = DetectionContext::open(builder, Path::new(&args.labels), config, alerts)?;
  println!("模型加载完成，标签 {} 个", context.labels().len());

  // 创建输入源
  println!("正在打开输入源...");
  let input = create_input_source(&args.input)?;
  println!("输入源已打开: {}x{}", input.width(), input.height());

  // 创建输出写入器
  let output = create_output_writer(&args.output)?;

  // 处理帧
  println!();
  println!("开始处理...");
  let stats = run_continuous(
    input,
    &context,
    output,
    RunOptions {
      max_frames: args.max_frames,
    },
  )?;

  println!();
  println!("处理完成!");
  println!("总帧数: {}", stats.frames);
  println!("总检测数: {}", stats.detections);
  println!("障碍触发次数: {}", stats.obstructions);

  Ok(())
}
