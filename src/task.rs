// 该文件是 Qianlu （前路） 项目的一部分。
// src/task.rs - 连续处理任务
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

use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use crate::context::DetectionContext;
use crate::detector::Detector;
use crate::input::InputSource;
use crate::output::OutputWriter;

/// 连续任务选项
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// 最大处理帧数，0 表示不限
  pub max_frames: u64,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
  pub frames: u64,
  pub detections: usize,
  pub obstructions: usize,
}

/// 连续处理循环
///
/// 逐帧取、处理、写出，直到输入耗尽、达到帧数上限或收到中断信号。
pub fn run_continuous<D: Detector>(
  mut input: Box<dyn InputSource>,
  context: &DetectionContext<D>,
  mut output: Box<dyn OutputWriter>,
  options: RunOptions,
) -> Result<RunStats> {
  info!("开始任务...");

  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
  })
  .expect("Error setting Ctrl-C handler");

  let mut stats = RunStats::default();

  while let Some(frame_result) = input.next() {
    let frame = frame_result?;

    if options.max_frames > 0 && stats.frames >= options.max_frames {
      info!("已达到最大帧数限制: {}", options.max_frames);
      break;
    }

    let now = Instant::now();
    let processed = context.process_frame(&frame.image)?;
    let process_elapsed = now.elapsed();

    output.write_frame(&processed.image, &processed.detections)?;
    let total_elapsed = now.elapsed();

    stats.frames += 1;
    stats.detections += processed.detections.len();
    stats.obstructions += processed.obstruction_count();

    info!(
      "帧 {} (时间: {}ms): 检测 {} 条, 耗时 {:.2?} / {:.2?}",
      frame.index,
      frame.timestamp_ms,
      processed.detections.len(),
      process_elapsed,
      total_elapsed
    );

    if rx.try_recv().is_ok() {
      warn!("中断信号接收，退出任务循环");
      break;
    }
  }

  output.finish()?;
  info!("任务完成，退出");
  Ok(stats)
}
