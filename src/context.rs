// 该文件是 Qianlu （前路） 项目的一部分。
// src/context.rs - 检测上下文
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use anyhow::{Context as _, Result};
use image::imageops;
use image::RgbImage;
use tracing::debug;

use crate::alert::AlertDispatcher;
use crate::detector::{Detector, SsdMobileNet, SsdMobileNetBuilder};
use crate::interpret::{Detection, Interpreter, InterpreterConfig};
use crate::labels::LabelMap;
use crate::output::Visualizer;
use crate::tensor::TensorPacker;

/// 检测上下文配置
#[derive(Debug, Clone, Default)]
pub struct ContextConfig {
  pub interpreter: InterpreterConfig,
  /// 竖屏模式：处理前将帧顺时针旋转 90°，输出前转回来
  pub portrait: bool,
}

/// 一帧的处理结果
pub struct ProcessedFrame {
  /// 已绘制标注的帧，交还给显示/输出管线
  pub image: RgbImage,
  pub detections: Vec<Detection>,
}

impl ProcessedFrame {
  /// 本帧满足障碍条件的检测数量
  pub fn obstruction_count(&self) -> usize {
    self.detections.iter().filter(|det| det.obstruction).count()
  }
}

/// 检测上下文
///
/// 显式持有模型、标签表、解释器与预警调度器，构造一次后传给需要
/// 检测的组件；析构即释放网络与播报线程。
pub struct DetectionContext<D: Detector> {
  detector: D,
  packer: TensorPacker,
  labels: LabelMap,
  interpreter: Interpreter,
  visualizer: Visualizer,
  alerts: Option<AlertDispatcher>,
  portrait: bool,
}

impl<D: Detector> DetectionContext<D> {
  pub fn new(
    detector: D,
    labels: LabelMap,
    config: ContextConfig,
    alerts: Option<AlertDispatcher>,
  ) -> Self {
    let packer = TensorPacker::new(detector.input_size());
    let visualizer = Visualizer::new(labels.len());
    Self {
      detector,
      packer,
      interpreter: Interpreter::new(config.interpreter),
      labels,
      visualizer,
      alerts,
      portrait: config.portrait,
    }
  }

  pub fn labels(&self) -> &LabelMap {
    &self.labels
  }

  /// 处理一帧：旋转、打包、推理、解释、绘制、上报预警
  ///
  /// 同步阻塞，推理完成前不返回。帧在单一线程上串行到达，调用方
  /// 不需要做额外同步。
  pub fn process_frame(&self, image: &RgbImage) -> Result<ProcessedFrame> {
    let mut working = if self.portrait {
      imageops::rotate90(image)
    } else {
      image.clone()
    };

    let tensor = self.packer.pack(&working);
    let raw = self.detector.infer(&tensor).context("推理失败")?;
    let detections =
      self.interpreter
        .interpret(&raw, &self.labels, working.width(), working.height());

    self.visualizer.draw_detections(&mut working, &detections);

    if let Some(alerts) = &self.alerts {
      // 一帧里可能有多个槽位触发，去抖与合并交给调度器
      for detection in &detections {
        if detection.obstruction {
          alerts.notify_obstruction();
        }
      }
    }

    let image = if self.portrait {
      imageops::rotate270(&working)
    } else {
      working
    };

    debug!("本帧检测 {} 条", detections.len());
    Ok(ProcessedFrame { image, detections })
  }
}

impl DetectionContext<SsdMobileNet> {
  /// 加载模型与标签文件，构建完整上下文
  ///
  /// 模型或标签任一加载失败都让构建整体失败，没有降级模式。
  pub fn open(
    builder: SsdMobileNetBuilder,
    label_path: &Path,
    config: ContextConfig,
    alerts: Option<AlertDispatcher>,
  ) -> Result<Self> {
    let labels = LabelMap::from_file(label_path).context("标签表加载失败")?;
    let detector = builder.build().context("检测器构建失败")?;
    Ok(Self::new(detector, labels, config, alerts))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alert::{AlertConfig, Speaker, SpeakerError};
  use crate::detector::RawDetections;
  use crate::tensor::InputTensor;
  use std::convert::Infallible;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  struct StubDetector {
    raw: RawDetections,
  }

  impl StubDetector {
    fn with_slots(slots: &[([f32; 4], f32, f32)]) -> Self {
      let mut boxes = Vec::new();
      let mut classes = Vec::new();
      let mut scores = Vec::new();
      for (bbox, class, score) in slots {
        boxes.push(*bbox);
        classes.push(*class);
        scores.push(*score);
      }
      while boxes.len() < 10 {
        boxes.push([0.0; 4]);
        classes.push(0.0);
        scores.push(0.0);
      }
      Self {
        raw: RawDetections {
          boxes: boxes.into_boxed_slice(),
          classes: classes.into_boxed_slice(),
          scores: scores.into_boxed_slice(),
        },
      }
    }
  }

  impl Detector for StubDetector {
    type Error = Infallible;

    fn input_size(&self) -> u32 {
      300
    }

    fn infer(&self, _tensor: &InputTensor) -> Result<RawDetections, Self::Error> {
      Ok(self.raw.clone())
    }
  }

  struct CountingSpeaker {
    count: Arc<AtomicUsize>,
  }

  impl Speaker for CountingSpeaker {
    fn is_speaking(&mut self) -> bool {
      false
    }

    fn speak(&mut self, _text: &str) -> Result<(), SpeakerError> {
      self.count.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }
  }

  fn labels() -> LabelMap {
    LabelMap::from_lines(["person", "car"])
  }

  #[test]
  fn process_frame_annotates_and_flags_obstruction() {
    let detector = StubDetector::with_slots(&[([0.1, 0.6, 0.9, 0.9], 1.0, 0.9)]);
    let context = DetectionContext::new(detector, labels(), ContextConfig::default(), None);
    let frame = RgbImage::new(300, 300);

    let processed = context.process_frame(&frame).unwrap();

    assert_eq!(processed.image.dimensions(), (300, 300));
    assert_eq!(processed.detections.len(), 1);
    assert_eq!(processed.detections[0].label, "car");
    assert_eq!(processed.obstruction_count(), 1);
    // 框的左边缘 x=180 应当被着色
    assert_ne!(*processed.image.get_pixel(180, 150), image::Rgb([0, 0, 0]));
  }

  #[test]
  fn portrait_mode_returns_original_orientation() {
    let detector = StubDetector::with_slots(&[]);
    let config = ContextConfig {
      portrait: true,
      ..Default::default()
    };
    let context = DetectionContext::new(detector, labels(), config, None);
    let frame = RgbImage::new(200, 100);

    let processed = context.process_frame(&frame).unwrap();

    assert_eq!(processed.image.dimensions(), (200, 100));
    assert!(processed.detections.is_empty());
  }

  #[test]
  fn obstruction_notifies_dispatcher_once_per_frame_burst() {
    let count = Arc::new(AtomicUsize::new(0));
    let speaker = CountingSpeaker { count: count.clone() };
    let alerts = AlertDispatcher::spawn(
      speaker,
      AlertConfig {
        phrase: "Obstruction Ahead!".to_string(),
        delay: Duration::from_millis(20),
      },
    );

    // 两个槽位同时触发，调度器应合并为一次播报
    let detector = StubDetector::with_slots(&[
      ([0.1, 0.6, 0.9, 0.9], 1.0, 0.9),
      ([0.6, 0.1, 0.9, 0.9], 0.0, 0.8),
    ]);
    let context = DetectionContext::new(detector, labels(), ContextConfig::default(), Some(alerts));
    let frame = RgbImage::new(300, 300);

    let processed = context.process_frame(&frame).unwrap();
    assert_eq!(processed.obstruction_count(), 2);

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
