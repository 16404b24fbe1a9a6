// 该文件是 Qianlu （前路） 项目的一部分。
// src/interpret.rs - 检测结果解释
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use crate::detector::RawDetections;
use crate::labels::LabelMap;

/// 默认置信度阈值，得分需严格大于该值才算有效检测
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// 解释器配置
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
  /// 置信度阈值（严格大于）
  pub score_threshold: f32,
}

impl Default for InterpreterConfig {
  fn default() -> Self {
    Self {
      score_threshold: DEFAULT_SCORE_THRESHOLD,
    }
  }
}

/// 一条已解释的检测结果，坐标为帧像素
#[derive(Debug, Clone)]
pub struct Detection {
  pub class_id: usize,
  pub label: String,
  pub score: f32,
  pub top: f32,
  pub left: f32,
  pub bottom: f32,
  pub right: f32,
  /// 该检测是否满足障碍预警条件
  pub obstruction: bool,
}

impl Detection {
  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }
}

/// 检测解释器
///
/// 按模型返回的槽位顺序过滤、换算并判定障碍条件，不重新排序。
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
  config: InterpreterConfig,
}

impl Interpreter {
  pub fn new(config: InterpreterConfig) -> Self {
    Self { config }
  }

  /// 解释一帧的原始输出
  ///
  /// 槽位数组总是满长度，低分槽位视为空，不以数组长度作判断。
  /// top/bottom 乘帧高，left/right 乘帧宽，得到像素坐标。
  pub fn interpret(
    &self,
    raw: &RawDetections,
    labels: &LabelMap,
    frame_width: u32,
    frame_height: u32,
  ) -> Vec<Detection> {
    let w = frame_width as f32;
    let h = frame_height as f32;
    let mut detections = Vec::new();

    for slot in 0..raw.len() {
      let score = raw.scores[slot];
      // NaN 与低分一律跳过
      if !(score > self.config.score_threshold) {
        continue;
      }

      let [top, left, bottom, right] = raw.boxes[slot];
      let top = top * h;
      let left = left * w;
      let bottom = bottom * h;
      let right = right * w;

      let class_id = raw.classes[slot] as usize;

      // 障碍判定：取坐标之和（不是中点）与帧边长比较，严格大于才触发
      let mid_x = left + right;
      let mid_y = top + bottom;
      let obstruction = mid_x > w || mid_y > h;

      detections.push(Detection {
        class_id,
        label: labels.name(class_id).to_string(),
        score,
        top,
        left,
        bottom,
        right,
        obstruction,
      });
    }

    debug!("本帧有效检测 {} 条", detections.len());
    detections
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::RawDetections;
  use crate::labels::{LabelMap, UNKNOWN_LABEL};

  /// 构造固定 10 槽位的模型输出，模拟真实模型的填充行为
  fn raw_slots(slots: &[([f32; 4], f32, f32)]) -> RawDetections {
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
    RawDetections {
      boxes: boxes.into_boxed_slice(),
      classes: classes.into_boxed_slice(),
      scores: scores.into_boxed_slice(),
    }
  }

  fn labels() -> LabelMap {
    LabelMap::from_lines(["person", "car"])
  }

  #[test]
  fn score_at_threshold_is_skipped() {
    // 恰好等于阈值不算有效，框的内容无关紧要
    let raw = raw_slots(&[([0.1, 0.6, 0.9, 0.9], 1.0, 0.5)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 300, 300);
    assert!(out.is_empty());
  }

  #[test]
  fn padded_slots_do_not_produce_detections() {
    let raw = raw_slots(&[]);
    assert_eq!(raw.len(), 10);
    let out = Interpreter::default().interpret(&raw, &labels(), 300, 300);
    assert!(out.is_empty());
  }

  #[test]
  fn rescale_uses_frame_dimensions() {
    let raw = raw_slots(&[([0.1, 0.1, 0.9, 0.9], 1.0, 0.9)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 300, 300);
    assert_eq!(out.len(), 1);
    let det = &out[0];
    assert_eq!(det.label, "car");
    assert!((det.top - 30.0).abs() < 1e-4);
    assert!((det.left - 30.0).abs() < 1e-4);
    assert!((det.bottom - 270.0).abs() < 1e-4);
    assert!((det.right - 270.0).abs() < 1e-4);
    // 坐标和恰好等于边长（300）时不严格大于，不触发
    assert!(!det.obstruction);
  }

  #[test]
  fn shifted_box_triggers_obstruction() {
    let raw = raw_slots(&[([0.1, 0.6, 0.9, 0.9], 1.0, 0.9)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 300, 300);
    assert_eq!(out.len(), 1);
    // left=180, right=270，坐标和 450 > 300
    assert!(out[0].obstruction);
  }

  #[test]
  fn vertical_sum_triggers_on_its_own() {
    let raw = raw_slots(&[([0.6, 0.1, 0.9, 0.9], 1.0, 0.9)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 300, 300);
    // mid_x = 300 不触发，mid_y = 450 > 300 触发
    assert!(out[0].obstruction);
  }

  #[test]
  fn rectangular_frame_uses_each_dimension() {
    let raw = raw_slots(&[([0.5, 0.25, 1.0, 0.5], 0.0, 0.8)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 400, 200);
    let det = &out[0];
    assert!((det.top - 100.0).abs() < 1e-4);
    assert!((det.left - 100.0).abs() < 1e-4);
    assert!((det.bottom - 200.0).abs() < 1e-4);
    assert!((det.right - 200.0).abs() < 1e-4);
  }

  #[test]
  fn slots_keep_model_order() {
    let raw = raw_slots(&[
      ([0.1, 0.1, 0.2, 0.2], 0.0, 0.9),
      ([0.3, 0.3, 0.4, 0.4], 1.0, 0.7),
    ]);
    let out = Interpreter::default().interpret(&raw, &labels(), 100, 100);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].label, "person");
    assert_eq!(out[1].label, "car");
  }

  #[test]
  fn unknown_class_gets_placeholder_label() {
    let raw = raw_slots(&[([0.1, 0.1, 0.2, 0.2], 57.0, 0.9)]);
    let out = Interpreter::default().interpret(&raw, &labels(), 100, 100);
    assert_eq!(out[0].label, UNKNOWN_LABEL);
  }
}
