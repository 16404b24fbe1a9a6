// 该文件是 Qianlu （前路） 项目的一部分。
// src/detector/ssd.rs - SSD-MobileNet 检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::sync::Mutex;

use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use thiserror::Error;
use tracing::{debug, info};

use crate::detector::{Detector, RawDetections};
use crate::tensor::{InputTensor, TENSOR_CHANNELS};

/// SSD-MobileNet 默认输入边长
pub const SSD_DEFAULT_INPUT_SIZE: u32 = 300;
/// 默认推理线程数
pub const SSD_DEFAULT_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum SsdError {
  #[error("推理引擎错误: {0}")]
  Ort(#[from] ort::Error),
  #[error("模型没有输入张量")]
  MissingInput,
  #[error("模型输入不是张量: {0}")]
  InputNotTensor(String),
  #[error("模型输入形状无效: {0:?}")]
  BadInputShape(Vec<i64>),
  #[error("模型输入边长与配置不符: 模型声明 {declared}, 配置 {configured}")]
  InputSizeMismatch { declared: i64, configured: u32 },
  #[error("模型输出数量不足: 期望至少 3, 实际 {0}")]
  TooFewOutputs(usize),
  #[error("模型缺少 {0} 输出")]
  MissingOutput(&'static str),
  #[error("模型输出槽位数不一致: boxes={boxes}, classes={classes}, scores={scores}")]
  SlotMismatch {
    boxes: usize,
    classes: usize,
    scores: usize,
  },
  #[error("输入张量边长不匹配: 期望 {expected}, 实际 {actual}")]
  TensorSizeMismatch { expected: u32, actual: u32 },
}

/// SSD-MobileNet 检测器构建器
pub struct SsdMobileNetBuilder {
  model_path: PathBuf,
  input_size: u32,
  threads: usize,
  cuda: bool,
}

impl SsdMobileNetBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: SSD_DEFAULT_INPUT_SIZE,
      threads: SSD_DEFAULT_THREADS,
      cuda: false,
    }
  }

  /// 模型输入边长，必须与模型声明一致
  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  /// 启用 CUDA 执行提供者。注册失败即构建失败，没有 CPU 回退。
  pub fn cuda(mut self, enable: bool) -> Self {
    self.cuda = enable;
    self
  }

  pub fn build(self) -> Result<SsdMobileNet, SsdError> {
    info!("加载模型文件: {}", self.model_path.display());

    let mut builder = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.threads)?;
    if self.cuda {
      info!("注册 CUDA 执行提供者");
      builder = builder
        .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])?;
    }
    let session = builder.commit_from_file(&self.model_path)?;
    info!("模型加载完成");

    let input = session.inputs.first().ok_or(SsdError::MissingInput)?;
    let input_name = input.name.clone();
    let dims: Vec<i64> = match &input.input_type {
      ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
      other => return Err(SsdError::InputNotTensor(format!("{other:?}"))),
    };
    debug!("模型输入 {}: {:?}", input_name, dims);

    // 期望 NHWC: [1, N, N, 3]；边长与配置不符是致命配置错误
    if dims.len() != 4 || dims[3] != TENSOR_CHANNELS as i64 {
      return Err(SsdError::BadInputShape(dims));
    }
    for declared in [dims[1], dims[2]] {
      if declared > 0 && declared != self.input_size as i64 {
        return Err(SsdError::InputSizeMismatch {
          declared,
          configured: self.input_size,
        });
      }
    }

    let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
    debug!("模型输出: {:?}", output_names);
    if output_names.len() < 3 {
      return Err(SsdError::TooFewOutputs(output_names.len()));
    }

    Ok(SsdMobileNet {
      session: Mutex::new(session),
      input_name,
      output_names,
      input_size: self.input_size,
    })
  }
}

/// SSD-MobileNet 检测器
///
/// 持有一个已加载的网络实例，推理调用在内部加锁串行执行。
/// 槽位数量由模型自身的输出形状决定，不在这里硬编码。
pub struct SsdMobileNet {
  session: Mutex<Session>,
  input_name: String,
  output_names: Vec<String>,
  input_size: u32,
}

impl Detector for SsdMobileNet {
  type Error = SsdError;

  fn input_size(&self) -> u32 {
    self.input_size
  }

  fn infer(&self, tensor: &InputTensor) -> Result<RawDetections, SsdError> {
    if tensor.size() != self.input_size {
      return Err(SsdError::TensorSizeMismatch {
        expected: self.input_size,
        actual: tensor.size(),
      });
    }

    let n = self.input_size as usize;
    let value = Tensor::from_array(([1usize, n, n, TENSOR_CHANNELS], tensor.as_bytes().to_vec()))?;

    let mut session = self.session.lock().unwrap();
    let outputs = session.run(ort::inputs![self.input_name.as_str() => value])?;

    // 按形状识别三个输出张量：[1, K, 4] 是边界框，[1, K] 是类别或
    // 得分，[1] 是检测数量（忽略）。不同导出工具的输出命名并不统一。
    let mut boxes: Option<Vec<[f32; 4]>> = None;
    let mut flats: Vec<(String, Vec<f32>)> = Vec::new();

    for name in &self.output_names {
      let Some(value) = outputs.get(name.as_str()) else {
        continue;
      };
      let Ok((shape, data)) = value.try_extract_tensor::<f32>() else {
        debug!("跳过非浮点输出 {}", name);
        continue;
      };
      let dims: Vec<i64> = shape.iter().copied().collect();
      match dims.as_slice() {
        [1, _, 4] if boxes.is_none() => {
          boxes = Some(data.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect());
        }
        [1, _] => flats.push((name.clone(), data.to_vec())),
        [1] | [] => {}
        _ => debug!("跳过未识别的输出 {}: {:?}", name, dims),
      }
    }

    let boxes = boxes.ok_or(SsdError::MissingOutput("boxes"))?;
    let (classes, scores) = split_class_score(flats)?;

    if classes.len() != boxes.len() || scores.len() != boxes.len() {
      return Err(SsdError::SlotMismatch {
        boxes: boxes.len(),
        classes: classes.len(),
        scores: scores.len(),
      });
    }

    Ok(RawDetections {
      boxes: boxes.into_boxed_slice(),
      classes: classes.into_boxed_slice(),
      scores: scores.into_boxed_slice(),
    })
  }
}

/// 区分类别输出与得分输出
///
/// 先看输出名里的提示，分不出来时按声明顺序取。TFLite 转换出的
/// 模型约定顺序为 boxes、classes、scores。
fn split_class_score(flats: Vec<(String, Vec<f32>)>) -> Result<(Vec<f32>, Vec<f32>), SsdError> {
  if flats.len() < 2 {
    return Err(SsdError::MissingOutput("classes/scores"));
  }

  let class_hint = flats
    .iter()
    .position(|(name, _)| name.to_lowercase().contains("class"));
  let score_hint = flats
    .iter()
    .position(|(name, _)| name.to_lowercase().contains("score"));

  let (class_idx, score_idx) = match (class_hint, score_hint) {
    (Some(c), Some(s)) if c != s => (c, s),
    (Some(c), _) => (c, if c == 0 { 1 } else { 0 }),
    (None, Some(s)) => (if s == 0 { 1 } else { 0 }, s),
    (None, None) => (0, 1),
  };

  let mut flats: Vec<Option<Vec<f32>>> = flats.into_iter().map(|(_, data)| Some(data)).collect();
  let classes = flats[class_idx].take().unwrap();
  let scores = flats[score_idx].take().unwrap();
  Ok((classes, scores))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_prefers_name_hints() {
    let flats = vec![
      ("detection_scores".to_string(), vec![0.9, 0.1]),
      ("detection_classes".to_string(), vec![1.0, 2.0]),
    ];
    let (classes, scores) = split_class_score(flats).unwrap();
    assert_eq!(classes, vec![1.0, 2.0]);
    assert_eq!(scores, vec![0.9, 0.1]);
  }

  #[test]
  fn split_falls_back_to_declaration_order() {
    let flats = vec![
      ("output_1".to_string(), vec![3.0]),
      ("output_2".to_string(), vec![0.7]),
    ];
    let (classes, scores) = split_class_score(flats).unwrap();
    assert_eq!(classes, vec![3.0]);
    assert_eq!(scores, vec![0.7]);
  }

  #[test]
  fn split_requires_two_outputs() {
    let flats = vec![("only".to_string(), vec![0.5])];
    assert!(split_class_score(flats).is_err());
  }
}
