// 该文件是 Qianlu （前路） 项目的一部分。
// src/tensor.rs - 帧到张量打包
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

use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

/// 张量固定为 RGB 三通道
pub const TENSOR_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum TensorError {
  #[error("张量数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 模型输入张量
///
/// N×N×3 字节，RGB 通道顺序，行主序，无填充。字节布局必须与模型
/// 声明的输入形状完全一致，否则推理输出只是一堆无意义的数字，
/// 而且不会有任何错误提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
  data: Box<[u8]>,
  size: u32,
}

impl InputTensor {
  /// 由原始字节构造，长度必须等于 size×size×3
  pub fn from_raw(size: u32, data: Vec<u8>) -> Result<Self, TensorError> {
    let expected = (size as usize) * (size as usize) * TENSOR_CHANNELS;
    if data.len() != expected {
      return Err(TensorError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      data: data.into_boxed_slice(),
      size,
    })
  }

  /// 张量边长
  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }
}

/// 帧到张量打包器
///
/// 把任意尺寸的 RGB 帧缩放到 N×N 后按 NHWC 排布。不保持宽高比，
/// 模型本身是在压扁的方形图上训练的，畸变是预期行为。
#[derive(Debug, Clone)]
pub struct TensorPacker {
  size: u32,
  filter: FilterType,
}

impl TensorPacker {
  pub fn new(size: u32) -> Self {
    Self {
      size,
      filter: FilterType::Nearest,
    }
  }

  pub fn with_filter(mut self, filter: FilterType) -> Self {
    self.filter = filter;
    self
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  /// 打包一帧。纯函数，同一输入必然产生字节级相同的张量。
  pub fn pack(&self, image: &RgbImage) -> InputTensor {
    let resized = if image.width() == self.size && image.height() == self.size {
      image.clone()
    } else {
      imageops::resize(image, self.size, self.size, self.filter)
    };
    InputTensor {
      data: resized.into_raw().into_boxed_slice(),
      size: self.size,
    }
  }
}
