// 该文件是 Qianlu （前路） 项目的一部分。
// src/labels.rs - 标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// 类别越界时使用的占位标签
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// 标签表
///
/// 每行一个标签，行号（从 0 开始）即模型输出的类别编号。
/// 加载一次后不再变化。
#[derive(Debug, Clone)]
pub struct LabelMap {
  labels: Vec<String>,
}

impl LabelMap {
  /// 从换行分隔的文本文件加载标签表
  pub fn from_file(path: &Path) -> Result<Self, LabelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let labels: Vec<String> = text
      .lines()
      .map(|line| line.trim_end_matches('\r').to_string())
      .collect();
    debug!("标签表加载完成: {} 个标签", labels.len());
    Ok(Self { labels })
  }

  pub fn from_lines<I, S>(lines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      labels: lines.into_iter().map(Into::into).collect(),
    }
  }

  /// 按类别编号查询标签
  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  /// 按类别编号查询标签，越界时返回占位标签
  pub fn name(&self, class_id: usize) -> &str {
    self.get(class_id).unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_map_indexes_by_line_number() {
    let labels = LabelMap::from_lines(["person", "car"]);
    assert_eq!(labels.get(0), Some("person"));
    assert_eq!(labels.get(1), Some("car"));
    assert_eq!(labels.get(2), None);
    assert_eq!(labels.name(1), "car");
    assert_eq!(labels.name(9), UNKNOWN_LABEL);
  }

  #[test]
  fn label_map_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labelmap.txt");
    std::fs::write(&path, "???\nperson\nbicycle\n").unwrap();
    let labels = LabelMap::from_file(&path).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(0), Some("???"));
    assert_eq!(labels.get(1), Some("person"));
  }

  #[test]
  fn label_map_missing_file_fails() {
    assert!(LabelMap::from_file(Path::new("/no/such/labelmap.txt")).is_err());
  }
}
