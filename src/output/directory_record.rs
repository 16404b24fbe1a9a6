// 该文件是 Qianlu （前路） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use image::RgbImage;
use serde_json::json;

use super::OutputWriter;
use crate::interpret::Detection;

/// 目录记录输出
///
/// 检测明细逐行追加到 detections.jsonl；有检测的帧按日期目录另存
/// 一份 PNG。
pub struct DirectoryRecord {
  directory: PathBuf,
  record: File,
  frame_counter: u32,
}

impl DirectoryRecord {
  pub fn new(directory: &str) -> Result<Self> {
    let directory = PathBuf::from(directory);
    fs::create_dir_all(&directory)
      .with_context(|| format!("无法创建记录目录: {}", directory.display()))?;

    let record_path = directory.join("detections.jsonl");
    let record = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&record_path)
      .with_context(|| format!("无法打开记录文件: {}", record_path.display()))?;

    Ok(Self {
      directory,
      record,
      frame_counter: 0,
    })
  }

  fn frame_path(&self, counter: u32) -> Result<PathBuf> {
    let now = Utc::now();
    let day_dir = self.directory.join(now.format("%Y-%m-%d").to_string());
    if !day_dir.exists() {
      fs::create_dir_all(&day_dir).with_context(|| format!("无法创建目录: {}", day_dir.display()))?;
    }
    Ok(day_dir.join(format!("{}-{:04X}.png", now.format("%H-%M-%S"), counter)))
  }
}

impl OutputWriter for DirectoryRecord {
  fn write_frame(&mut self, image: &RgbImage, detections: &[Detection]) -> Result<()> {
    self.frame_counter += 1;

    let line = json!({
      "time": Utc::now().to_rfc3339(),
      "frame": self.frame_counter,
      "detections": detections.iter().map(|det| json!({
        "label": det.label,
        "class_id": det.class_id,
        "score": det.score,
        "top": det.top,
        "left": det.left,
        "bottom": det.bottom,
        "right": det.right,
        "obstruction": det.obstruction,
      })).collect::<Vec<_>>(),
    });
    writeln!(self.record, "{}", line).context("无法写入记录文件")?;

    if !detections.is_empty() {
      let path = self.frame_path(self.frame_counter)?;
      image
        .save(&path)
        .with_context(|| format!("无法保存帧图像: {}", path.display()))?;
    }

    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    self.record.flush().context("无法刷新记录文件")?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn detection() -> Detection {
    Detection {
      class_id: 1,
      label: "car".to_string(),
      score: 0.9,
      top: 30.0,
      left: 30.0,
      bottom: 270.0,
      right: 270.0,
      obstruction: true,
    }
  }

  #[test]
  fn record_appends_jsonl_and_saves_frames_with_detections() {
    let dir = tempfile::tempdir().unwrap();
    let mut output = DirectoryRecord::new(dir.path().to_str().unwrap()).unwrap();
    let image = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));

    output.write_frame(&image, &[]).unwrap();
    output.write_frame(&image, &[detection()]).unwrap();
    output.finish().unwrap();

    let text = std::fs::read_to_string(dir.path().join("detections.jsonl")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["detections"][0]["label"], "car");
    assert_eq!(second["detections"][0]["obstruction"], true);

    // 只有第二帧有检测，应当恰好保存一张 PNG
    let pngs: Vec<_> = walk_pngs(dir.path());
    assert_eq!(pngs.len(), 1);
  }

  fn walk_pngs(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).unwrap().flatten() {
      let path = entry.path();
      if path.is_dir() {
        found.extend(walk_pngs(&path));
      } else if path.extension().and_then(|e| e.to_str()) == Some("png") {
        found.push(path);
      }
    }
    found
  }
}
