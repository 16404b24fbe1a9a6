// 该文件是 Qianlu （前路） 项目的一部分。
// src/alert.rs - 语音预警调度
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

use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

/// 默认预警语句
pub const DEFAULT_ALERT_PHRASE: &str = "Obstruction Ahead!";
/// 触发到播报之间的固定延迟
pub const DEFAULT_ALERT_DELAY: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum SpeakerError {
  #[error("找不到可用的语音引擎（espeak / espeak-ng）")]
  EngineNotFound,
  #[error("语音进程启动失败: {0}")]
  Spawn(#[from] io::Error),
}

/// 语音合成引擎接口
///
/// speak 采用清空队列语义：新的播报会替换尚未完成的播报。
pub trait Speaker: Send {
  fn is_speaking(&mut self) -> bool;
  fn speak(&mut self, text: &str) -> Result<(), SpeakerError>;
}

/// 基于 espeak / espeak-ng 子进程的语音引擎
pub struct EspeakSpeaker {
  command: String,
  voice: String,
  child: Option<Child>,
}

impl EspeakSpeaker {
  /// 探测可用的 espeak 命令，两个都找不到则构建失败
  pub fn new(voice: &str) -> Result<Self, SpeakerError> {
    let command = ["espeak-ng", "espeak"]
      .into_iter()
      .find(|cmd| {
        Command::new(cmd)
          .arg("--version")
          .stdout(Stdio::null())
          .stderr(Stdio::null())
          .status()
          .is_ok()
      })
      .ok_or(SpeakerError::EngineNotFound)?;
    info!("使用语音引擎: {}", command);
    Ok(Self {
      command: command.to_string(),
      voice: voice.to_string(),
      child: None,
    })
  }
}

impl Speaker for EspeakSpeaker {
  fn is_speaking(&mut self) -> bool {
    match self.child.as_mut() {
      Some(child) => matches!(child.try_wait(), Ok(None)),
      None => false,
    }
  }

  fn speak(&mut self, text: &str) -> Result<(), SpeakerError> {
    // 清空队列：终止未完成的播报再开新的
    if let Some(mut child) = self.child.take() {
      let _ = child.kill();
      let _ = child.wait();
    }
    let child = Command::new(&self.command)
      .args(["-v", &self.voice])
      .arg(text)
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;
    self.child = Some(child);
    Ok(())
  }
}

impl Drop for EspeakSpeaker {
  fn drop(&mut self) {
    if let Some(mut child) = self.child.take() {
      let _ = child.kill();
      let _ = child.wait();
    }
  }
}

/// 预警配置
#[derive(Debug, Clone)]
pub struct AlertConfig {
  pub phrase: String,
  pub delay: Duration,
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      phrase: DEFAULT_ALERT_PHRASE.to_string(),
      delay: DEFAULT_ALERT_DELAY,
    }
  }
}

/// 预警调度器
///
/// 触发信号经通道交给唯一的播报线程消费，“是否在播报”的检查与播报
/// 动作因此发生在同一线程上，不存在先检查后动作的竞态窗口。只做
/// 去抖：播报结束后没有冷却期，后续帧可以立即再次触发。
pub struct AlertDispatcher {
  tx: Option<Sender<()>>,
  worker: Option<JoinHandle<()>>,
}

impl AlertDispatcher {
  pub fn spawn<S: Speaker + 'static>(speaker: S, config: AlertConfig) -> Self {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || alert_worker(speaker, config, rx));
    Self {
      tx: Some(tx),
      worker: Some(worker),
    }
  }

  /// 上报一次障碍信号，从不阻塞调用方
  ///
  /// 同一帧内的多次触发由播报线程合并，最多产生一次播报。
  pub fn notify_obstruction(&self) {
    if let Some(tx) = &self.tx {
      let _ = tx.send(());
    }
  }
}

impl Drop for AlertDispatcher {
  fn drop(&mut self) {
    // 先关闭通道让播报线程退出，再等它结束
    self.tx.take();
    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}

fn alert_worker<S: Speaker>(mut speaker: S, config: AlertConfig, rx: Receiver<()>) {
  while rx.recv().is_ok() {
    if speaker.is_speaking() {
      debug!("播报进行中，忽略触发");
      continue;
    }

    thread::sleep(config.delay);

    // 合并延迟期间积累的触发
    while rx.try_recv().is_ok() {}

    if speaker.is_speaking() {
      continue;
    }
    // 播报失败不能影响帧处理，记录后丢弃
    if let Err(e) = speaker.speak(&config.phrase) {
      warn!("播报失败: {}", e);
    }
  }
}
