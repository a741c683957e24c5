//! 通知发送器模块
//!
//! 定义告警事件投递的trait和基础实现

use crate::health::tracker::{AlertEvent, AlertKind};
use crate::notification::template::AlertFormatter;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// 告警日志使用的tracing target
pub const ALERT_TARGET: &str = "alert";

/// 通知消息结构
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// 消息标题
    pub title: String,
    /// 消息内容
    pub content: String,
    /// 相关URL
    pub url: String,
    /// 消息类型
    pub message_type: MessageType,
}

/// 消息类型
#[derive(Debug, Clone)]
pub enum MessageType {
    /// 告警消息
    Alert,
    /// 恢复消息
    Recovery,
    /// 信息消息
    Info,
}

/// 通知投递trait
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 渠道名称
    fn name(&self) -> &str;

    /// 投递告警事件
    ///
    /// # 参数
    /// * `event` - 告警事件
    ///
    /// # 返回
    /// * `Result<()>` - 投递结果，失败由调用方记录，不影响监控
    async fn notify(&self, event: &AlertEvent) -> Result<()>;

    /// 发送自定义消息
    async fn send_message(&self, message: &NotificationMessage) -> Result<()>;
}

/// 空的通知实现（用于测试或禁用通知）
pub struct NoOpSink;

#[async_trait]
impl NotificationSink for NoOpSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self, _event: &AlertEvent) -> Result<()> {
        Ok(())
    }

    async fn send_message(&self, _message: &NotificationMessage) -> Result<()> {
        Ok(())
    }
}

/// 告警日志通知，写入 `alert` target，由日志系统路由到告警日志文件
pub struct AlertLogSink {
    formatter: Arc<AlertFormatter>,
}

impl AlertLogSink {
    /// 创建告警日志通知
    pub fn new(formatter: Arc<AlertFormatter>) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl NotificationSink for AlertLogSink {
    fn name(&self) -> &str {
        "alert-log"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        let line = self.formatter.render_line(event)?;
        match event.kind {
            AlertKind::Down => warn!(target: ALERT_TARGET, "{}", line),
            AlertKind::Recovered => info!(target: ALERT_TARGET, "{}", line),
        }
        Ok(())
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        info!(target: ALERT_TARGET, "{}: {}", message.title, message.content);
        Ok(())
    }
}

/// 扇出通知，把事件投递给所有子渠道
///
/// 单个渠道失败不影响其他渠道，全部投递后汇总错误
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    /// 创建空的扇出通知
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加子渠道
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// 子渠道数量
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// 是否没有子渠道
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn collect_failures(failures: Vec<String>) -> Result<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} 个通知渠道投递失败: {}",
                failures.len(),
                failures.join("; ")
            ))
        }
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event).await {
                failures.push(format!("{}: {e:#}", sink.name()));
            }
        }
        Self::collect_failures(failures)
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.send_message(message).await {
                failures.push(format!("{}: {e:#}", sink.name()));
            }
        }
        Self::collect_failures(failures)
    }
}
