//! 通知模块
//!
//! 提供告警日志、webhook通知和消息模板功能

pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use sender::{
    AlertLogSink, FanoutSink, MessageType, NoOpSink, NotificationMessage, NotificationSink,
};
pub use template::AlertFormatter;
pub use webhook::WebhookSink;

use crate::config::NotificationConfig;
use std::sync::Arc;

/// 根据通知配置组装通知渠道
///
/// 告警日志始终启用，webhook仅在 `notification.enabled` 时加入
pub fn build_sink(config: &NotificationConfig) -> anyhow::Result<Arc<dyn NotificationSink>> {
    let formatter = Arc::new(AlertFormatter::with_templates(
        config.alert_template.as_deref(),
        config.recovery_template.as_deref(),
    )?);

    let mut fanout = FanoutSink::new().with_sink(Arc::new(AlertLogSink::new(formatter.clone())));

    if config.enabled {
        fanout = fanout.with_sink(Arc::new(WebhookSink::from_config(config, formatter)?));
    }

    Ok(Arc::new(fanout))
}
