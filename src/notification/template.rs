//! 消息模板模块
//!
//! 基于Handlebars的告警消息格式化，故障告警和恢复通知共用同一个格式化器，按事件类型选择模板

use crate::error::NotificationError;
use crate::health::tracker::{AlertEvent, AlertKind};
use crate::notification::sender::{MessageType, NotificationMessage};
use handlebars::Handlebars;
use serde_json::{json, Value};
use std::time::Duration;

/// 默认的告警消息模板
pub const DEFAULT_ALERT_TEMPLATE: &str = r#"**服务地址**: {{url}}
**状态码**: {{status_code}}
**连续失败**: {{consecutive_failures}} 次
**检测时间**: {{timestamp}}
{{#if message}}**错误信息**: {{message}}
{{/if}}"#;

/// 默认的恢复消息模板
pub const DEFAULT_RECOVERY_TEMPLATE: &str = r#"**服务地址**: {{url}}
**状态码**: {{status_code}}
**故障时长**: {{downtime}}
**恢复时间**: {{timestamp}}"#;

const ALERT_TITLE_TEMPLATE: &str = "🚨 服务告警 - {{url}}";
const RECOVERY_TITLE_TEMPLATE: &str = "✅ 服务恢复 - {{url}}";
const ALERT_LINE_TEMPLATE: &str = "[ALERT] {{url}} DOWN - Code: {{status_code}} - {{message}}";
const RECOVERY_LINE_TEMPLATE: &str = "[RECOVERY] {{url}} UP after {{downtime_seconds}}s downtime";

/// 告警消息格式化器
pub struct AlertFormatter {
    registry: Handlebars<'static>,
}

impl AlertFormatter {
    /// 使用默认模板创建格式化器
    pub fn new() -> Result<Self, NotificationError> {
        Self::with_templates(None, None)
    }

    /// 使用自定义正文模板创建格式化器，未提供的模板使用默认值
    ///
    /// # 参数
    /// * `alert_template` - 故障告警正文模板
    /// * `recovery_template` - 恢复通知正文模板
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板语法错误时返回错误
    pub fn with_templates(
        alert_template: Option<&str>,
        recovery_template: Option<&str>,
    ) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let templates = [
            ("down_title", ALERT_TITLE_TEMPLATE),
            ("down_body", alert_template.unwrap_or(DEFAULT_ALERT_TEMPLATE)),
            ("down_line", ALERT_LINE_TEMPLATE),
            ("recovered_title", RECOVERY_TITLE_TEMPLATE),
            (
                "recovered_body",
                recovery_template.unwrap_or(DEFAULT_RECOVERY_TEMPLATE),
            ),
            ("recovered_line", RECOVERY_LINE_TEMPLATE),
        ];

        for (name, template) in templates {
            registry
                .register_template_string(name, template)
                .map_err(|e| NotificationError::TemplateError(format!("{name}: {e}")))?;
        }

        Ok(Self { registry })
    }

    /// 渲染通知消息（标题和正文）
    pub fn render(&self, event: &AlertEvent) -> Result<NotificationMessage, NotificationError> {
        let context = Self::context(event);
        let prefix = Self::prefix(event.kind);

        let title = self.render_named(&format!("{prefix}_title"), &context)?;
        let content = self.render_named(&format!("{prefix}_body"), &context)?;

        Ok(NotificationMessage {
            title,
            content: content.trim_end().to_string(),
            url: event.url.clone(),
            message_type: match event.kind {
                AlertKind::Down => MessageType::Alert,
                AlertKind::Recovered => MessageType::Recovery,
            },
        })
    }

    /// 渲染单行告警日志
    pub fn render_line(&self, event: &AlertEvent) -> Result<String, NotificationError> {
        let context = Self::context(event);
        self.render_named(&format!("{}_line", Self::prefix(event.kind)), &context)
    }

    fn render_named(&self, name: &str, context: &Value) -> Result<String, NotificationError> {
        self.registry
            .render(name, context)
            .map_err(|e| NotificationError::TemplateError(format!("{name}: {e}")))
    }

    fn prefix(kind: AlertKind) -> &'static str {
        match kind {
            AlertKind::Down => "down",
            AlertKind::Recovered => "recovered",
        }
    }

    /// 构建模板上下文
    fn context(event: &AlertEvent) -> Value {
        let status_code = match event.status_code {
            Some(code) if code > 0 => code.to_string(),
            _ => "N/A".to_string(),
        };
        let downtime = event.downtime_duration.unwrap_or_default();

        json!({
            "event_id": event.id.to_string(),
            "url": event.url,
            "kind": event.kind.to_string(),
            "status_code": status_code,
            "message": event.message.clone().unwrap_or_default(),
            "consecutive_failures": event.consecutive_failures.unwrap_or_default(),
            "downtime": format_duration(downtime),
            "downtime_seconds": downtime.as_secs(),
            "timestamp": event.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })
    }
}

/// 将时长格式化为易读的中文描述
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);

    if hours > 0 {
        format!("{hours}小时{minutes}分{seconds}秒")
    } else if minutes > 0 {
        format!("{minutes}分{seconds}秒")
    } else {
        format!("{seconds}秒")
    }
}
