//! Webhook通知发送器模块
//!
//! 以飞书机器人交互卡片格式投递告警，配置密钥时附带HMAC-SHA256签名

use crate::config::NotificationConfig;
use crate::health::tracker::AlertEvent;
use crate::notification::sender::{MessageType, NotificationMessage, NotificationSink};
use crate::notification::template::AlertFormatter;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

/// Webhook通知发送器
pub struct WebhookSink {
    /// HTTP客户端
    client: Client,
    /// webhook地址
    webhook_url: String,
    /// 签名密钥
    secret: Option<String>,
    /// 消息格式化器
    formatter: Arc<AlertFormatter>,
}

impl WebhookSink {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `webhook_url` - webhook地址
    /// * `secret` - 签名密钥
    /// * `timeout` - 发送超时时间
    /// * `formatter` - 消息格式化器
    pub fn new(
        webhook_url: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
        formatter: Arc<AlertFormatter>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            secret: secret.filter(|s| !s.is_empty()),
            formatter,
        })
    }

    /// 从通知配置创建，未配置webhook地址时返回错误
    pub fn from_config(config: &NotificationConfig, formatter: Arc<AlertFormatter>) -> Result<Self> {
        let webhook_url = config
            .webhook_url
            .clone()
            .ok_or_else(|| anyhow!("未配置 notification.webhook_url"))?;

        Self::new(
            webhook_url,
            config.secret.clone(),
            Duration::from_secs(config.timeout_seconds),
            formatter,
        )
    }

    /// 构建交互卡片消息体
    fn build_message_body(&self, message: &NotificationMessage) -> Value {
        let color = match message.message_type {
            MessageType::Alert => "red",
            MessageType::Recovery => "green",
            MessageType::Info => "blue",
        };

        json!({
            "msg_type": "interactive",
            "card": {
                "elements": [
                    {
                        "tag": "div",
                        "text": {
                            "content": message.content,
                            "tag": "lark_md"
                        }
                    }
                ],
                "header": {
                    "title": {
                        "content": message.title,
                        "tag": "plain_text"
                    },
                    "template": color
                }
            }
        })
    }

    /// 为消息体附加时间戳和签名
    fn attach_signature(&self, body: &mut Value, timestamp: i64) -> Result<()> {
        if let Some(secret) = &self.secret {
            let sign = sign(secret, timestamp)?;
            if let Some(object) = body.as_object_mut() {
                object.insert("timestamp".to_string(), json!(timestamp.to_string()));
                object.insert("sign".to_string(), json!(sign));
            }
        }
        Ok(())
    }

    /// 发送消息到webhook
    async fn send_to_webhook(&self, mut body: Value) -> Result<()> {
        self.attach_signature(&mut body, chrono::Utc::now().timestamp())?;
        debug!("发送消息到webhook: {}", self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("发送webhook消息失败")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("webhook消息发送失败: {} - {}", status, text);
            return Err(anyhow!("webhook消息发送失败: {}", status));
        }

        // 飞书在HTTP 200中通过非零code返回业务错误
        if let Ok(reply) = serde_json::from_str::<Value>(&text) {
            if let Some(code) = reply.get("code").and_then(Value::as_i64) {
                if code != 0 {
                    let msg = reply.get("msg").and_then(Value::as_str).unwrap_or_default();
                    error!("webhook返回错误: code={} msg={}", code, msg);
                    return Err(anyhow!("webhook返回错误: code={code} msg={msg}"));
                }
            }
        }

        info!("webhook消息发送成功");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        let message = self.formatter.render(event)?;
        let body = self.build_message_body(&message);
        self.send_to_webhook(body).await
    }

    async fn send_message(&self, message: &NotificationMessage) -> Result<()> {
        let body = self.build_message_body(message);
        self.send_to_webhook(body).await
    }
}

/// 计算飞书机器人签名
///
/// 以 `"{timestamp}\n{secret}"` 为密钥对空消息做HMAC-SHA256，结果Base64编码
pub fn sign(secret: &str, timestamp: i64) -> Result<String> {
    let string_to_sign = format!("{timestamp}\n{secret}");
    let mac = HmacSha256::new_from_slice(string_to_sign.as_bytes())
        .map_err(|e| anyhow!("无效的签名密钥: {e}"))?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::CheckResult;
    use mockito::Matcher;

    fn formatter() -> Arc<AlertFormatter> {
        Arc::new(AlertFormatter::new().unwrap())
    }

    fn down_event() -> AlertEvent {
        let result = CheckResult::new("https://example.com/health", false)
            .with_status_code(500)
            .with_message("HTTP 500 Internal Server Error");
        AlertEvent::down(&result, 2)
    }

    #[test]
    fn test_sign_is_deterministic() {
        let first = sign("secret", 1_700_000_000).unwrap();
        let second = sign("secret", 1_700_000_000).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, sign("secret", 1_700_000_001).unwrap());
        // SHA256 摘要Base64编码后为44个字符
        assert_eq!(first.len(), 44);
    }

    #[test]
    fn test_message_body_structure() {
        let sink = WebhookSink::new(
            "https://example.com/hook",
            None,
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();
        let message = formatter().render(&down_event()).unwrap();
        let body = sink.build_message_body(&message);

        assert_eq!(body["msg_type"], "interactive");
        assert_eq!(body["card"]["header"]["template"], "red");
        assert_eq!(
            body["card"]["header"]["title"]["content"],
            "🚨 服务告警 - https://example.com/health"
        );
    }

    #[test]
    fn test_signature_attached_only_with_secret() {
        let unsigned = WebhookSink::new(
            "https://example.com/hook",
            Some(String::new()),
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();
        let mut body = json!({"msg_type": "interactive"});
        unsigned.attach_signature(&mut body, 1_700_000_000).unwrap();
        assert!(body.get("sign").is_none());

        let signed = WebhookSink::new(
            "https://example.com/hook",
            Some("secret".to_string()),
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();
        signed.attach_signature(&mut body, 1_700_000_000).unwrap();
        assert_eq!(body["timestamp"], "1700000000");
        assert_eq!(body["sign"], sign("secret", 1_700_000_000).unwrap());
    }

    #[tokio::test]
    async fn test_notify_posts_card() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::PartialJson(json!({
                "msg_type": "interactive",
                "card": {"header": {"template": "red"}}
            })))
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hook", server.url()),
            None,
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();

        sink.notify(&down_event()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notify_includes_signature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""sign":""#.to_string()),
                Matcher::Regex(r#""timestamp":""#.to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hook", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();

        sink.notify(&down_event()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hook", server.url()),
            None,
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();

        assert!(sink.notify(&down_event()).await.is_err());
    }

    #[tokio::test]
    async fn test_business_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body(r#"{"code":19021,"msg":"sign match fail or timestamp is not within one hour from current time"}"#)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hook", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(5),
            formatter(),
        )
        .unwrap();

        let err = sink.notify(&down_event()).await.unwrap_err();
        assert!(err.to_string().contains("19021"));
    }

    #[test]
    fn test_from_config_requires_url() {
        let config = NotificationConfig::default();
        assert!(WebhookSink::from_config(&config, formatter()).is_err());
    }
}
