//! 检测结果数据结构
//!
//! 定义单次探测的结果类型和错误分类

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 探测失败的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// 没有传输层错误（收到了响应，可能是非健康状态码）
    #[default]
    None,
    /// 请求超时
    Timeout,
    /// 连接失败（拒绝连接、DNS失败等）
    ConnectionError,
    /// 其他请求错误
    OtherRequestError,
    /// 非预期错误（探测任务异常退出）
    UnexpectedError,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::None => write!(f, "无"),
            ErrorClass::Timeout => write!(f, "超时"),
            ErrorClass::ConnectionError => write!(f, "连接错误"),
            ErrorClass::OtherRequestError => write!(f, "请求错误"),
            ErrorClass::UnexpectedError => write!(f, "非预期错误"),
        }
    }
}

/// 单次探测结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// 检测ID
    pub id: Uuid,
    /// 被探测的URL
    pub url: String,
    /// 检测时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否健康
    pub healthy: bool,
    /// HTTP状态码，未收到响应时为0
    pub status_code: u16,
    /// 响应时间（秒）
    pub response_time_seconds: f64,
    /// 错误分类
    pub error_class: ErrorClass,
    /// 结果描述
    pub message: String,
}

impl CheckResult {
    /// 创建新的检测结果
    ///
    /// # 参数
    /// * `url` - 被探测的URL
    /// * `healthy` - 是否健康
    ///
    /// # 返回
    /// * `Self` - 检测结果实例
    pub fn new(url: impl Into<String>, healthy: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            timestamp: Utc::now(),
            healthy,
            status_code: 0,
            response_time_seconds: 0.0,
            error_class: ErrorClass::None,
            message: if healthy { "OK".to_string() } else { String::new() },
        }
    }

    /// 探测任务异常退出时的结果
    pub fn unexpected(url: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::new(url, false).with_error(
            ErrorClass::UnexpectedError,
            format!("Unexpected error: {detail}"),
        )
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// 设置响应时间
    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time_seconds = response_time.as_secs_f64();
        self
    }

    /// 设置错误分类和描述
    pub fn with_error(mut self, error_class: ErrorClass, message: impl Into<String>) -> Self {
        self.error_class = error_class;
        self.message = message.into();
        self
    }

    /// 设置描述
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 设置时间戳
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 状态标签，与报告中的 `UP`/`DOWN` 对应
    pub fn status_label(&self) -> &'static str {
        if self.healthy {
            "UP"
        } else {
            "DOWN"
        }
    }
}
