//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Uptime Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum UptimeVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测器相关错误
    #[error("探测器错误: {0}")]
    Probe(#[from] ProbeError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// 报告相关错误
    #[error("报告错误: {0}")]
    Report(#[from] ReportError),

    /// 没有可监控的URL
    #[error("没有可监控的URL，请在配置文件的 monitor.urls 或URL列表文件中添加地址")]
    NoUrls,

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探测器错误类型
///
/// 单次探测的失败都编码在 `CheckResult` 中，这里只包含构建探测器本身的错误
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// 请求头无效
    #[error("无效的请求头: {name}")]
    InvalidHeader { name: String },
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

/// 报告错误类型
#[derive(Error, Debug)]
pub enum ReportError {
    /// 报告写入失败
    #[error("报告写入失败 {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 报告渲染失败
    #[error("报告渲染失败: {0}")]
    RenderError(String),

    /// 快照文件不存在
    #[error("快照文件不存在: {path}")]
    SnapshotNotFound { path: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, UptimeVitalsError>;
