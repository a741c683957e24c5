//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::history::DEFAULT_HISTORY_CAPACITY;
use crate::health::prober::DEFAULT_HEALTHY_STATUS_CODES;
use crate::health::tracker::DEFAULT_FAILURE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 监控配置
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 报告配置
    #[serde(default)]
    pub report: ReportConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// 监控配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// 直接配置的URL列表
    #[serde(default)]
    pub urls: Vec<String>,
    /// URL列表文件（每行一个URL）
    #[serde(default = "default_urls_file")]
    pub urls_file: Option<PathBuf>,
    /// 正常检测间隔（秒）
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// 有URL失败时的快速检测间隔（秒）
    #[serde(default = "default_quick_check_interval")]
    pub quick_check_interval_seconds: u64,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 连续失败告警阈值
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// 视为健康的状态码
    #[serde(default = "default_healthy_status_codes")]
    pub healthy_status_codes: Vec<u16>,
    /// 最大并发检测数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_checks: usize,
    /// 是否校验TLS证书
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    /// 每个URL保留的历史记录数
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 全局请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            urls_file: default_urls_file(),
            check_interval_seconds: default_check_interval(),
            quick_check_interval_seconds: default_quick_check_interval(),
            request_timeout_seconds: default_timeout(),
            failure_threshold: default_failure_threshold(),
            healthy_status_codes: default_healthy_status_codes(),
            max_concurrent_checks: default_max_concurrent(),
            verify_tls: default_verify_tls(),
            history_capacity: default_history_capacity(),
            headers: HashMap::new(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 日志目录
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    /// 运行日志文件名，为空时不写文件
    #[serde(default = "default_log_file")]
    pub log_file: Option<String>,
    /// 告警日志文件名，为空时不写文件
    #[serde(default = "default_alert_log_file")]
    pub alert_log_file: Option<String>,
    /// 是否使用JSON格式
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_directory: default_log_directory(),
            log_file: default_log_file(),
            alert_log_file: default_alert_log_file(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 运行日志文件完整路径
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file.as_ref().map(|name| self.log_directory.join(name))
    }

    /// 告警日志文件完整路径
    pub fn alert_log_file_path(&self) -> Option<PathBuf> {
        self.alert_log_file
            .as_ref()
            .map(|name| self.log_directory.join(name))
    }
}

/// 报告配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// 报告目录
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    /// JSON快照文件名
    #[serde(default = "default_report_file")]
    pub json_file: String,
    /// HTML报告文件名，为空时不生成
    #[serde(default)]
    pub html_file: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            json_file: default_report_file(),
            html_file: None,
        }
    }
}

impl ReportConfig {
    /// JSON快照完整路径
    pub fn json_path(&self) -> PathBuf {
        self.directory.join(&self.json_file)
    }

    /// HTML报告完整路径
    pub fn html_path(&self) -> Option<PathBuf> {
        self.html_file.as_ref().map(|name| self.directory.join(name))
    }
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// 是否启用webhook通知
    #[serde(default)]
    pub enabled: bool,
    /// webhook地址（飞书机器人格式）
    pub webhook_url: Option<String>,
    /// webhook签名密钥
    pub secret: Option<String>,
    /// 自定义告警模板
    pub alert_template: Option<String>,
    /// 自定义恢复模板
    pub recovery_template: Option<String>,
    /// 发送超时时间（秒）
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            secret: None,
            alert_template: None,
            recovery_template: None,
            timeout_seconds: default_notification_timeout(),
        }
    }
}

// 默认值函数
fn default_urls_file() -> Option<PathBuf> {
    Some(PathBuf::from("urls.txt"))
}
fn default_check_interval() -> u64 {
    300
}
fn default_quick_check_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    10
}
fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}
fn default_healthy_status_codes() -> Vec<u16> {
    DEFAULT_HEALTHY_STATUS_CODES.to_vec()
}
fn default_max_concurrent() -> usize {
    10
}
fn default_verify_tls() -> bool {
    true
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}
fn default_log_file() -> Option<String> {
    Some("health_check.log".to_string())
}
fn default_alert_log_file() -> Option<String> {
    Some("health_check_alerts.log".to_string())
}
fn default_report_file() -> String {
    "health_check_report.json".to_string()
}
fn default_notification_timeout() -> u64 {
    30
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    let monitor = &config.monitor;

    if monitor.check_interval_seconds == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if monitor.quick_check_interval_seconds == 0 {
        return Err("快速检测间隔不能为0".to_string());
    }

    if monitor.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if monitor.failure_threshold == 0 {
        return Err("失败阈值不能为0".to_string());
    }

    if monitor.max_concurrent_checks == 0 {
        return Err("最大并发检测数不能为0".to_string());
    }

    if monitor.history_capacity == 0 {
        return Err("历史记录容量不能为0".to_string());
    }

    if monitor.healthy_status_codes.is_empty() {
        return Err("必须指定至少一个健康状态码".to_string());
    }

    for &code in &monitor.healthy_status_codes {
        if !(100..=599).contains(&code) {
            return Err(format!("健康状态码 {code} 无效"));
        }
    }

    for url in &monitor.urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("URL格式无效: {url}"));
        }
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.logging.level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.logging.level, valid_log_levels
        ));
    }

    if config.report.json_file.trim().is_empty() {
        return Err("JSON快照文件名不能为空".to_string());
    }

    let notification = &config.notification;
    if notification.enabled {
        match &notification.webhook_url {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(url) => return Err(format!("webhook地址格式无效: {url}")),
            None => return Err("启用通知时必须配置 webhook_url".to_string()),
        }
        if notification.timeout_seconds == 0 {
            return Err("通知发送超时时间不能为0".to_string());
        }
    }

    Ok(())
}
