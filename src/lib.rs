//! Uptime Vitals - URL可用性监控工具
//!
//! 周期性探测一组HTTP(S)地址，支持：
//! - 按连续失败阈值发送故障告警和恢复通知
//! - 有地址失败时自动切换到快速检测间隔
//! - 告警日志、飞书webhook通知
//! - JSON快照和HTML报告
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod report;
pub mod signal;

// 重新导出主要类型
pub use config::{Config, MonitorConfig};
pub use error::UptimeVitalsError;
pub use health::{AlertEvent, AlertKind, CheckResult, Prober, Scheduler, StateTracker};
pub use notification::NotificationSink;
pub use report::{Snapshot, SnapshotExporter};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
