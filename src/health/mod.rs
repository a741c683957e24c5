//! 健康检测模块
//!
//! 提供HTTP探测、检测历史、URL状态跟踪、监控统计和检测周期调度功能

pub mod history;
pub mod prober;
pub mod result;
pub mod scheduler;
pub mod stats;
pub mod tracker;

// 重新导出主要类型
pub use history::{HistoryStore, UrlHistory};
pub use prober::{HttpProber, ProbeSettings, Prober};
pub use result::{CheckResult, ErrorClass};
pub use scheduler::{
    CycleReport, MonitoringSummary, NotificationStats, Scheduler, SchedulerSettings,
};
pub use stats::MonitoringStats;
pub use tracker::{AlertEvent, AlertKind, StateTracker, UrlHealth, UrlState};
