//! 核心模块
//!
//! 包含命令分发和监控生命周期管理

pub mod app;
pub mod launcher;

// 重新导出主要类型
pub use app::execute_command;
pub use launcher::{MonitorLauncher, StartOverrides};
