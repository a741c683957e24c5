//! 配置管理模块
//!
//! 提供配置文件解析、验证、URL列表合并和默认配置回退功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{
    get_default_config_path, ConfigLoadOutcome, ConfigLoader, ConfigOrigin, TomlConfigLoader,
};
pub use types::{
    validate_config, Config, LoggingConfig, MonitorConfig, NotificationConfig, ReportConfig,
};
