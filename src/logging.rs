//! 日志系统模块
//!
//! 提供结构化日志配置和管理功能：控制台输出（文本或JSON）、运行日志文件，
//! 以及只接收 `alert` target 事件的告警日志文件

use crate::config::LoggingConfig;
use crate::notification::sender::ALERT_TARGET;
use anyhow::Context;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing_subscriber::filter::{Directive, Targets};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn lock_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 运行日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 告警日志文件路径（可选）
    pub alert_file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            alert_file_path: None,
            console: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 从配置文件的日志配置构建
    ///
    /// # 参数
    /// * `config` - 日志配置段
    /// * `level_override` - 命令行指定的日志级别，优先于配置文件
    pub fn from_logging_config(config: &LoggingConfig, level_override: Option<&str>) -> Self {
        let level = level_override
            .or(Some(config.level.as_str()))
            .and_then(|level| LevelFilter::from_str(level).ok())
            .unwrap_or(LevelFilter::Info);

        Self {
            level,
            file_path: config.log_file_path(),
            alert_file_path: config.alert_log_file_path(),
            console: true,
            json_format: config.json_format,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 生效的日志级别
    level: LevelFilter,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 进程内只安装一次全局subscriber，重复调用直接返回
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `anyhow::Result<LoggingSystem>` - 初始化结果
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let mut state = lock_state();
        if !state.initialized {
            Self::init_log_tracer()?;
            Self::init_tracing_subscriber(&config)?;
            state.initialized = true;
        }

        Ok(Self {
            level: config.level,
        })
    }

    /// 生效的日志级别
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接），进程内只执行一次
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        LOG_TRACER_INIT
            .get_or_init(|| LogTracer::init().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 构建级别过滤器，`RUST_LOG` 可以补充模块级别的设置
    fn build_env_filter(config: &LogConfig) -> EnvFilter {
        EnvFilter::from_default_env().add_directive(Self::level_directive(config.level))
    }

    /// 以追加模式打开日志文件，必要时创建目录
    fn open_log_file(path: &Path) -> anyhow::Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("创建日志目录失败: {}", parent.display()))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("打开日志文件失败: {}", path.display()))
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        // 控制台日志写到stderr，stdout留给命令输出
        if config.console {
            let console_layer = if config.json_format {
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr)
                    .with_filter(Self::build_env_filter(config))
                    .boxed()
            } else {
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(Self::build_env_filter(config))
                    .boxed()
            };
            layers.push(console_layer);
        }

        if let Some(file_path) = &config.file_path {
            let file = Self::open_log_file(file_path)?;
            let file_layer = if config.json_format {
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(Mutex::new(file))
                    .with_filter(Self::build_env_filter(config))
                    .boxed()
            } else {
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(Self::build_env_filter(config))
                    .boxed()
            };
            layers.push(file_layer);
        }

        if let Some(alert_path) = &config.alert_file_path {
            let file = Self::open_log_file(alert_path)?;
            let alert_layer = fmt::layer()
                .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S".to_string()))
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_filter(Targets::new().with_target(ALERT_TARGET, tracing::Level::INFO))
                .boxed();
            layers.push(alert_layer);
        }

        let subscriber = Registry::default().with(layers);
        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
            }
            Err(_) => {
                // 同一进程中已经安装过subscriber（例如测试中重复初始化）
                tracing::debug!("日志系统已经初始化过了");
            }
        }

        Ok(())
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn level_directive(level: LevelFilter) -> Directive {
        match level {
            LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF.into(),
            LevelFilter::Error => tracing::Level::ERROR.into(),
            LevelFilter::Warn => tracing::Level::WARN.into(),
            LevelFilter::Info => tracing::Level::INFO.into(),
            LevelFilter::Debug => tracing::Level::DEBUG.into(),
            LevelFilter::Trace => tracing::Level::TRACE.into(),
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        lock_state().initialized
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        let mut state = lock_state();
        state.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            ..LogConfig::default()
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        assert!(LoggingSystem::setup_logging(config.clone()).is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次初始化直接返回，不会重复安装
        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_creates_log_files() {
        LoggingSystem::reset_for_testing();

        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            file_path: Some(dir.path().join("logs").join("health_check.log")),
            alert_file_path: Some(dir.path().join("logs").join("alerts.log")),
            console: false,
            ..create_test_config()
        };

        assert!(LoggingSystem::setup_logging(config).is_ok());
        assert!(dir.path().join("logs").join("health_check.log").exists());
        assert!(dir.path().join("logs").join("alerts.log").exists());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            json_format: true,
            ..create_test_config()
        };

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_reports_level() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            level: LevelFilter::Debug,
            ..create_test_config()
        };
        let system = LoggingSystem::setup_logging(config).unwrap();

        assert_eq!(system.level(), LevelFilter::Debug);
    }

    #[test]
    fn test_from_logging_config() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            ..LoggingConfig::default()
        };

        let config = LogConfig::from_logging_config(&logging, None);
        assert_eq!(config.level, LevelFilter::Warn);
        assert!(config.json_format);
        assert_eq!(
            config.file_path,
            Some(PathBuf::from("logs").join("health_check.log"))
        );

        let overridden = LogConfig::from_logging_config(&logging, Some("debug"));
        assert_eq!(overridden.level, LevelFilter::Debug);

        let invalid = LogConfig::from_logging_config(&logging, Some("loud"));
        assert_eq!(invalid.level, LevelFilter::Info);
    }
}
