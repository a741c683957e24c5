//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Uptime Vitals - URL可用性监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uptime-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "UPTIME_VITALS_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的级别
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "UPTIME_VITALS_LOG_LEVEL",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出", global = true)]
    pub verbose: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl LogLevel {
    /// 级别名称，与配置文件中的写法一致
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 持续监控配置中的URL
    Start {
        /// 检测间隔（秒）
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            help = "检测间隔（秒）",
            env = "UPTIME_VITALS_INTERVAL"
        )]
        interval: Option<u64>,

        /// 有URL失败时的快速检测间隔（秒）
        #[arg(long, value_name = "SECONDS", help = "快速检测间隔（秒）")]
        quick_interval: Option<u64>,

        /// 最大并发检测数
        #[arg(
            long,
            value_name = "COUNT",
            help = "最大并发检测数",
            env = "UPTIME_VITALS_MAX_CONCURRENT"
        )]
        max_concurrent: Option<usize>,

        /// 监控时长（小时），不指定则一直运行
        #[arg(long, value_name = "HOURS", help = "监控时长（小时）")]
        duration_hours: Option<f64>,
    },

    /// 执行一次性健康检测
    Check {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 根据保存的JSON快照生成报告
    Report {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: ReportFormat,

        /// 快照文件路径，不指定则使用配置中的路径
        #[arg(short, long, value_name = "FILE", help = "快照文件路径")]
        snapshot: Option<PathBuf>,

        /// 报告输出文件，不指定则打印到标准输出
        #[arg(short, long, value_name = "FILE", help = "报告输出文件")]
        output: Option<PathBuf>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "config.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,

        /// 配置模板类型
        #[arg(
            short,
            long,
            value_enum,
            default_value = "minimal",
            help = "配置模板类型"
        )]
        template: ConfigTemplate,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,
    },

    /// 发送一条测试通知
    TestNotification {
        /// 测试消息内容
        #[arg(short, long, default_value = "这是一条测试消息", help = "测试消息内容")]
        message: String,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 报告格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ReportFormat {
    /// 文本表格
    Text,
    /// JSON快照
    Json,
    /// HTML页面
    Html,
}

/// 配置模板类型
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ConfigTemplate {
    /// 最小模板
    Minimal,
    /// 完整模板
    Full,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, Some(LogLevel::Debug))
    }

    /// 命令行指定的日志级别，`--verbose` 视为 debug
    pub fn level_override(&self) -> Option<&'static str> {
        match self.log_level {
            Some(level) => Some(level.as_str()),
            None if self.verbose => Some(LogLevel::Debug.as_str()),
            None => None,
        }
    }
}
