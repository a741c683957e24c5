//! 应用程序核心逻辑
//!
//! 包含主函数、命令执行和应用程序生命周期管理

use crate::cli::args::{Args, Commands};
use crate::cli::commands::{
    CheckCommand, Command, InitCommand, ReportCommand, StartCommand, TestNotificationCommand,
    ValidateCommand, VersionCommand,
};
use crate::logging::{LogConfig, LoggingSystem};
use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::str::FromStr;
use tracing::error;

/// 应用程序主函数
pub async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // start 命令按配置文件初始化日志（含日志文件），其余命令只输出到控制台
    if !matches!(args.command, Commands::Start { .. }) {
        let level = args
            .level_override()
            .and_then(|level| LevelFilter::from_str(level).ok())
            .unwrap_or(LevelFilter::Warn);
        let log_config = LogConfig {
            level,
            console: true,
            ..Default::default()
        };
        LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;
    }

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        if LoggingSystem::is_initialized() {
            error!("命令执行失败: {:#}", e);
        } else {
            eprintln!("命令执行失败: {e:#}");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
pub async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Start { .. } => Box::new(StartCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Report { .. } => Box::new(ReportCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::TestNotification { .. } => Box::new(TestNotificationCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(anyhow::Error::from)
}
