//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, ConfigTemplate, OutputFormat, ReportFormat};
use crate::config::{ConfigLoader, TomlConfigLoader};
use crate::core::{MonitorLauncher, StartOverrides};
use crate::error::Result;
use crate::notification::sender::{MessageType, NotificationMessage, NotificationSink};
use crate::notification::{AlertFormatter, WebhookSink};
use crate::report::exporter::write_atomic;
use crate::report::{load_snapshot, render_console_report, render_html_report, UrlStatus};
use anyhow::anyhow;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

/// 示例URL列表
const SAMPLE_URLS: &str = include_str!("../../templates/urls.txt");

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init {
            config_path,
            force,
            template,
        } = &args.command
        {
            self.create_config_file(config_path, *force, *template).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件和示例URL列表
    async fn create_config_file(
        &self,
        config_path: &Path,
        force: bool,
        template: ConfigTemplate,
    ) -> Result<()> {
        // 检查文件是否已存在
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        // 创建目录（如果不存在）
        let parent = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent).await?;

        tokio::fs::write(config_path, Self::template_content(template)).await?;
        println!("配置文件已创建: {}", config_path.display());

        let urls_path = parent.join("urls.txt");
        if urls_path.exists() && !force {
            println!("URL列表文件已存在，保持不变: {}", urls_path.display());
        } else {
            tokio::fs::write(&urls_path, SAMPLE_URLS).await?;
            println!("URL列表文件已创建: {}", urls_path.display());
        }

        println!("请编辑配置文件和URL列表以添加需要监控的地址");
        Ok(())
    }

    /// 获取配置模板内容
    fn template_content(template: ConfigTemplate) -> &'static str {
        match template {
            ConfigTemplate::Minimal => include_str!("../../templates/minimal_config.toml"),
            ConfigTemplate::Full => include_str!("../../templates/full_config.toml"),
        }
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { config_path } = &args.command {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, args.is_verbose())
                .await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;
        let base_dir = config_path.parent().filter(|p| !p.as_os_str().is_empty());
        let urls = config.resolve_urls(base_dir).await?;

        println!("✓ 配置文件验证通过");
        println!("✓ 找到 {} 个监控URL", urls.len());
        if urls.is_empty() {
            println!("⚠ 没有可监控的URL，start 和 check 命令将无法运行");
        }

        if verbose {
            let monitor = &config.monitor;
            println!("监控配置:");
            println!("  检测间隔: {}秒", monitor.check_interval_seconds);
            println!("  快速检测间隔: {}秒", monitor.quick_check_interval_seconds);
            println!("  请求超时: {}秒", monitor.request_timeout_seconds);
            println!("  失败阈值: {}", monitor.failure_threshold);
            println!("  最大并发: {}", monitor.max_concurrent_checks);
            println!("  健康状态码: {:?}", monitor.healthy_status_codes);
            println!("日志级别: {}", config.logging.level);
            println!("快照文件: {}", config.report.json_path().display());
            println!(
                "webhook通知: {}",
                if config.notification.enabled {
                    "启用"
                } else {
                    "禁用"
                }
            );

            println!("监控URL:");
            for (i, url) in urls.iter().enumerate() {
                println!("  {}. {}", i + 1, url);
            }
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { format } = &args.command {
            self.perform_health_check(args, *format).await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 执行一次检测，有URL故障时返回错误
    async fn perform_health_check(&self, args: &Args, format: OutputFormat) -> Result<()> {
        let launcher = MonitorLauncher::load(args.get_config_path()).await;
        launcher.report_origin();

        let report = launcher.check_once().await?;
        let snapshot = &report.snapshot;

        match format {
            OutputFormat::Json => println!("{}", snapshot.to_json_pretty()?),
            OutputFormat::Text => print!("{}", render_console_report(snapshot)),
        }

        let down = snapshot.count(UrlStatus::Down);
        if down > 0 {
            return Err(anyhow!("{} 个URL检测失败", down).into());
        }

        Ok(())
    }
}

/// 报告命令
pub struct ReportCommand;

#[async_trait]
impl Command for ReportCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Report {
            format,
            snapshot,
            output,
        } = &args.command
        {
            let snapshot_path = match snapshot {
                Some(path) => path.clone(),
                None => {
                    let launcher = MonitorLauncher::load(args.get_config_path()).await;
                    launcher.config().report.json_path()
                }
            };

            self.generate_report(&snapshot_path, *format, output.as_deref())
                .await
        } else {
            Ok(())
        }
    }
}

impl ReportCommand {
    /// 从快照生成报告
    async fn generate_report(
        &self,
        snapshot_path: &Path,
        format: ReportFormat,
        output: Option<&Path>,
    ) -> Result<()> {
        let snapshot = load_snapshot(snapshot_path).await?;

        let content = match format {
            ReportFormat::Text => render_console_report(&snapshot),
            ReportFormat::Json => snapshot.to_json_pretty()?,
            ReportFormat::Html => render_html_report(&snapshot)?,
        };

        match output {
            Some(path) => {
                write_atomic(path, content.as_bytes()).await?;
                println!("报告已写入: {}", path.display());
            }
            None => print!("{content}"),
        }

        Ok(())
    }
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Start {
            interval,
            quick_interval,
            max_concurrent,
            duration_hours,
        } = &args.command
        {
            let overrides = StartOverrides {
                check_interval: *interval,
                quick_check_interval: *quick_interval,
                max_concurrent: *max_concurrent,
                duration_hours: *duration_hours,
            };

            let mut launcher = MonitorLauncher::load(args.get_config_path()).await;
            let logging = launcher.init_logging(args.level_override())?;
            launcher.apply_overrides(&overrides)?;

            info!(
                "{} v{} 启动，日志级别: {}",
                crate::APP_NAME,
                crate::VERSION,
                logging.level()
            );
            let summary = launcher.run(overrides.run_for()).await?;
            println!("{summary}");
        }
        Ok(())
    }
}

/// 测试通知命令
pub struct TestNotificationCommand;

#[async_trait]
impl Command for TestNotificationCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::TestNotification { message } = &args.command {
            self.test_webhook(args, message).await
        } else {
            Ok(())
        }
    }
}

impl TestNotificationCommand {
    /// 通过配置的webhook发送测试消息
    async fn test_webhook(&self, args: &Args, message: &str) -> Result<()> {
        let launcher = MonitorLauncher::load(args.get_config_path()).await;
        launcher.report_origin();
        let notification = &launcher.config().notification;

        if notification.webhook_url.is_none() {
            println!("❌ 未配置webhook地址");
            println!("请在配置文件中设置 notification.webhook_url");
            return Ok(());
        }
        if !notification.enabled {
            println!("⚠ notification.enabled 为 false，监控时不会发送webhook通知");
        }

        let formatter = Arc::new(AlertFormatter::with_templates(
            notification.alert_template.as_deref(),
            notification.recovery_template.as_deref(),
        )?);
        let sink = WebhookSink::from_config(notification, formatter)?;

        let test_message = NotificationMessage {
            title: format!("🧪 {} 通知测试", crate::APP_NAME),
            content: format!(
                "**测试时间**: {}\n**测试消息**: {}\n\n这是一条测试通知，用于验证webhook通知是否正常工作。",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                message
            ),
            url: "https://example.com".to_string(),
            message_type: MessageType::Info,
        };

        println!("📤 发送测试消息...");
        sink.send_message(&test_message).await?;
        println!("✅ 测试消息发送成功！");

        Ok(())
    }
}
