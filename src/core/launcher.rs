//! 监控启动器
//!
//! 负责加载配置、初始化日志、组装探测器/通知渠道/导出器，并驱动调度器运行

use crate::config::{validate_config, Config, ConfigLoadOutcome, ConfigOrigin, TomlConfigLoader};
use crate::health::{
    CycleReport, HttpProber, MonitoringSummary, ProbeSettings, Scheduler, SchedulerSettings,
};
use crate::logging::{LogConfig, LoggingSystem};
use crate::notification::{build_sink, NoOpSink, NotificationSink};
use crate::report::{HtmlReportExporter, JsonFileExporter};
use crate::signal::setup_signal_handlers;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 命令行对监控参数的覆盖
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOverrides {
    /// 检测间隔（秒）
    pub check_interval: Option<u64>,
    /// 快速检测间隔（秒）
    pub quick_check_interval: Option<u64>,
    /// 最大并发检测数
    pub max_concurrent: Option<usize>,
    /// 监控时长（小时）
    pub duration_hours: Option<f64>,
}

impl StartOverrides {
    /// 把覆盖项写入配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(interval) = self.check_interval {
            config.monitor.check_interval_seconds = interval;
        }
        if let Some(quick) = self.quick_check_interval {
            config.monitor.quick_check_interval_seconds = quick;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.monitor.max_concurrent_checks = max_concurrent;
        }
    }

    /// 监控时长
    ///
    /// 负数、非有限值或超出 `Duration` 范围的值视为不限时，0 表示只执行一个周期
    pub fn run_for(&self) -> Option<Duration> {
        self.duration_hours
            .filter(|hours| hours.is_finite() && *hours >= 0.0)
            .and_then(|hours| Duration::try_from_secs_f64(hours * 3600.0).ok())
    }
}

/// 监控启动器
pub struct MonitorLauncher {
    /// 配置文件路径
    config_path: PathBuf,
    /// 加载结果
    outcome: ConfigLoadOutcome,
}

impl MonitorLauncher {
    /// 加载配置，文件缺失或无效时回退到默认配置
    ///
    /// # 参数
    /// * `config_path` - 配置文件路径
    pub async fn load(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let outcome = TomlConfigLoader::new(true)
            .load_with_fallback(&config_path)
            .await;

        Self {
            config_path,
            outcome,
        }
    }

    /// 生效的配置
    pub fn config(&self) -> &Config {
        &self.outcome.config
    }

    /// 配置来源
    pub fn origin(&self) -> &ConfigOrigin {
        &self.outcome.origin
    }

    /// 配置文件路径
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 应用命令行覆盖，覆盖后的配置需要重新通过验证
    pub fn apply_overrides(&mut self, overrides: &StartOverrides) -> Result<()> {
        overrides.apply(&mut self.outcome.config);
        validate_config(&self.outcome.config)
            .map_err(|e| anyhow::anyhow!("命令行参数无效: {}", e))
    }

    /// 按配置初始化日志系统，并报告配置来源
    ///
    /// # 参数
    /// * `level_override` - 命令行指定的日志级别
    pub fn init_logging(&self, level_override: Option<&str>) -> Result<LoggingSystem> {
        let log_config = LogConfig::from_logging_config(&self.config().logging, level_override);
        let logging = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;
        self.report_origin();
        Ok(logging)
    }

    /// 记录配置来源
    pub fn report_origin(&self) {
        match self.origin() {
            ConfigOrigin::File(path) => info!("已加载配置文件: {}", path.display()),
            ConfigOrigin::Missing(path) => {
                info!("配置文件 {} 不存在，使用默认配置", path.display())
            }
            ConfigOrigin::Invalid { path, reason } => {
                warn!("配置文件 {} 无效，使用默认配置: {}", path.display(), reason)
            }
        }
    }

    /// 解析要监控的URL，URL文件的相对路径以配置文件所在目录为基准
    pub async fn resolve_urls(&self) -> Result<Vec<String>> {
        let base_dir = self
            .config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        self.config()
            .resolve_urls(base_dir)
            .await
            .context("读取URL列表失败")
    }

    /// 组装调度器
    ///
    /// # 参数
    /// * `sink` - 通知渠道
    /// * `run_for` - 监控时长
    /// * `with_exporters` - 是否导出快照文件
    async fn build_scheduler(
        &self,
        sink: Arc<dyn NotificationSink>,
        run_for: Option<Duration>,
        with_exporters: bool,
    ) -> Result<Scheduler> {
        let config = self.config();
        let urls = self.resolve_urls().await?;

        let prober = HttpProber::new(&ProbeSettings::from(&config.monitor))
            .context("创建HTTP探测器失败")?;

        let settings = SchedulerSettings {
            run_for,
            ..SchedulerSettings::from(&config.monitor)
        };

        let mut scheduler = Scheduler::new(urls, Arc::new(prober), sink, settings)?;

        if with_exporters {
            scheduler = scheduler.with_exporter(Box::new(JsonFileExporter::new(
                config.report.json_path(),
            )));
            if let Some(html_path) = config.report.html_path() {
                scheduler = scheduler.with_exporter(Box::new(HtmlReportExporter::new(html_path)));
            }
        }

        Ok(scheduler)
    }

    /// 持续监控直到收到停止信号或达到监控时长
    ///
    /// # 参数
    /// * `run_for` - 监控时长，为空时一直运行
    ///
    /// # 返回
    /// * `Result<MonitoringSummary>` - 监控汇总
    pub async fn run(&self, run_for: Option<Duration>) -> Result<MonitoringSummary> {
        let sink = build_sink(&self.config().notification).context("创建通知渠道失败")?;
        let mut scheduler = self.build_scheduler(sink, run_for, true).await?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        setup_signal_handlers(shutdown_tx)
            .await
            .context("设置信号处理器失败")?;

        if let Some(run_for) = run_for {
            info!("本次监控时长: {:.2}小时", run_for.as_secs_f64() / 3600.0);
        }

        Ok(scheduler.run(shutdown_rx).await)
    }

    /// 执行单次检测周期，不导出快照也不发送通知
    pub async fn check_once(&self) -> Result<CycleReport> {
        let mut scheduler = self
            .build_scheduler(Arc::new(NoOpSink), None, false)
            .await?;
        Ok(scheduler.run_cycle().await)
    }
}
