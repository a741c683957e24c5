//! 检测周期调度器
//!
//! 驱动检测周期：并发探测所有URL，依次写入历史和状态跟踪器，导出快照，投递告警，
//! 然后根据整体状态决定下一次检测的等待时间，直到收到停止信号或达到监控时长

use crate::config::MonitorConfig;
use crate::error::{Result, UptimeVitalsError};
use crate::health::history::{HistoryStore, DEFAULT_HISTORY_CAPACITY};
use crate::health::prober::Prober;
use crate::health::result::{CheckResult, ErrorClass};
use crate::health::stats::MonitoringStats;
use crate::health::tracker::{
    AlertEvent, AlertKind, StateTracker, UrlHealth, DEFAULT_FAILURE_THRESHOLD,
};
use crate::notification::NotificationSink;
use crate::report::{Snapshot, SnapshotExporter, UrlStatus};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// 探测超时之外额外等待探测任务返回的时间
pub const PROBE_TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// 调度参数
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// 正常检测间隔
    pub check_interval: Duration,
    /// 有URL失败时的快速检测间隔
    pub quick_check_interval: Duration,
    /// 最大并发探测数
    pub max_concurrent: usize,
    /// 监控时长，为空时一直运行
    pub run_for: Option<Duration>,
    /// 连续失败告警阈值
    pub failure_threshold: u32,
    /// 每个URL的历史记录容量
    pub history_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(300),
            quick_check_interval: Duration::from_secs(60),
            max_concurrent: 10,
            run_for: None,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl From<&MonitorConfig> for SchedulerSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.check_interval_seconds),
            quick_check_interval: Duration::from_secs(config.quick_check_interval_seconds),
            max_concurrent: config.max_concurrent_checks,
            run_for: None,
            failure_threshold: config.failure_threshold,
            history_capacity: config.history_capacity,
        }
    }
}

/// 通知统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationStats {
    /// 总通知发送次数
    pub total_sent: u64,
    /// 通知发送成功次数
    pub successful_sent: u64,
    /// 通知发送失败次数
    pub failed_sent: u64,
    /// 最后通知时间
    pub last_notification_time: Option<DateTime<Utc>>,
}

/// 单个检测周期的结果
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 周期序号，从1开始
    pub cycle: u64,
    /// 本周期结束时的快照
    pub snapshot: Snapshot,
    /// 本周期产生的告警事件
    pub events: Vec<AlertEvent>,
    /// 下一次检测前的等待时间
    pub next_interval: Duration,
}

/// 监控结束时的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringSummary {
    /// 运行时长
    pub duration: Duration,
    /// 已完成的检测周期数
    pub cycles: u64,
    /// 总检测次数
    pub total_checks: u64,
    /// 总失败次数
    pub total_failures: u64,
    /// 失败率（百分比）
    pub failure_rate: f64,
    /// 平均响应时间（秒）
    pub average_response_time_seconds: f64,
    /// 最大响应时间（秒）
    pub max_response_time_seconds: f64,
    /// 监控的URL数量
    pub monitored_urls: usize,
    /// 当前正常的URL数量
    pub healthy_urls: usize,
    /// 当前故障的URL数量
    pub down_urls: usize,
    /// 通知统计
    pub notification_stats: NotificationStats,
}

impl fmt::Display for MonitoringSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "监控结束: 运行 {:.0}秒, {} 个周期, 检测 {} 次, 失败 {} 次 ({:.2}%), 响应时间 平均 {:.3}s/最大 {:.3}s, URL {} 个 (正常 {}, 故障 {}), 通知 {}/{} 成功",
            self.duration.as_secs_f64(),
            self.cycles,
            self.total_checks,
            self.total_failures,
            self.failure_rate,
            self.average_response_time_seconds,
            self.max_response_time_seconds,
            self.monitored_urls,
            self.healthy_urls,
            self.down_urls,
            self.notification_stats.successful_sent,
            self.notification_stats.total_sent
        )
    }
}

/// 检测周期调度器
///
/// 独占持有历史存储和状态跟踪器，所有状态更新都在 `&mut self` 下串行完成
pub struct Scheduler {
    /// 监控的URL列表
    urls: Vec<String>,
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 通知渠道
    sink: Arc<dyn NotificationSink>,
    /// 快照导出器
    exporters: Vec<Box<dyn SnapshotExporter>>,
    /// 调度参数
    settings: SchedulerSettings,
    /// 检测历史
    history: HistoryStore,
    /// 状态跟踪器
    tracker: StateTracker,
    /// 监控统计
    stats: MonitoringStats,
    /// 通知统计
    notification_stats: NotificationStats,
    /// 已完成的周期数
    cycles: u64,
}

impl Scheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `urls` - 监控的URL列表，不能为空，重复的URL只保留第一次出现
    /// * `prober` - 探测器
    /// * `sink` - 通知渠道
    /// * `settings` - 调度参数
    ///
    /// # 返回
    /// * `Result<Self>` - URL列表为空时返回 `NoUrls`
    pub fn new(
        urls: Vec<String>,
        prober: Arc<dyn Prober>,
        sink: Arc<dyn NotificationSink>,
        settings: SchedulerSettings,
    ) -> Result<Self> {
        if urls.is_empty() {
            return Err(UptimeVitalsError::NoUrls);
        }

        let total = urls.len();
        let mut seen = HashSet::with_capacity(total);
        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        if urls.len() < total {
            warn!("忽略 {} 个重复的URL", total - urls.len());
        }

        Ok(Self {
            urls,
            prober,
            sink,
            exporters: Vec::new(),
            history: HistoryStore::new(settings.history_capacity),
            tracker: StateTracker::new(settings.failure_threshold),
            stats: MonitoringStats::default(),
            notification_stats: NotificationStats::default(),
            cycles: 0,
            settings,
        })
    }

    /// 添加快照导出器
    pub fn with_exporter(mut self, exporter: Box<dyn SnapshotExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// 监控的URL列表
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// 调度参数
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// 检测历史
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// 状态跟踪器
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// 监控统计
    pub fn stats(&self) -> &MonitoringStats {
        &self.stats
    }

    /// 通知统计
    pub fn notification_stats(&self) -> &NotificationStats {
        &self.notification_stats
    }

    /// 已完成的周期数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// 根据整体状态计算下一次检测间隔
    ///
    /// 只要有URL处于失败状态就使用快速间隔
    pub fn next_interval(&self) -> Duration {
        if self.tracker.any_failing() {
            self.settings.quick_check_interval
        } else {
            self.settings.check_interval
        }
    }

    /// 生成当前快照
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.urls,
            &self.history,
            &self.tracker,
            &self.stats,
            Utc::now(),
        )
    }

    /// 生成监控汇总
    pub fn summary(&self, duration: Duration) -> MonitoringSummary {
        // 尚未检测过的URL不计入正常
        let healthy_urls = self
            .urls
            .iter()
            .filter(|url| {
                self.history.latest(url).is_some()
                    && self.tracker.health(url) == UrlHealth::Healthy
            })
            .count();
        let down_urls = self
            .urls
            .iter()
            .filter(|url| self.tracker.health(url) == UrlHealth::Down)
            .count();

        MonitoringSummary {
            duration,
            cycles: self.cycles,
            total_checks: self.stats.total_checks,
            total_failures: self.stats.total_failures,
            failure_rate: self.stats.failure_rate(),
            average_response_time_seconds: self.stats.average_response_time_seconds,
            max_response_time_seconds: self.stats.max_response_time_seconds,
            monitored_urls: self.urls.len(),
            healthy_urls,
            down_urls,
            notification_stats: self.notification_stats.clone(),
        }
    }

    /// 执行一个检测周期
    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle = self.cycles + 1;
        let span = info_span!("check_cycle", cycle, urls = self.urls.len());
        self.execute_cycle(cycle).instrument(span).await
    }

    async fn execute_cycle(&mut self, cycle: u64) -> CycleReport {
        debug!("开始检测周期 #{}", cycle);
        let results = self.probe_all().await;

        let mut events = Vec::new();
        for result in results {
            if result.healthy {
                debug!(
                    "检测正常: {} - {} ({:.3}s)",
                    result.url, result.status_code, result.response_time_seconds
                );
            } else {
                warn!(
                    "检测失败: {} - {} ({})",
                    result.url, result.message, result.error_class
                );
            }

            self.stats.record(&result);
            self.history.append(&result.url, result.clone());
            if let Some(event) = self.tracker.update(&result) {
                events.push(event);
            }
        }
        self.cycles = cycle;

        let snapshot = self.snapshot();
        self.export(&snapshot).await;
        self.dispatch(&events).await;

        let next_interval = self.next_interval();
        info!(
            "检测周期 #{} 完成: 正常 {}, 故障 {}, 告警事件 {}",
            cycle,
            snapshot.count(UrlStatus::Up),
            snapshot.count(UrlStatus::Down),
            events.len()
        );

        CycleReport {
            cycle,
            snapshot,
            events,
            next_interval,
        }
    }

    /// 并发探测所有URL，结果按URL配置顺序返回
    ///
    /// 超过探测超时仍未返回的任务会被放弃，记为超时
    async fn probe_all(&self) -> Vec<CheckResult> {
        let max_concurrent = self.settings.max_concurrent.max(1);
        let probe_timeout = self.prober.timeout();
        let limit = probe_timeout.saturating_add(PROBE_TIMEOUT_GRACE);

        stream::iter(self.urls.iter().cloned())
            .map(|url| {
                let prober = Arc::clone(&self.prober);
                async move {
                    let task_url = url.clone();
                    let mut handle = tokio::spawn(async move { prober.probe(&task_url).await });
                    match timeout(limit, &mut handle).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(e)) => {
                            error!("探测任务异常退出: {} - {}", url, e);
                            CheckResult::unexpected(url, e)
                        }
                        Err(_) => {
                            handle.abort();
                            warn!("探测任务超时未返回，已放弃: {}", url);
                            CheckResult::new(url, false)
                                .with_response_time(probe_timeout)
                                .with_error(ErrorClass::Timeout, "Request timeout")
                        }
                    }
                }
            })
            .buffered(max_concurrent)
            .collect()
            .await
    }

    /// 导出快照，失败只记录日志
    async fn export(&self, snapshot: &Snapshot) {
        for exporter in &self.exporters {
            if let Err(e) = exporter.export(snapshot).await {
                error!("快照导出失败 ({}): {}", exporter.name(), e);
            }
        }
    }

    /// 投递告警事件，失败只记录日志并计数
    async fn dispatch(&mut self, events: &[AlertEvent]) {
        for event in events {
            match event.kind {
                AlertKind::Down => warn!(
                    "URL故障告警: {} (连续失败 {} 次)",
                    event.url,
                    event.consecutive_failures.unwrap_or_default()
                ),
                AlertKind::Recovered => info!(
                    "URL已恢复: {} (故障 {:.0}秒)",
                    event.url,
                    event.downtime_duration.unwrap_or_default().as_secs_f64()
                ),
            }

            self.notification_stats.total_sent += 1;
            self.notification_stats.last_notification_time = Some(Utc::now());
            match self.sink.notify(event).await {
                Ok(()) => self.notification_stats.successful_sent += 1,
                Err(e) => {
                    self.notification_stats.failed_sent += 1;
                    error!("通知投递失败 ({}): {} - {:#}", self.sink.name(), event.url, e);
                }
            }
        }
    }

    /// 持续运行检测周期
    ///
    /// 进行中的周期总会完成；周期之间的等待可被停止信号打断。
    /// 停止信号的发送端全部关闭时不视为停止，继续按间隔运行。
    ///
    /// # 参数
    /// * `shutdown` - 停止信号接收器
    ///
    /// # 返回
    /// * `MonitoringSummary` - 监控汇总
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> MonitoringSummary {
        let started = Instant::now();
        // 时长超出时钟可表示的范围时按不限时处理
        let deadline = self
            .settings
            .run_for
            .and_then(|run_for| started.checked_add(run_for));
        let expired = |deadline: Option<Instant>| deadline.is_some_and(|d| Instant::now() >= d);
        let mut shutdown_open = true;

        info!(
            "开始监控 {} 个URL，检测间隔 {}秒，快速检测间隔 {}秒",
            self.urls.len(),
            self.settings.check_interval.as_secs(),
            self.settings.quick_check_interval.as_secs()
        );

        loop {
            let report = self.run_cycle().await;

            if expired(deadline) {
                info!("已达到监控时长，停止监控");
                break;
            }

            let mut wait = report.next_interval;
            if let Some(deadline) = deadline {
                wait = wait.min(deadline.saturating_duration_since(Instant::now()));
            }
            debug!("下一次检测将在 {}秒后进行", wait.as_secs());

            let pause = sleep(wait);
            tokio::pin!(pause);

            if shutdown_open {
                tokio::select! {
                    _ = &mut pause => {}
                    received = shutdown.recv() => match received {
                        Ok(()) | Err(RecvError::Lagged(_)) => {
                            info!("收到停止信号，停止监控");
                            break;
                        }
                        Err(RecvError::Closed) => {
                            debug!("停止信号通道已关闭，继续按间隔运行");
                            shutdown_open = false;
                            (&mut pause).await;
                        }
                    },
                }
            } else {
                pause.await;
            }

            if expired(deadline) {
                info!("已达到监控时长，停止监控");
                break;
            }
        }

        let summary = self.summary(started.elapsed());
        info!("{}", summary);
        summary
    }
}
