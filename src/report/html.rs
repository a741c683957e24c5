//! HTML和控制台报告渲染

use crate::error::{ReportError, Result};
use crate::notification::template::format_duration;
use crate::report::exporter::{write_atomic, SnapshotExporter};
use crate::report::snapshot::{Snapshot, UrlStatus};
use askama::Template;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// 报告中的一行
struct ReportRow {
    url: String,
    status: String,
    status_class: &'static str,
    status_code: String,
    response_time: String,
    consecutive_failures: u32,
    last_check: String,
}

impl ReportRow {
    fn from_snapshot(snapshot: &Snapshot) -> Vec<Self> {
        snapshot
            .per_url
            .iter()
            .map(|(url, entry)| Self {
                url: url.clone(),
                status: entry.status.to_string(),
                status_class: match entry.status {
                    UrlStatus::Up => "status-up",
                    UrlStatus::Down => "status-down",
                    UrlStatus::Unknown => "status-unknown",
                },
                status_code: match entry.status_code {
                    Some(code) if code > 0 => code.to_string(),
                    _ => "N/A".to_string(),
                },
                response_time: entry
                    .response_time
                    .map(|secs| format!("{secs:.3}s"))
                    .unwrap_or_else(|| "N/A".to_string()),
                consecutive_failures: entry.consecutive_failures,
                last_check: entry
                    .last_check_time
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            })
            .collect()
    }
}

/// HTML报告模板
#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    title: String,
    generated_at: String,
    duration: String,
    monitored_urls: usize,
    total_checks: u64,
    total_failures: u64,
    up_count: usize,
    down_count: usize,
    failure_rate: String,
    rows: Vec<ReportRow>,
}

/// 渲染HTML报告
pub fn render_html_report(snapshot: &Snapshot) -> Result<String> {
    let template = ReportTemplate {
        title: format!("{} 健康检测报告", crate::APP_NAME),
        generated_at: snapshot
            .timestamp
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        duration: format_duration(
            Duration::try_from_secs_f64(snapshot.duration_seconds.max(0.0))
                .unwrap_or(Duration::MAX),
        ),
        monitored_urls: snapshot.monitored_urls,
        total_checks: snapshot.total_checks,
        total_failures: snapshot.total_failures,
        up_count: snapshot.count(UrlStatus::Up),
        down_count: snapshot.count(UrlStatus::Down),
        failure_rate: format!("{:.2}%", snapshot.failure_rate),
        rows: ReportRow::from_snapshot(snapshot),
    };

    template
        .render()
        .map_err(|e| ReportError::RenderError(e.to_string()).into())
}

/// 渲染控制台文本报告
pub fn render_console_report(snapshot: &Snapshot) -> String {
    let rows = ReportRow::from_snapshot(snapshot);
    let url_width = rows
        .iter()
        .map(|row| row.url.chars().count())
        .max()
        .unwrap_or(0)
        .max(3);

    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(url_width + 58));
    let _ = writeln!(
        out,
        "健康检测报告 - {}",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{}", "=".repeat(url_width + 58));
    let _ = writeln!(
        out,
        "{:<url_width$}  {:<8} {:<6} {:>10} {:>6}  {}",
        "URL", "STATUS", "CODE", "TIME", "FAILS", "LAST CHECK"
    );
    let _ = writeln!(out, "{}", "-".repeat(url_width + 58));

    for row in &rows {
        let _ = writeln!(
            out,
            "{:<url_width$}  {:<8} {:<6} {:>10} {:>6}  {}",
            row.url,
            row.status,
            row.status_code,
            row.response_time,
            row.consecutive_failures,
            row.last_check
        );
    }

    let _ = writeln!(out, "{}", "-".repeat(url_width + 58));
    let _ = writeln!(
        out,
        "正常: {}  故障: {}  未知: {}  总检测: {}  总失败: {}  失败率: {:.2}%",
        snapshot.count(UrlStatus::Up),
        snapshot.count(UrlStatus::Down),
        snapshot.count(UrlStatus::Unknown),
        snapshot.total_checks,
        snapshot.total_failures,
        snapshot.failure_rate
    );

    out
}

/// HTML报告导出器
#[derive(Debug, Clone)]
pub struct HtmlReportExporter {
    path: PathBuf,
}

impl HtmlReportExporter {
    /// 创建导出到指定路径的HTML导出器
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotExporter for HtmlReportExporter {
    fn name(&self) -> &str {
        "html"
    }

    async fn export(&self, snapshot: &Snapshot) -> Result<()> {
        let html = render_html_report(snapshot)?;
        write_atomic(&self.path, html.as_bytes()).await?;
        debug!("HTML报告已写入: {}", self.path.display());
        Ok(())
    }
}
