//! 监控快照
//!
//! 把调度器当前持有的历史、状态和统计整理成可序列化的报告对象

use crate::error::{ReportError, Result};
use crate::health::history::HistoryStore;
use crate::health::stats::MonitoringStats;
use crate::health::tracker::StateTracker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// URL当前状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrlStatus {
    /// 最近一次检测正常
    Up,
    /// 最近一次检测失败
    Down,
    /// 尚未检测
    Unknown,
}

impl std::fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlStatus::Up => write!(f, "UP"),
            UrlStatus::Down => write!(f, "DOWN"),
            UrlStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// 单个URL的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlSnapshot {
    /// 当前状态
    pub status: UrlStatus,
    /// 最近一次状态码
    pub status_code: Option<u16>,
    /// 最近一次响应时间（秒）
    pub response_time: Option<f64>,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 最近一次检测时间
    pub last_check_time: Option<DateTime<Utc>>,
}

/// 监控快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 快照时间
    pub timestamp: DateTime<Utc>,
    /// 监控已运行时长（秒）
    pub duration_seconds: f64,
    /// 总检测次数
    pub total_checks: u64,
    /// 总失败次数
    pub total_failures: u64,
    /// 失败率（百分比，保留两位小数）
    pub failure_rate: f64,
    /// 监控的URL数量，与 `per_url` 的条目数一致
    pub monitored_urls: usize,
    /// 每个URL的状态，按URL排序
    pub per_url: BTreeMap<String, UrlSnapshot>,
}

impl Snapshot {
    /// 从调度器持有的组件生成快照
    ///
    /// # 参数
    /// * `urls` - 监控的URL列表
    /// * `history` - 检测历史
    /// * `tracker` - 状态跟踪器
    /// * `stats` - 监控统计
    /// * `now` - 快照时间
    pub fn capture(
        urls: &[String],
        history: &HistoryStore,
        tracker: &StateTracker,
        stats: &MonitoringStats,
        now: DateTime<Utc>,
    ) -> Self {
        let per_url = urls
            .iter()
            .map(|url| {
                let latest = history.latest(url);
                let snapshot = UrlSnapshot {
                    status: match latest {
                        Some(result) if result.healthy => UrlStatus::Up,
                        Some(_) => UrlStatus::Down,
                        None => UrlStatus::Unknown,
                    },
                    status_code: latest.map(|r| r.status_code),
                    response_time: latest.map(|r| r.response_time_seconds),
                    consecutive_failures: tracker.consecutive_failures(url),
                    last_check_time: latest.map(|r| r.timestamp),
                };
                (url.clone(), snapshot)
            })
            .collect::<BTreeMap<_, _>>();

        Self {
            timestamp: now,
            duration_seconds: stats.elapsed_seconds(now),
            total_checks: stats.total_checks,
            total_failures: stats.total_failures,
            failure_rate: (stats.failure_rate() * 100.0).round() / 100.0,
            monitored_urls: per_url.len(),
            per_url,
        }
    }

    /// 指定状态的URL数量
    pub fn count(&self, status: UrlStatus) -> usize {
        self.per_url
            .values()
            .filter(|snapshot| snapshot.status == status)
            .count()
    }

    /// 序列化为带缩进的JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 从文件加载快照
pub async fn load_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Err(ReportError::SnapshotNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::CheckResult;
    use std::time::Duration;

    fn urls() -> Vec<String> {
        vec![
            "https://b.example.com".to_string(),
            "https://a.example.com".to_string(),
            "https://c.example.com".to_string(),
        ]
    }

    #[test]
    fn test_capture_statuses() {
        let mut history = HistoryStore::new(10);
        let mut tracker = StateTracker::new(2);
        let mut stats = MonitoringStats::default();

        let up = CheckResult::new("https://a.example.com", true)
            .with_status_code(200)
            .with_response_time(Duration::from_millis(250));
        let down = CheckResult::new("https://b.example.com", false).with_status_code(503);

        for result in [up, down] {
            tracker.update(&result);
            stats.record(&result);
            history.append(&result.url.clone(), result);
        }

        let snapshot = Snapshot::capture(&urls(), &history, &tracker, &stats, Utc::now());

        assert_eq!(snapshot.monitored_urls, 3);
        assert_eq!(snapshot.total_checks, 2);
        assert_eq!(snapshot.total_failures, 1);
        assert_eq!(snapshot.failure_rate, 50.0);

        let a = &snapshot.per_url["https://a.example.com"];
        assert_eq!(a.status, UrlStatus::Up);
        assert_eq!(a.status_code, Some(200));
        assert_eq!(a.response_time, Some(0.25));

        let b = &snapshot.per_url["https://b.example.com"];
        assert_eq!(b.status, UrlStatus::Down);
        assert_eq!(b.consecutive_failures, 1);

        let c = &snapshot.per_url["https://c.example.com"];
        assert_eq!(c.status, UrlStatus::Unknown);
        assert!(c.last_check_time.is_none());

        assert_eq!(snapshot.count(UrlStatus::Up), 1);
        assert_eq!(snapshot.count(UrlStatus::Down), 1);
        assert_eq!(snapshot.count(UrlStatus::Unknown), 1);
    }

    #[test]
    fn test_per_url_is_sorted() {
        let snapshot = Snapshot::capture(
            &urls(),
            &HistoryStore::default(),
            &StateTracker::default(),
            &MonitoringStats::default(),
            Utc::now(),
        );
        let keys: Vec<&String> = snapshot.per_url.keys().collect();
        assert_eq!(
            keys,
            vec![
                "https://a.example.com",
                "https://b.example.com",
                "https://c.example.com"
            ]
        );
    }

    #[test]
    fn test_snapshot_json_keys() {
        let snapshot = Snapshot::capture(
            &urls(),
            &HistoryStore::default(),
            &StateTracker::default(),
            &MonitoringStats::default(),
            Utc::now(),
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 7);
        for key in [
            "timestamp",
            "duration_seconds",
            "total_checks",
            "total_failures",
            "failure_rate",
            "monitored_urls",
            "per_url",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["monitored_urls"], 3);

        let entry = json["per_url"]["https://a.example.com"].as_object().unwrap();
        assert_eq!(entry.len(), 5);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&UrlStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(
            serde_json::to_string(&UrlStatus::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[tokio::test]
    async fn test_load_missing_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_snapshot(&dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
