//! 监控统计信息

use crate::health::result::CheckResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 进程级监控统计，仅在进程重启时归零
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStats {
    /// 总检测次数
    pub total_checks: u64,
    /// 总失败次数
    pub total_failures: u64,
    /// 监控开始时间
    pub start_time: DateTime<Utc>,
    /// 平均响应时间（秒）
    pub average_response_time_seconds: f64,
    /// 最大响应时间（秒）
    pub max_response_time_seconds: f64,
}

impl Default for MonitoringStats {
    fn default() -> Self {
        Self {
            total_checks: 0,
            total_failures: 0,
            start_time: Utc::now(),
            average_response_time_seconds: 0.0,
            max_response_time_seconds: 0.0,
        }
    }
}

impl MonitoringStats {
    /// 记录一次检测结果
    pub fn record(&mut self, result: &CheckResult) {
        self.total_checks += 1;
        if !result.healthy {
            self.total_failures += 1;
        }

        let response_time = result.response_time_seconds;
        if response_time > 0.0 {
            self.max_response_time_seconds = self.max_response_time_seconds.max(response_time);
        }
        let total_time = self.average_response_time_seconds * (self.total_checks - 1) as f64
            + response_time;
        self.average_response_time_seconds = total_time / self.total_checks as f64;
    }

    /// 失败率（百分比）
    pub fn failure_rate(&self) -> f64 {
        self.total_failures as f64 / self.total_checks.max(1) as f64 * 100.0
    }

    /// 自监控开始以来经过的秒数
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.start_time).num_milliseconds().max(0);
        elapsed as f64 / 1000.0
    }
}
