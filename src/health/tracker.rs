//! URL状态跟踪器
//!
//! 维护每个URL的连续失败次数、故障开始时间和告警状态，并在状态转换时产生告警事件。
//!
//! 状态划分：
//! - `Healthy`：连续失败次数为0
//! - `Degraded`：连续失败次数大于0但小于阈值
//! - `Down`：连续失败次数达到阈值
//!
//! 每次故障最多产生一条 `Down` 告警和一条对应的 `Recovered` 通知。
//! 跟踪器不做任何IO，"当前时间"取自检测结果的时间戳。

use crate::health::result::CheckResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// 默认连续失败告警阈值
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 2;

/// URL健康等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlHealth {
    /// 正常
    Healthy,
    /// 降级（有失败但未达阈值）
    Degraded,
    /// 故障
    Down,
}

impl std::fmt::Display for UrlHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlHealth::Healthy => write!(f, "正常"),
            UrlHealth::Degraded => write!(f, "降级"),
            UrlHealth::Down => write!(f, "故障"),
        }
    }
}

/// 告警事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// 服务故障
    Down,
    /// 服务恢复
    Recovered,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Down => write!(f, "故障"),
            AlertKind::Recovered => write!(f, "恢复"),
        }
    }
}

/// 告警事件，产生后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// 事件ID
    pub id: Uuid,
    /// 相关URL
    pub url: String,
    /// 事件类型
    pub kind: AlertKind,
    /// 最近一次HTTP状态码（故障告警）
    pub status_code: Option<u16>,
    /// 错误描述（故障告警）
    pub message: Option<String>,
    /// 连续失败次数（故障告警）
    pub consecutive_failures: Option<u32>,
    /// 故障持续时间（恢复通知）
    #[serde(with = "optional_duration_secs", default)]
    pub downtime_duration: Option<Duration>,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// 创建故障告警
    pub fn down(result: &CheckResult, consecutive_failures: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: result.url.clone(),
            kind: AlertKind::Down,
            status_code: Some(result.status_code),
            message: Some(result.message.clone()),
            consecutive_failures: Some(consecutive_failures),
            downtime_duration: None,
            timestamp: result.timestamp,
        }
    }

    /// 创建恢复通知
    pub fn recovered(result: &CheckResult, downtime_duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: result.url.clone(),
            kind: AlertKind::Recovered,
            status_code: Some(result.status_code),
            message: None,
            consecutive_failures: None,
            downtime_duration: Some(downtime_duration),
            timestamp: result.timestamp,
        }
    }
}

/// 单个URL的跟踪状态
///
/// 不变式：
/// - `downtime_start` 有值当且仅当 `consecutive_failures >= 1`
/// - `alert_emitted` 仅在 `consecutive_failures >= threshold` 时为真，失败计数归零时复位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlState {
    /// 连续失败次数
    consecutive_failures: u32,
    /// 本次故障的开始时间
    downtime_start: Option<DateTime<Utc>>,
    /// 本次故障是否已发送告警
    alert_emitted: bool,
}

impl UrlState {
    /// 连续失败次数
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// 本次故障的开始时间
    pub fn downtime_start(&self) -> Option<DateTime<Utc>> {
        self.downtime_start
    }

    /// 本次故障是否已发送告警
    pub fn alert_emitted_for_current_incident(&self) -> bool {
        self.alert_emitted
    }

    /// 按阈值计算健康等级
    pub fn health(&self, threshold: u32) -> UrlHealth {
        match self.consecutive_failures {
            0 => UrlHealth::Healthy,
            n if n < threshold => UrlHealth::Degraded,
            _ => UrlHealth::Down,
        }
    }

    /// 应用一次检测结果，返回需要发送的告警事件
    pub fn apply(&mut self, result: &CheckResult, threshold: u32) -> Option<AlertEvent> {
        let threshold = threshold.max(1);
        let now = result.timestamp;

        if result.healthy {
            let event = if self.consecutive_failures >= threshold {
                let started = self.downtime_start.unwrap_or(now);
                let downtime = (now - started).to_std().unwrap_or(Duration::ZERO);
                Some(AlertEvent::recovered(result, downtime))
            } else {
                None
            };

            self.consecutive_failures = 0;
            self.downtime_start = None;
            self.alert_emitted = false;
            return event;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures == 1 {
            self.downtime_start = Some(now);
        }

        // 只在恰好达到阈值时告警，之后的失败不再重复告警
        if self.consecutive_failures == threshold && !self.alert_emitted {
            self.alert_emitted = true;
            return Some(AlertEvent::down(result, self.consecutive_failures));
        }

        None
    }
}

/// 状态跟踪器，持有所有URL的跟踪状态
#[derive(Debug, Clone)]
pub struct StateTracker {
    /// 连续失败告警阈值
    threshold: u32,
    /// URL到状态的映射
    states: HashMap<String, UrlState>,
}

impl StateTracker {
    /// 创建新的状态跟踪器，阈值至少为1
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            states: HashMap::new(),
        }
    }

    /// 用检测结果更新对应URL的状态
    ///
    /// # 参数
    /// * `result` - 检测结果
    ///
    /// # 返回
    /// * `Option<AlertEvent>` - 需要发送的告警或恢复事件
    pub fn update(&mut self, result: &CheckResult) -> Option<AlertEvent> {
        let threshold = self.threshold;
        self.states
            .entry(result.url.clone())
            .or_default()
            .apply(result, threshold)
    }

    /// 获取URL的跟踪状态
    pub fn state(&self, url: &str) -> Option<&UrlState> {
        self.states.get(url)
    }

    /// 获取URL的连续失败次数，未检测过的URL为0
    pub fn consecutive_failures(&self, url: &str) -> u32 {
        self.states
            .get(url)
            .map_or(0, UrlState::consecutive_failures)
    }

    /// 获取URL的健康等级，未检测过的URL视为正常
    pub fn health(&self, url: &str) -> UrlHealth {
        self.states
            .get(url)
            .map_or(UrlHealth::Healthy, |state| state.health(self.threshold))
    }

    /// 是否有任意URL处于失败中
    pub fn any_failing(&self) -> bool {
        self.states
            .values()
            .any(|state| state.consecutive_failures > 0)
    }

    /// 告警阈值
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

/// Option<Duration> 按秒（浮点）序列化
mod optional_duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs.max(0.0)).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::ErrorClass;
    use chrono::TimeZone;

    const URL: &str = "https://example.com";

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn failure(seconds: i64) -> CheckResult {
        CheckResult::new(URL, false)
            .with_status_code(503)
            .with_message("HTTP 503 Service Unavailable")
            .with_timestamp(at(seconds))
    }

    fn success(seconds: i64) -> CheckResult {
        CheckResult::new(URL, true)
            .with_status_code(200)
            .with_timestamp(at(seconds))
    }

    fn assert_invariants(tracker: &StateTracker) {
        let state = tracker.state(URL).unwrap();
        assert_eq!(
            state.consecutive_failures() == 0,
            state.downtime_start().is_none()
        );
        if state.alert_emitted_for_current_incident() {
            assert!(state.consecutive_failures() >= tracker.threshold());
        }
    }

    #[test]
    fn test_initial_state_is_healthy() {
        let tracker = StateTracker::default();
        assert_eq!(tracker.threshold(), DEFAULT_FAILURE_THRESHOLD);
        assert_eq!(tracker.health(URL), UrlHealth::Healthy);
        assert_eq!(tracker.consecutive_failures(URL), 0);
        assert!(!tracker.any_failing());
    }

    #[test]
    fn test_down_then_recovered_scenario() {
        let mut tracker = StateTracker::new(2);
        let mut counts = Vec::new();
        let mut events = Vec::new();

        for result in [failure(0), failure(60), failure(120), success(180)] {
            if let Some(event) = tracker.update(&result) {
                events.push((counts.len(), event));
            }
            counts.push(tracker.consecutive_failures(URL));
            assert_invariants(&tracker);
        }

        assert_eq!(counts, vec![1, 2, 3, 0]);
        assert_eq!(events.len(), 2);

        let (index, down) = &events[0];
        assert_eq!(*index, 1);
        assert_eq!(down.kind, AlertKind::Down);
        assert_eq!(down.status_code, Some(503));
        assert_eq!(down.consecutive_failures, Some(2));
        assert_eq!(
            down.message.as_deref(),
            Some("HTTP 503 Service Unavailable")
        );

        let (index, recovered) = &events[1];
        assert_eq!(*index, 3);
        assert_eq!(recovered.kind, AlertKind::Recovered);
        assert_eq!(recovered.downtime_duration, Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_flapping_below_threshold_is_silent() {
        let mut tracker = StateTracker::new(2);

        assert!(tracker.update(&failure(0)).is_none());
        assert_eq!(tracker.consecutive_failures(URL), 1);
        assert_eq!(tracker.health(URL), UrlHealth::Degraded);

        assert!(tracker.update(&success(30)).is_none());
        assert_eq!(tracker.consecutive_failures(URL), 0);
        assert_invariants(&tracker);
    }

    #[test]
    fn test_exactly_one_down_alert_per_incident() {
        for extra in 0..5 {
            let mut tracker = StateTracker::new(3);
            let mut down_events = Vec::new();
            for i in 0..(3 + extra) {
                if let Some(event) = tracker.update(&failure(i as i64)) {
                    down_events.push((i, event));
                }
                assert_invariants(&tracker);
            }
            assert_eq!(down_events.len(), 1);
            assert_eq!(down_events[0].0, 2);
            assert_eq!(down_events[0].1.kind, AlertKind::Down);
            assert_eq!(tracker.health(URL), UrlHealth::Down);
        }
    }

    #[test]
    fn test_recovery_emitted_once() {
        let mut tracker = StateTracker::new(1);
        assert!(tracker.update(&failure(0)).is_some());
        let recovered = tracker.update(&success(10)).unwrap();
        assert_eq!(recovered.kind, AlertKind::Recovered);
        assert!(tracker.update(&success(20)).is_none());
        assert!(tracker.update(&success(30)).is_none());
    }

    #[test]
    fn test_new_incident_alerts_again() {
        let mut tracker = StateTracker::new(2);
        tracker.update(&failure(0));
        assert!(tracker.update(&failure(1)).is_some());
        assert!(tracker.update(&success(2)).is_some());

        tracker.update(&failure(3));
        let second = tracker.update(&failure(4)).unwrap();
        assert_eq!(second.kind, AlertKind::Down);
        assert_eq!(tracker.state(URL).unwrap().downtime_start(), Some(at(3)));
    }

    #[test]
    fn test_downtime_start_is_first_failure() {
        let mut tracker = StateTracker::new(5);
        tracker.update(&failure(10));
        tracker.update(&failure(20));
        assert_eq!(tracker.state(URL).unwrap().downtime_start(), Some(at(10)));
    }

    #[test]
    fn test_clock_skew_clamps_downtime_to_zero() {
        let mut state = UrlState::default();
        state.apply(&failure(100), 1);
        let event = state.apply(&success(50), 1).unwrap();
        assert_eq!(event.downtime_duration, Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut tracker = StateTracker::new(0);
        assert_eq!(tracker.threshold(), 1);
        let event = tracker.update(&failure(0)).unwrap();
        assert_eq!(event.kind, AlertKind::Down);
    }

    #[test]
    fn test_urls_tracked_independently() {
        let mut tracker = StateTracker::new(2);
        let other = CheckResult::new("https://other.example.com", false)
            .with_error(ErrorClass::Timeout, "Request timeout");

        tracker.update(&failure(0));
        tracker.update(&other);
        tracker.update(&success(1));

        assert_eq!(tracker.consecutive_failures(URL), 0);
        assert_eq!(tracker.consecutive_failures("https://other.example.com"), 1);
        assert!(tracker.any_failing());
    }

    #[test]
    fn test_alert_event_serialization() {
        let mut state = UrlState::default();
        state.apply(&failure(0), 1);
        let event = state.apply(&success(90), 1).unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "recovered");
        assert_eq!(json["downtime_duration"], 90.0);
    }

    #[test]
    fn test_alert_event_rejects_oversized_downtime() {
        let mut state = UrlState::default();
        state.apply(&failure(0), 1);
        let event = state.apply(&success(90), 1).unwrap();

        let mut json = serde_json::to_value(&event).unwrap();
        let parsed: AlertEvent = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed.downtime_duration, Some(Duration::from_secs(90)));

        json["downtime_duration"] = serde_json::json!(1e300);
        assert!(serde_json::from_value::<AlertEvent>(json).is_err());
    }
}
