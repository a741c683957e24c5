//! HTTP探测器实现
//!
//! 对单个URL发起一次GET请求并对结果分类，所有失败都编码在 `CheckResult` 中，不向外抛出错误

use crate::config::MonitorConfig;
use crate::error::{ProbeError, Result};
use crate::health::result::{CheckResult, ErrorClass};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client, StatusCode};
use std::collections::{BTreeSet, HashMap};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// 默认的健康状态码集合
pub const DEFAULT_HEALTHY_STATUS_CODES: [u16; 9] = [200, 201, 202, 204, 301, 302, 304, 307, 308];

/// 最大重定向次数
const MAX_REDIRECTS: usize = 10;

/// 探测器trait，定义探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测单个URL
    ///
    /// # 参数
    /// * `url` - 要探测的URL
    ///
    /// # 返回
    /// * `CheckResult` - 探测结果，失败也通过结果表达
    async fn probe(&self, url: &str) -> CheckResult;

    /// 单次探测的超时时间
    fn timeout(&self) -> Duration;
}

/// 探测参数
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// 请求超时时间
    pub timeout: Duration,
    /// 视为健康的状态码
    pub healthy_status_codes: BTreeSet<u16>,
    /// 是否校验TLS证书
    pub verify_tls: bool,
    /// 附加请求头
    pub headers: HashMap<String, String>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            healthy_status_codes: DEFAULT_HEALTHY_STATUS_CODES.into_iter().collect(),
            verify_tls: true,
            headers: HashMap::new(),
        }
    }
}

impl From<&MonitorConfig> for ProbeSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_seconds),
            healthy_status_codes: config.healthy_status_codes.iter().copied().collect(),
            verify_tls: config.verify_tls,
            headers: config.headers.clone(),
        }
    }
}

/// 基于reqwest的HTTP探测器
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 超时时间
    timeout: Duration,
    /// 视为健康的状态码
    healthy_status_codes: BTreeSet<u16>,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `settings` - 探测参数
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(!settings.verify_tls)
            .default_headers(Self::build_headers(&settings.headers)?)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(ProbeError::ClientBuild)?;

        Ok(Self {
            client,
            timeout: settings.timeout,
            healthy_status_codes: settings.healthy_status_codes.clone(),
        })
    }

    /// 构建附加请求头
    fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ProbeError::InvalidHeader {
                    name: name.clone(),
                }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                ProbeError::InvalidHeader {
                    name: name.clone(),
                }
            })?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }

    /// 判断状态码是否健康
    fn is_healthy_status(&self, status_code: u16) -> bool {
        self.healthy_status_codes.contains(&status_code)
    }

    /// 根据响应状态码生成结果
    fn classify_response(&self, url: &str, status: StatusCode, elapsed: Duration) -> CheckResult {
        let status_code = status.as_u16();
        let result = CheckResult::new(url, self.is_healthy_status(status_code))
            .with_status_code(status_code)
            .with_response_time(elapsed);

        if result.healthy {
            result
        } else {
            result.with_message(format!(
                "HTTP {} {}",
                status_code,
                status.canonical_reason().unwrap_or("Unknown")
            ))
        }
    }

    /// 根据请求错误生成结果
    fn classify_error(&self, url: &str, error: &reqwest::Error) -> CheckResult {
        if error.is_timeout() {
            return self.timeout_result(url);
        }

        let (error_class, message) = if error.is_connect() {
            (
                ErrorClass::ConnectionError,
                format!("Connection error: {}", describe_request_error(error)),
            )
        } else {
            (
                ErrorClass::OtherRequestError,
                format!("Request error: {}", describe_request_error(error)),
            )
        };

        CheckResult::new(url, false).with_error(error_class, message)
    }

    /// 超时结果，响应时间记为超时时间
    fn timeout_result(&self, url: &str) -> CheckResult {
        CheckResult::new(url, false)
            .with_response_time(self.timeout)
            .with_error(ErrorClass::Timeout, "Request timeout")
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> CheckResult {
        let start_time = Instant::now();
        let outcome = timeout(self.timeout, self.client.get(url).send()).await;
        let elapsed = start_time.elapsed();

        let result = match outcome {
            Ok(Ok(response)) => self.classify_response(url, response.status(), elapsed),
            Ok(Err(e)) => self.classify_error(url, &e),
            Err(_) => self.timeout_result(url),
        };

        debug!(
            "探测完成: {} - {} ({}, {:.3}s)",
            url,
            result.status_label(),
            result.error_class,
            result.response_time_seconds
        );
        result
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// 格式化请求错误信息，使其更加清晰易读
fn describe_request_error(error: &reqwest::Error) -> String {
    let mut chain = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    let detail = chain.join(": ");
    let lowered = detail.to_lowercase();

    if lowered.contains("dns") || lowered.contains("failed to lookup address") {
        "DNS resolution failed".to_string()
    } else if lowered.contains("certificate") || lowered.contains("tls") {
        format!("SSL/TLS error ({detail})")
    } else if lowered.contains("refused") {
        "Connection refused".to_string()
    } else if error.is_builder() {
        format!("Invalid request ({error})")
    } else if detail.is_empty() {
        error.to_string()
    } else {
        detail
    }
}
