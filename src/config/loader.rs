//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换、URL列表文件读取和默认配置回退

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// 配置来源
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// 从文件成功加载
    File(PathBuf),
    /// 文件不存在，使用默认配置
    Missing(PathBuf),
    /// 文件无效，使用默认配置
    Invalid {
        /// 配置文件路径
        path: PathBuf,
        /// 失败原因
        reason: String,
    },
}

/// 带回退的加载结果
///
/// 加载发生在日志系统初始化之前，由调用方在日志就绪后报告来源
#[derive(Debug, Clone)]
pub struct ConfigLoadOutcome {
    /// 最终生效的配置
    pub config: Config,
    /// 配置来源
    pub origin: ConfigOrigin,
}

impl ConfigLoadOutcome {
    /// 是否回退到了默认配置
    pub fn used_defaults(&self) -> bool {
        !matches!(self.origin, ConfigOrigin::File(_))
    }
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的 `${VAR_NAME}` 环境变量，变量缺失时报错
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut result = content.to_string();
        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            let value = std::env::var(var_name).map_err(|_| ConfigError::EnvVarError {
                var: var_name.to_string(),
            })?;
            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        Ok(config)
    }

    /// 加载配置，文件缺失或无效时回退到默认配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `ConfigLoadOutcome` - 生效的配置及其来源
    pub async fn load_with_fallback(&self, path: &Path) -> ConfigLoadOutcome {
        if !path.exists() {
            return ConfigLoadOutcome {
                config: Config::default(),
                origin: ConfigOrigin::Missing(path.to_path_buf()),
            };
        }

        match self.load_from_file(path).await {
            Ok(config) => ConfigLoadOutcome {
                config,
                origin: ConfigOrigin::File(path.to_path_buf()),
            },
            Err(e) => ConfigLoadOutcome {
                config: Config::default(),
                origin: ConfigOrigin::Invalid {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                },
            },
        }
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        debug!("成功加载配置文件: {}", path.display());
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 解析URL列表文件内容，跳过空行和 `#` 注释
pub fn parse_url_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// 合并URL列表并去重，保留首次出现的顺序
pub fn merge_urls<I>(inline: &[String], extra: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    inline
        .iter()
        .cloned()
        .chain(extra)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

impl Config {
    /// 解析最终要监控的URL列表
    ///
    /// 内联的 `monitor.urls` 在前，`monitor.urls_file` 中的URL在后；
    /// 相对路径的URL文件以 `base_dir` 为基准，文件不存在时只记录警告
    pub async fn resolve_urls(&self, base_dir: Option<&Path>) -> Result<Vec<String>> {
        let mut from_file = Vec::new();

        if let Some(urls_file) = &self.monitor.urls_file {
            let path = match base_dir {
                Some(dir) if urls_file.is_relative() => dir.join(urls_file),
                _ => urls_file.clone(),
            };

            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    from_file = parse_url_lines(&content);
                    debug!("从 {} 读取了 {} 个URL", path.display(), from_file.len());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("URL列表文件不存在: {}", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(merge_urls(&self.monitor.urls, from_file))
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录的 `config.toml`，否则使用用户配置目录下的 `uptime-vitals/config.toml`
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from("config.toml");
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(crate::APP_NAME).join("config.toml"))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    const TEST_CONFIG_TOML: &str = r#"
[monitor]
urls = ["https://example.com/health", "https://api.example.com/ping"]
check_interval_seconds = 120
quick_check_interval_seconds = 30
failure_threshold = 3

[logging]
level = "debug"
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[monitor]
urls = ["https://example.com/health"]

[monitor.headers]
"Authorization" = "Bearer ${UPTIME_TEST_API_TOKEN}"

[notification]
enabled = true
webhook_url = "${UPTIME_TEST_WEBHOOK_URL}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.monitor.urls.len(), 2);
        assert_eq!(config.monitor.check_interval_seconds, 120);
        assert_eq!(config.monitor.quick_check_interval_seconds, 30);
        assert_eq!(config.monitor.failure_threshold, 3);
        assert_eq!(config.monitor.request_timeout_seconds, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("UPTIME_TEST_WEBHOOK_URL", "https://test.webhook.url");
        env::set_var("UPTIME_TEST_API_TOKEN", "test-token-123");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(
            config.notification.webhook_url,
            Some("https://test.webhook.url".to_string())
        );
        assert_eq!(
            config.monitor.headers.get("Authorization"),
            Some(&"Bearer test-token-123".to_string())
        );

        env::remove_var("UPTIME_TEST_WEBHOOK_URL");
        env::remove_var("UPTIME_TEST_API_TOKEN");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        let content = r#"
[notification]
webhook_url = "${UPTIME_TEST_MISSING_VAR}"
"#;

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(content).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("UPTIME_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[tokio::test]
    async fn test_fallback_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let outcome = TomlConfigLoader::default().load_with_fallback(&path).await;

        assert!(outcome.used_defaults());
        assert_eq!(outcome.origin, ConfigOrigin::Missing(path));
        assert_eq!(outcome.config, Config::default());
    }

    #[tokio::test]
    async fn test_fallback_when_file_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitor\nthis is not toml").unwrap();

        let outcome = TomlConfigLoader::default().load_with_fallback(&path).await;

        assert!(outcome.used_defaults());
        assert!(matches!(outcome.origin, ConfigOrigin::Invalid { .. }));
        assert_eq!(outcome.config, Config::default());
    }

    #[tokio::test]
    async fn test_fallback_when_validation_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitor]\nfailure_threshold = 0\n").unwrap();

        let outcome = TomlConfigLoader::default().load_with_fallback(&path).await;

        match outcome.origin {
            ConfigOrigin::Invalid { reason, .. } => assert!(reason.contains("失败阈值")),
            other => panic!("unexpected origin: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_valid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, TEST_CONFIG_TOML).unwrap();

        let outcome = TomlConfigLoader::new(false).load_with_fallback(&path).await;

        assert!(!outcome.used_defaults());
        assert_eq!(outcome.config.monitor.failure_threshold, 3);
    }

    #[test]
    fn test_parse_url_lines() {
        let content = "https://a.example.com\n\n  # comment\n  https://b.example.com  \n";
        assert_eq!(
            parse_url_lines(content),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn test_merge_urls_keeps_first_occurrence() {
        let inline = vec![
            "https://a.example.com".to_string(),
            "https://b.example.com".to_string(),
        ];
        let merged = merge_urls(
            &inline,
            vec![
                "https://b.example.com".to_string(),
                "https://c.example.com".to_string(),
                "https://a.example.com".to_string(),
            ],
        );
        assert_eq!(
            merged,
            vec![
                "https://a.example.com",
                "https://b.example.com",
                "https://c.example.com"
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_urls_merges_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("urls.txt"),
            "# monitored\nhttps://b.example.com\nhttps://a.example.com\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.monitor.urls = vec!["https://a.example.com".to_string()];

        let urls = config.resolve_urls(Some(dir.path())).await.unwrap();
        assert_eq!(urls, vec!["https://a.example.com", "https://b.example.com"]);
    }

    #[tokio::test]
    async fn test_resolve_urls_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.monitor.urls = vec!["https://a.example.com".to_string()];

        let urls = config.resolve_urls(Some(dir.path())).await.unwrap();
        assert_eq!(urls, vec!["https://a.example.com"]);
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
