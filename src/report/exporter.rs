//! 快照导出器
//!
//! 定义快照导出接口和JSON文件导出实现

use crate::error::{ReportError, Result};
use crate::report::snapshot::Snapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 快照导出器trait，每个检测周期调用一次
#[async_trait]
pub trait SnapshotExporter: Send + Sync {
    /// 导出器名称
    fn name(&self) -> &str;

    /// 导出快照
    ///
    /// # 参数
    /// * `snapshot` - 监控快照
    ///
    /// # 返回
    /// * `Result<()>` - 导出结果，失败由调度器记录，不影响监控
    async fn export(&self, snapshot: &Snapshot) -> Result<()>;
}

/// 原子写入文件：先写同目录临时文件，再重命名覆盖
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| ReportError::WriteError {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_error)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, content)
        .await
        .map_err(write_error)?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(write_error)?;

    Ok(())
}

/// JSON文件导出器
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    /// 创建导出到指定路径的JSON导出器
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 输出文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotExporter for JsonFileExporter {
    fn name(&self) -> &str {
        "json"
    }

    async fn export(&self, snapshot: &Snapshot) -> Result<()> {
        let json = snapshot.to_json_pretty()?;
        write_atomic(&self.path, json.as_bytes()).await?;
        debug!("快照已写入: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::history::HistoryStore;
    use crate::health::result::CheckResult;
    use crate::health::stats::MonitoringStats;
    use crate::health::tracker::StateTracker;
    use crate::report::snapshot::load_snapshot;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_snapshot() -> Snapshot {
        let urls = vec![
            "https://b.example.com".to_string(),
            "https://a.example.com".to_string(),
        ];
        let mut history = HistoryStore::default();
        let mut tracker = StateTracker::default();
        let mut stats = MonitoringStats::default();
        for url in &urls {
            let result = CheckResult::new(url.as_str(), url.starts_with("https://a"))
                .with_status_code(200);
            tracker.update(&result);
            stats.record(&result);
            history.append(url, result);
        }
        Snapshot::capture(&urls, &history, &tracker, &stats, Utc::now())
    }

    #[tokio::test]
    async fn test_export_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let exporter = JsonFileExporter::new(&path);

        exporter.export(&sample_snapshot()).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested").join("report.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_repeated_export_is_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let exporter = JsonFileExporter::new(&path);
        let snapshot = sample_snapshot();

        exporter.export(&snapshot).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        exporter.export(&snapshot).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_exported_snapshot_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let snapshot = sample_snapshot();

        JsonFileExporter::new(&path).export(&snapshot).await.unwrap();
        let loaded = load_snapshot(&path).await.unwrap();

        assert_eq!(loaded.per_url, snapshot.per_url);
        assert_eq!(loaded.total_checks, snapshot.total_checks);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // 父路径是文件，无法创建目录
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let exporter = JsonFileExporter::new(blocker.join("report.json"));
        let err = exporter.export(&sample_snapshot()).await.unwrap_err();
        assert!(err.to_string().contains("报告写入失败"));
    }
}
