//! 报告模块
//!
//! 提供监控快照、JSON/HTML文件导出和控制台报告渲染

pub mod exporter;
pub mod html;
pub mod snapshot;

// 重新导出主要类型
pub use exporter::{JsonFileExporter, SnapshotExporter};
pub use html::{render_console_report, render_html_report, HtmlReportExporter};
pub use snapshot::{load_snapshot, Snapshot, UrlSnapshot, UrlStatus};
