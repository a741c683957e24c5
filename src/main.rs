//! Uptime Vitals 主程序入口
//!
//! URL可用性监控工具

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    uptime_vitals::core::app::main().await
}
