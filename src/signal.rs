//! 信号处理模块
//!
//! 把 SIGINT/SIGTERM（非Unix系统为Ctrl+C）转换为广播停止信号

use crate::error::Result;
use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use tracing::warn;
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 设置信号处理器
///
/// 收到第一个停止信号后向 `shutdown_tx` 广播一次
pub async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown_tx)
    }
    #[cfg(not(unix))]
    {
        setup_ctrl_c(shutdown_tx);
        Ok(())
    }
}

/// Unix/Linux系统信号处理
#[cfg(unix)]
fn setup_unix_signals(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    use futures::stream::StreamExt;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    tokio::spawn(async move {
        while let Some(signal) = signals.next().await {
            let name = match signal {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                _ => {
                    warn!("接收到未处理的信号: {signal}");
                    continue;
                }
            };

            info!("接收到 {} 信号，完成当前检测周期后停止...", name);
            if let Err(e) = shutdown_tx.send(()) {
                error!("发送关闭信号失败: {e}");
            }
            break;
        }
        handle.close();
    });

    Ok(())
}

/// 非Unix系统使用Ctrl+C
#[cfg(not(unix))]
fn setup_ctrl_c(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("接收到 Ctrl+C，完成当前检测周期后停止...");
                if let Err(e) = shutdown_tx.send(()) {
                    error!("发送关闭信号失败: {e}");
                }
            }
            Err(e) => error!("监听Ctrl+C失败: {e}"),
        }
    });
}
