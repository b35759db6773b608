use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::worker::DeleteWorkerPool;

/// 等待 Ctrl+C，然后排空删除池
pub async fn listen_for_shutdown(pool: &DeleteWorkerPool, deadline: Duration) -> Result<()> {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, draining delete worker pool...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    perform_shutdown(pool, deadline).await
}

/// 关闭删除池并记录结果
pub async fn perform_shutdown(pool: &DeleteWorkerPool, deadline: Duration) -> Result<()> {
    let stats = pool.stats();
    info!(
        queue_size = stats.queue_size,
        workers = stats.worker_count,
        "Stopping delete worker pool"
    );

    match pool.shutdown(deadline).await {
        Ok(()) => {
            info!("All shutdown tasks completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Delete worker pool shutdown failed: {}", e);
            Err(e)
        }
    }
}
