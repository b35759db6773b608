use std::sync::Arc;

use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::errors::Result;
use crate::services::LinkService;
use crate::storage::{StorageDeleter, StorageFactory, UrlStorage};
use crate::worker::{DeleteWorkerConfig, DeleteWorkerPool};

pub struct StartupContext {
    pub storage: Arc<dyn UrlStorage>,
    pub link_service: Arc<LinkService>,
    pub delete_pool: Arc<DeleteWorkerPool>,
}

/// 构建存储、删除池和链接服务，并启动删除池
///
/// 必须在 tokio runtime 内调用。
pub fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(&config.storage)?;

    let pool_config = DeleteWorkerConfig::from(&config.delete_worker);
    pool_config.validate()?;
    let delete_pool = Arc::new(DeleteWorkerPool::new(
        Arc::new(StorageDeleter(Arc::clone(&storage))),
        pool_config,
    ));
    delete_pool.start();

    let link_service = Arc::new(
        LinkService::new(Arc::clone(&storage), config.server.base_url.clone())
            .with_delete_pool(Arc::clone(&delete_pool)),
    );

    info!(
        "Startup finished in {:?} (base_url: {})",
        start_time.elapsed(),
        config.server.base_url
    );

    Ok(StartupContext {
        storage,
        link_service,
        delete_pool,
    })
}
