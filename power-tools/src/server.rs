use std::future::Future;
use std::sync::Arc;

use common_redis::RedisClient;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::documents::{DocumentTools, MergeFields, MongoDocumentStore, Reconciler};
use crate::power::{DeviceMetricReporter, MySqlDeviceCatalog, ReportSettings};
use crate::router;
use crate::tools::ToolRegistry;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let redis_client =
        match RedisClient::with_timeout(config.redis_url.clone(), config.redis_timeout()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::error!(
                    "Failed to create Redis client for URL {}: {}",
                    config.redis_url,
                    e
                );
                return;
            }
        };

    let catalog =
        match MySqlDeviceCatalog::new(&config.mysql_url, config.max_mysql_connections) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                tracing::error!("Failed to create device catalog: {}", e);
                return;
            }
        };

    let store = match MongoDocumentStore::new(&config.mongo_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to create document store client: {}", e);
            return;
        }
    };

    tracing::info!(mode = ?config.reconcile_mode, "document reconciliation configured");
    let reconciler = Reconciler::new(MergeFields::default(), config.reconcile_mode);
    let documents = DocumentTools::new(store, reconciler);
    let power = DeviceMetricReporter::new(
        catalog,
        redis_client,
        ReportSettings {
            project_id: config.project_id,
            max_concurrent_fetches: config.max_concurrent_fetches,
            ..ReportSettings::default()
        },
    );
    let tools = ToolRegistry::new(Arc::new(documents), Arc::new(power));

    let app = router::router(tools, &config);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on unknown address: {}", e),
    }
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("server error: {}", e);
    }
}
