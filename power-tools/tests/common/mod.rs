use std::net::SocketAddr;
use std::sync::Arc;

use common_redis::MockRedisClient;
use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use power_tools::config::Config;
use power_tools::documents::{DocumentTools, Reconciler};
use power_tools::power::{DeviceMetricReporter, ReportSettings};
use power_tools::router::router;
use power_tools::test_utils::{MockDeviceCatalog, MockDocumentStore};
use power_tools::tools::ToolRegistry;

pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);

pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    /// Serves the full router backed by in-memory collaborators.
    pub async fn for_mocks(
        store: MockDocumentStore,
        catalog: MockDeviceCatalog,
        redis: MockRedisClient,
    ) -> ServerHandle {
        let documents = DocumentTools::new(Arc::new(store), Reconciler::default());
        let power = DeviceMetricReporter::new(
            Arc::new(catalog),
            Arc::new(redis),
            ReportSettings::default(),
        );
        let tools = ToolRegistry::new(Arc::new(documents), Arc::new(power));
        let app = router(tools, &DEFAULT_CONFIG);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { notify.notified().await })
                .await
        });
        ServerHandle { addr, shutdown }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("http://{:?}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn post<T: Into<reqwest::Body>>(&self, path: &str, body: T) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{:?}{}", self.addr, path))
            .body(body)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn call_tool<T: Into<reqwest::Body>>(
        &self,
        name: &str,
        body: T,
    ) -> reqwest::Response {
        self.post(&format!("/tools/{name}"), body).await
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}
