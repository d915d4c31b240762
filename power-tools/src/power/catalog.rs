use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use thiserror::Error;
use tracing::instrument;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

// Meters hang off a data processing unit (dpu) whose `tg` namespaces the meter's keys in redis
const DEVICE_QUERY: &str = "
    SELECT em.name, dpu.tg, em.alias_name
    FROM dpu
    INNER JOIN elec_meter em ON dpu.asset_number = em.gateway_id
    WHERE em.alias_name LIKE ? AND em.project_id = ?";

const MISSING_COLUMN: &str = "null";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// One meter known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DeviceRow {
    pub name: Option<String>,
    pub tg: Option<String>,
    pub alias_name: Option<String>,
}

impl DeviceRow {
    pub fn new(name: &str, tg: &str, alias_name: &str) -> Self {
        DeviceRow {
            name: Some(name.to_string()),
            tg: Some(tg.to_string()),
            alias_name: Some(alias_name.to_string()),
        }
    }

    /// The `tg:name` prefix of every metric key of this device.
    pub fn namespace(&self) -> String {
        format!("{}:{}", column(&self.tg), column(&self.name))
    }

    pub fn display_name(&self) -> &str {
        column(&self.alias_name)
    }
}

fn column(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING_COLUMN)
}

#[async_trait]
pub trait DeviceCatalog {
    /// Devices of `project_id` whose alias contains `query`.
    async fn find_devices(
        &self,
        query: &str,
        project_id: i64,
    ) -> Result<Vec<DeviceRow>, CatalogError>;
}

pub struct MySqlDeviceCatalog {
    pool: MySqlPool,
}

impl MySqlDeviceCatalog {
    /// Builds the pool without connecting; connections are opened on first query.
    pub fn new(url: &str, max_connections: u32) -> Result<MySqlDeviceCatalog, CatalogError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(url)?;

        Ok(MySqlDeviceCatalog { pool })
    }
}

#[async_trait]
impl DeviceCatalog for MySqlDeviceCatalog {
    #[instrument(skip(self))]
    async fn find_devices(
        &self,
        query: &str,
        project_id: i64,
    ) -> Result<Vec<DeviceRow>, CatalogError> {
        let rows = sqlx::query_as::<_, DeviceRow>(DEVICE_QUERY)
            .bind(format!("%{query}%"))
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
