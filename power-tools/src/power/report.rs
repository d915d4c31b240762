use std::sync::Arc;

use common_redis::Client as RedisClient;
use futures::{stream, StreamExt};
use tracing::instrument;

use crate::api::ToolError;
use crate::metrics_consts::METRIC_FETCH_COUNTER;
use crate::power::catalog::{DeviceCatalog, DeviceRow};
use crate::power::reading::MetricReading;
use crate::power::table::{render, DeviceReadings, ParameterLabels};

/// Metrics read for every device, in column order.
pub const DEFAULT_PARAMETERS: [&str; 8] = ["uab", "ubc", "ia", "ib", "ic", "ep", "p", "q"];

const EMPTY_QUERY_DOCUMENT: &str = "# Error\n\nThe device query must not be empty";
const NO_DEVICE_DOCUMENT: &str = "# Result\n\nNo matching device found";

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub project_id: i64,
    pub max_concurrent_fetches: usize,
    pub parameters: Vec<String>,
    pub labels: ParameterLabels,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            project_id: 1,
            max_concurrent_fetches: 8,
            parameters: DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect(),
            labels: ParameterLabels::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    EmptyQuery,
    NoMatchingDevice,
    Readings(Vec<DeviceReadings>),
}

/// Resolves devices in the catalog and reads their live metrics from redis.
pub struct DeviceMetricReporter {
    catalog: Arc<dyn DeviceCatalog + Send + Sync>,
    redis: Arc<dyn RedisClient + Send + Sync>,
    settings: ReportSettings,
}

impl DeviceMetricReporter {
    pub fn new(
        catalog: Arc<dyn DeviceCatalog + Send + Sync>,
        redis: Arc<dyn RedisClient + Send + Sync>,
        settings: ReportSettings,
    ) -> Self {
        DeviceMetricReporter {
            catalog,
            redis,
            settings,
        }
    }

    /// Renders the live readings of every device matching `query_text`.
    ///
    /// A blank query and a query matching no device produce explanatory documents.
    /// Only a catalog failure is an error; failed metric reads show up in the table.
    pub async fn report(&self, query_text: &str) -> Result<String, ToolError> {
        let markdown = match self.collect(query_text).await? {
            ReportOutcome::EmptyQuery => EMPTY_QUERY_DOCUMENT.to_string(),
            ReportOutcome::NoMatchingDevice => NO_DEVICE_DOCUMENT.to_string(),
            ReportOutcome::Readings(rows) => {
                render(&rows, &self.settings.parameters, &self.settings.labels)
            }
        };

        Ok(markdown)
    }

    #[instrument(skip(self))]
    pub async fn collect(&self, query_text: &str) -> Result<ReportOutcome, ToolError> {
        let query = query_text.trim();
        if query.is_empty() {
            return Ok(ReportOutcome::EmptyQuery);
        }

        let devices = self
            .catalog
            .find_devices(query, self.settings.project_id)
            .await?;
        if devices.is_empty() {
            tracing::info!("no device matches query");
            return Ok(ReportOutcome::NoMatchingDevice);
        }

        tracing::info!(
            devices = devices.len(),
            parameters = ?self.settings.parameters,
            "reading device metrics"
        );
        Ok(ReportOutcome::Readings(self.read_devices(&devices).await))
    }

    /// Reads every (device, parameter) pair, at most `max_concurrent_fetches` at a
    /// time. A failed read only affects its own cell.
    async fn read_devices(&self, devices: &[DeviceRow]) -> Vec<DeviceReadings> {
        // Units own their key and parameter so the fetch futures borrow nothing but self
        let mut units = Vec::with_capacity(devices.len() * self.settings.parameters.len());
        for (index, device) in devices.iter().enumerate() {
            let namespace = device.namespace();
            for parameter in &self.settings.parameters {
                units.push((index, parameter.clone(), format!("{namespace}:{parameter}")));
            }
        }

        let fetches = units.into_iter().map(|(index, parameter, key)| async move {
            let reading = self.read_metric(key).await;
            (index, parameter, reading)
        });
        let readings: Vec<(usize, String, MetricReading)> = stream::iter(fetches)
            .buffered(self.settings.max_concurrent_fetches.max(1))
            .collect()
            .await;

        let mut rows: Vec<DeviceReadings> = devices
            .iter()
            .map(|device| DeviceReadings::new(device.display_name()))
            .collect();
        for (index, parameter, reading) in readings {
            rows[index].values.insert(parameter, reading);
        }

        rows
    }

    async fn read_metric(&self, key: String) -> MetricReading {
        let reading = MetricReading::from_fetch(self.redis.get(key.clone()).await);

        if let MetricReading::Failed(cause) = &reading {
            tracing::error!(key = %key, "failed to read metric: {}", cause);
        }
        metrics::counter!(METRIC_FETCH_COUNTER, "outcome" => reading.outcome()).increment(1);

        reading
    }
}

#[cfg(test)]
mod tests {
    use common_redis::{CustomRedisError, MockRedisClient};

    use super::*;
    use crate::power::reading::{FAILED_SENTINEL, MISSING_SENTINEL};
    use crate::test_utils::MockDeviceCatalog;

    fn reporter(catalog: MockDeviceCatalog, redis: MockRedisClient) -> DeviceMetricReporter {
        DeviceMetricReporter::new(Arc::new(catalog), Arc::new(redis), ReportSettings::default())
    }

    fn assert_send<T: Send>(_: &T) {}

    fn device() -> DeviceRow {
        DeviceRow::new("meter-07", "tg3", "Workshop 2 main")
    }

    #[test]
    fn test_report_future_is_send() {
        let reporter = reporter(MockDeviceCatalog::new(vec![device()]), MockRedisClient::new());

        // axum handlers require Send futures
        let future = reporter.report("Workshop");
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_store_calls() {
        let catalog = MockDeviceCatalog::new(vec![device()]);
        let redis = MockRedisClient::new();
        let reporter = reporter(catalog.clone(), redis.clone());

        for query in ["", "   \t"] {
            let markdown = reporter.report(query).await.unwrap();
            assert_eq!(markdown, EMPTY_QUERY_DOCUMENT);
        }

        assert!(catalog.get_calls().is_empty());
        assert!(redis.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_device_makes_no_metric_reads() {
        let catalog = MockDeviceCatalog::new(Vec::new());
        let redis = MockRedisClient::new();
        let reporter = reporter(catalog.clone(), redis.clone());

        let markdown = reporter.report(" boiler ").await.unwrap();

        assert_eq!(markdown, NO_DEVICE_DOCUMENT);
        assert_eq!(catalog.get_calls(), vec![("boiler".to_string(), 1)]);
        assert!(redis.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_metrics_read() {
        let mut redis = MockRedisClient::new();
        for (i, parameter) in DEFAULT_PARAMETERS.iter().enumerate() {
            redis = redis.get_ret(
                &format!("tg3:meter-07:{parameter}"),
                Ok(format!(r#"{{"val": "{}.5"}}"#, i)),
            );
        }
        let reporter = reporter(MockDeviceCatalog::new(vec![device()]), redis.clone());

        let markdown = reporter.report("Workshop").await.unwrap();

        let lines: Vec<&str> = markdown.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[4],
            "| Workshop 2 main | 0.5 | 1.5 | 2.5 | 3.5 | 4.5 | 5.5 | 6.5 | 7.5 |"
        );
        assert_eq!(redis.get_calls().len(), 8);
    }

    #[tokio::test]
    async fn test_partial_failures_keep_the_row() {
        let redis = MockRedisClient::new()
            .get_ret("tg3:meter-07:uab", Ok(r#"{"val": 398.2}"#.to_string()))
            .get_ret("tg3:meter-07:ubc", Ok("401.0".to_string()))
            .get_ret("tg3:meter-07:ia", Ok(r#"{"val": "12.1"}"#.to_string()))
            .get_ret("tg3:meter-07:ep", Err(CustomRedisError::Timeout))
            .get_ret("tg3:meter-07:p", Ok(r#"{"val": 7}"#.to_string()));
        let reporter = reporter(MockDeviceCatalog::new(vec![device()]), redis);

        let outcome = reporter.collect("Workshop").await.unwrap();
        let rows = match outcome {
            ReportOutcome::Readings(rows) => rows,
            other => panic!("Expected readings, got {:?}", other),
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].values["ep"],
            MetricReading::Failed("Timeout error".to_string())
        );
        assert_eq!(rows[0].values["ib"], MetricReading::Missing);

        let markdown = reporter.report("Workshop").await.unwrap();
        let expected_row = format!(
            "| Workshop 2 main | 398.2 | 401.0 | 12.1 | {m} | {m} | {e} | 7 | {m} |",
            m = MISSING_SENTINEL,
            e = FAILED_SENTINEL
        );
        assert_eq!(markdown.lines().last(), Some(expected_row.as_str()));
    }

    #[tokio::test]
    async fn test_rows_keep_catalog_order() {
        let devices = vec![
            DeviceRow::new("meter-09", "tg1", "Pump B"),
            DeviceRow::new("meter-02", "tg1", "Pump A"),
        ];
        let redis = MockRedisClient::new()
            .get_ret("tg1:meter-09:ia", Ok(r#"{"val": 9}"#.to_string()))
            .get_ret("tg1:meter-02:ia", Ok(r#"{"val": 2}"#.to_string()));
        let reporter = DeviceMetricReporter::new(
            Arc::new(MockDeviceCatalog::new(devices)),
            Arc::new(redis),
            ReportSettings {
                max_concurrent_fetches: 3,
                ..ReportSettings::default()
            },
        );

        let markdown = reporter.report("Pump").await.unwrap();

        let rows: Vec<&str> = markdown.lines().skip(4).collect();
        assert!(rows[0].starts_with("| Pump B | N/A | N/A | 9 |"));
        assert!(rows[1].starts_with("| Pump A | N/A | N/A | 2 |"));
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let reporter = reporter(MockDeviceCatalog::failing(), MockRedisClient::new());

        match reporter.report("Workshop").await {
            Err(ToolError::CatalogUnavailable(_)) => (),
            other => panic!("Expected CatalogUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_project_scope_is_passed_to_catalog() {
        let catalog = MockDeviceCatalog::new(Vec::new());
        let reporter = DeviceMetricReporter::new(
            Arc::new(catalog.clone()),
            Arc::new(MockRedisClient::new()),
            ReportSettings {
                project_id: 42,
                ..ReportSettings::default()
            },
        );

        reporter.report("Workshop").await.unwrap();

        assert_eq!(catalog.get_calls(), vec![("Workshop".to_string(), 42)]);
    }
}
