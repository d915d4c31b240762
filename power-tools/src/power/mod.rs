pub mod catalog;
pub mod reading;
pub mod report;
pub mod table;

pub use catalog::{CatalogError, DeviceCatalog, DeviceRow, MySqlDeviceCatalog};
pub use reading::MetricReading;
pub use report::{DeviceMetricReporter, ReportOutcome, ReportSettings, DEFAULT_PARAMETERS};
pub use table::{render, DeviceReadings, ParameterLabels};
