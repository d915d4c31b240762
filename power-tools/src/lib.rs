pub mod api;
pub mod config;
pub mod documents;
pub mod endpoint;
pub mod metrics;
pub mod metrics_consts;
pub mod power;
pub mod router;
pub mod server;
pub mod tools;

// Shared with the integration tests, so not gated behind cfg(test)
pub mod test_utils;
