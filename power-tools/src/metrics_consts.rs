// Tool counters
pub const TOOL_CALLS_COUNTER: &str = "power_tools_tool_calls_total";
pub const TOOL_ERRORS_COUNTER: &str = "power_tools_tool_errors_total";

// Document reconciliation
pub const DOCUMENTS_RECONCILED_COUNTER: &str = "power_tools_documents_reconciled_total";
pub const DOCUMENTS_DROPPED_COUNTER: &str = "power_tools_documents_dropped_total";

// Live metric reads, labelled by outcome (value, missing, failed)
pub const METRIC_FETCH_COUNTER: &str = "power_tools_metric_fetch_total";

// HTTP
pub const HTTP_REQUESTS_COUNTER: &str = "http_requests_total";
pub const HTTP_REQUESTS_DURATION: &str = "http_requests_duration_seconds";
