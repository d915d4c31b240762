use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use crate::documents::DocumentStoreError;
use crate::power::CatalogError;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid argument `{0}`: {1}")]
    InvalidArgument(String, String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("document store unavailable")]
    DocumentStoreUnavailable(String),
    #[error("device catalog unavailable")]
    CatalogUnavailable(String),
    #[error("document store error: {0}")]
    DocumentStoreFailure(String),
}

impl ToolError {
    pub fn invalid_argument(name: &str, reason: &str) -> Self {
        ToolError::InvalidArgument(name.to_string(), reason.to_string())
    }

    /// Returns (error_code, status_code) for this error.
    fn error_metadata(&self) -> (&'static str, StatusCode) {
        match self {
            ToolError::UnknownTool(_) => ("unknown_tool", StatusCode::NOT_FOUND),
            ToolError::InvalidArgument(_, _) => ("invalid_argument", StatusCode::BAD_REQUEST),
            ToolError::InvalidFilter(_) => ("invalid_filter", StatusCode::BAD_REQUEST),
            ToolError::DocumentStoreUnavailable(_) => {
                ("document_store_unavailable", StatusCode::SERVICE_UNAVAILABLE)
            }
            ToolError::CatalogUnavailable(_) => {
                ("catalog_unavailable", StatusCode::SERVICE_UNAVAILABLE)
            }
            ToolError::DocumentStoreFailure(_) => {
                ("document_store_error", StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.error_metadata().0
    }

    pub fn status_code(&self) -> StatusCode {
        self.error_metadata().1
    }
}

impl From<DocumentStoreError> for ToolError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::InvalidFilter(reason) => ToolError::InvalidFilter(reason),
            DocumentStoreError::Unavailable(reason) => {
                tracing::error!("document store unavailable: {}", reason);
                ToolError::DocumentStoreUnavailable(reason)
            }
            DocumentStoreError::Driver(e) => {
                tracing::error!("document store error: {}", e);
                ToolError::DocumentStoreFailure(e.to_string())
            }
            DocumentStoreError::Conversion(reason) => {
                tracing::error!("document conversion failed: {}", reason);
                ToolError::DocumentStoreFailure(reason)
            }
        }
    }
}

impl From<CatalogError> for ToolError {
    fn from(err: CatalogError) -> Self {
        tracing::error!("device catalog error: {}", err);
        ToolError::CatalogUnavailable(err.to_string())
    }
}

impl IntoResponse for ToolError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = if status.is_client_error() {
            "validation_error"
        } else {
            "server_error"
        };

        let body = ErrorResponse {
            error_type: error_type.to_string(),
            code: self.error_code().to_string(),
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
