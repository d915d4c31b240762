use async_trait::async_trait;
use mongodb::error::ErrorKind;
use serde_json::Value;
use thiserror::Error;

use crate::documents::record::Fields;

#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error("document store error: {0}")]
    Driver(mongodb::error::Error),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("document could not be converted: {0}")]
    Conversion(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for DocumentStoreError {
    /// Errors meaning the server could not be reached become `Unavailable`; the
    /// rest are failures of the operation itself.
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => {
                DocumentStoreError::Unavailable(err.to_string())
            }
            _ => DocumentStoreError::Driver(err),
        }
    }
}

/// The operations the tools need from a document database.
#[async_trait]
pub trait DocumentStore {
    async fn list_databases(&self) -> Result<Vec<String>, DocumentStoreError>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, DocumentStoreError>;

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Fields>, DocumentStoreError>;

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<(), DocumentStoreError>;

    /// Every document matching `filter`, in store order.
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Fields,
    ) -> Result<Vec<Fields>, DocumentStoreError>;

    async fn find_first(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<Fields>, DocumentStoreError>;
}

/// Parses a filter written as (extended) JSON. A blank filter matches everything.
pub fn parse_filter(filter_json: &str) -> Result<Fields, DocumentStoreError> {
    if filter_json.trim().is_empty() {
        return Ok(Fields::new());
    }

    match serde_json::from_str::<Value>(filter_json) {
        Ok(Value::Object(filter)) => Ok(filter),
        Ok(_) => Err(DocumentStoreError::InvalidFilter(
            "filter must be a JSON object".to_string(),
        )),
        Err(e) => Err(DocumentStoreError::InvalidFilter(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_blank_filter_matches_everything() {
        assert!(parse_filter("").unwrap().is_empty());
        assert!(parse_filter("   ").unwrap().is_empty());
    }

    #[test]
    fn test_filter_keeps_operators() {
        let filter = parse_filter(r#"{"date": {"$gte": "2024-05-01"}, "desc": "line 1"}"#).unwrap();

        assert_eq!(
            Value::Object(filter),
            json!({"date": {"$gte": "2024-05-01"}, "desc": "line 1"})
        );
    }

    #[test]
    fn test_connectivity_errors_are_unavailable() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let err = DocumentStoreError::from(mongodb::error::Error::from(refused));

        match err {
            DocumentStoreError::Unavailable(_) => (),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_operation_errors_stay_driver_errors() {
        let decode = mongodb::bson::from_document::<String>(mongodb::bson::doc! {"a": 1})
            .unwrap_err();
        let err = DocumentStoreError::from(mongodb::error::Error::from(ErrorKind::from(decode)));

        match err {
            DocumentStoreError::Driver(_) => (),
            other => panic!("Expected Driver, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_filters() {
        for filter in ["{date: ", "[1, 2]", "\"line 1\""] {
            match parse_filter(filter) {
                Err(DocumentStoreError::InvalidFilter(_)) => (),
                other => panic!("Expected InvalidFilter for {filter}, got {:?}", other),
            }
        }
    }
}
