pub mod mongo;
pub mod reconcile;
pub mod record;
pub mod store;

use std::sync::Arc;

use tracing::instrument;

use crate::api::ToolError;

pub use mongo::MongoDocumentStore;
pub use reconcile::{MergeFields, ReconcileMode, Reconciler};
pub use record::{Fields, Record};
pub use store::{parse_filter, DocumentStore, DocumentStoreError};

/// Document store introspection and the reconciled document query.
pub struct DocumentTools {
    store: Arc<dyn DocumentStore + Send + Sync>,
    reconciler: Reconciler,
}

fn require_name<'a>(argument: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::invalid_argument(argument, "must not be blank"));
    }
    Ok(value)
}

impl DocumentTools {
    pub fn new(store: Arc<dyn DocumentStore + Send + Sync>, reconciler: Reconciler) -> Self {
        DocumentTools { store, reconciler }
    }

    pub async fn list_databases(&self) -> Result<Vec<String>, ToolError> {
        Ok(self.store.list_databases().await?)
    }

    pub async fn list_collections(&self, database: &str) -> Result<Vec<String>, ToolError> {
        let database = require_name("database", database)?;
        Ok(self.store.list_collections(database).await?)
    }

    pub async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Fields>, ToolError> {
        let database = require_name("database", database)?;
        let collection = require_name("collection", collection)?;
        Ok(self.store.list_indexes(database, collection).await?)
    }

    pub async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<String, ToolError> {
        let database = require_name("database", database)?;
        let collection = require_name("collection", collection)?;
        self.store.create_collection(database, collection).await?;

        Ok(format!(
            "Collection '{collection}' created in database '{database}'"
        ))
    }

    /// Finds the documents matching `filter_json` and returns them reconciled.
    #[instrument(skip(self))]
    pub async fn query_documents(
        &self,
        database: &str,
        collection: &str,
        filter_json: &str,
    ) -> Result<Vec<Fields>, ToolError> {
        let database = require_name("database", database)?;
        let collection = require_name("collection", collection)?;
        let filter = parse_filter(filter_json)?;

        let documents = self.store.find(database, collection, filter).await?;
        let fetched = documents.len();
        let reconciled = self.reconciler.reconcile(documents);

        tracing::info!(fetched, returned = reconciled.len(), "queried documents");
        Ok(reconciled)
    }

    /// The first document of a collection, useful to discover its field names.
    pub async fn get_first_document(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<Fields>, ToolError> {
        let database = require_name("database", database)?;
        let collection = require_name("collection", collection)?;
        Ok(self.store.find_first(database, collection).await?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::test_utils::{fields, MockDocumentStore};

    fn tools(store: MockDocumentStore) -> DocumentTools {
        DocumentTools::new(Arc::new(store), Reconciler::default())
    }

    #[tokio::test]
    async fn test_query_documents_reconciles_store_results() {
        let store = MockDocumentStore::new().with_documents(
            "energy",
            "daily",
            vec![
                fields(json!({"date": "2024-05-01", "desc": "line 1", "powerDetail": [], "ep": 1})),
                fields(json!({"date": "2024-05-01", "desc": "line 1", "ep": 12.5, "note": "x"})),
                fields(json!({"date": "2024-05-02", "desc": "line 1", "ia": 3})),
            ],
        );
        let tools = tools(store.clone());

        let documents = tools
            .query_documents("energy", "daily", r#"{"desc": "line 1"}"#)
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(
            Value::Object(documents[0].clone()),
            json!({"date": "2024-05-01", "desc": "line 1", "ep": 12.5})
        );
        assert_eq!(store.find_filters(), vec![fields(json!({"desc": "line 1"}))]);
    }

    #[tokio::test]
    async fn test_invalid_filter_never_reaches_the_store() {
        let store = MockDocumentStore::new();
        let tools = tools(store.clone());

        match tools.query_documents("energy", "daily", "{desc:").await {
            Err(ToolError::InvalidFilter(_)) => (),
            other => panic!("Expected InvalidFilter, got {:?}", other),
        }
        assert!(store.find_filters().is_empty());
    }

    #[tokio::test]
    async fn test_blank_names_are_rejected() {
        let tools = tools(MockDocumentStore::new());

        match tools.list_collections("  ").await {
            Err(ToolError::InvalidArgument(name, _)) => assert_eq!(name, "database"),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
        match tools.get_first_document("energy", "").await {
            Err(ToolError::InvalidArgument(name, _)) => assert_eq!(name, "collection"),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_collection_reports_success() {
        let store = MockDocumentStore::new();
        let tools = tools(store.clone());

        let message = tools.create_collection("energy", "monthly").await.unwrap();

        assert_eq!(message, "Collection 'monthly' created in database 'energy'");
        assert_eq!(
            store.created_collections(),
            vec![("energy".to_string(), "monthly".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates() {
        let tools = tools(MockDocumentStore::new().unavailable());

        match tools.list_databases().await {
            Err(ToolError::DocumentStoreUnavailable(_)) => (),
            other => panic!("Expected DocumentStoreUnavailable, got {:?}", other),
        }
    }
}
