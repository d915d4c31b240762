use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document};
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::instrument;

use crate::documents::record::Fields;
use crate::documents::store::{DocumentStore, DocumentStoreError};

pub struct MongoDocumentStore {
    client: Client,
}

impl MongoDocumentStore {
    /// Parses the connection string. The driver connects lazily, on first use.
    pub async fn new(uri: &str) -> Result<MongoDocumentStore, DocumentStoreError> {
        let client = Client::with_uri_str(uri).await?;

        Ok(MongoDocumentStore { client })
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

fn to_filter(filter: Fields) -> Result<Document, DocumentStoreError> {
    match Bson::try_from(Value::Object(filter)) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(DocumentStoreError::InvalidFilter(format!(
            "filter resolved to {:?} instead of a document",
            other.element_type()
        ))),
        Err(e) => Err(DocumentStoreError::InvalidFilter(e.to_string())),
    }
}

fn to_fields(document: Document) -> Result<Fields, DocumentStoreError> {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => Ok(fields),
        other => Err(DocumentStoreError::Conversion(format!(
            "expected an object, got {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip_all)]
    async fn list_databases(&self) -> Result<Vec<String>, DocumentStoreError> {
        let names = self.client.list_database_names(None, None).await?;
        tracing::info!(count = names.len(), "listed databases");
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn list_collections(&self, database: &str) -> Result<Vec<String>, DocumentStoreError> {
        let names = self
            .client
            .database(database)
            .list_collection_names(None)
            .await?;
        tracing::info!(count = names.len(), "listed collections");
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Fields>, DocumentStoreError> {
        let cursor = self.collection(database, collection).list_indexes(None).await?;
        let models: Vec<IndexModel> = cursor.try_collect().await?;

        models
            .iter()
            .map(|model| {
                bson::to_document(model)
                    .map_err(|e| DocumentStoreError::Conversion(e.to_string()))
                    .and_then(to_fields)
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<(), DocumentStoreError> {
        self.client
            .database(database)
            .create_collection(collection, None)
            .await?;
        tracing::info!("created collection");
        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Fields,
    ) -> Result<Vec<Fields>, DocumentStoreError> {
        let filter = to_filter(filter)?;
        tracing::debug!(%filter, "running find");

        let cursor = self.collection(database, collection).find(filter, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        tracing::info!(count = documents.len(), "raw documents fetched");

        documents.into_iter().map(to_fields).collect()
    }

    #[instrument(skip(self))]
    async fn find_first(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<Fields>, DocumentStoreError> {
        self.collection(database, collection)
            .find_one(None, None)
            .await?
            .map(to_fields)
            .transpose()
    }
}
