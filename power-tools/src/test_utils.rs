use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::documents::{DocumentStore, DocumentStoreError, Fields};
use crate::power::{CatalogError, DeviceCatalog, DeviceRow};

/// Unwraps a JSON object literal into document fields.
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        other => panic!("Expected a JSON object, got {}", other),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-memory document store. Filters match on top-level field equality.
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    collections: Vec<(String, String, Vec<Fields>)>,
    unavailable: bool,
    find_filters: Arc<Mutex<Vec<Fields>>>,
    created: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(
        mut self,
        database: &str,
        collection: &str,
        documents: Vec<Fields>,
    ) -> Self {
        self.collections
            .push((database.to_string(), collection.to_string(), documents));
        self
    }

    /// Every call fails as if the server could not be reached.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn find_filters(&self) -> Vec<Fields> {
        lock(&self.find_filters).clone()
    }

    pub fn created_collections(&self) -> Vec<(String, String)> {
        lock(&self.created).clone()
    }

    fn check_available(&self) -> Result<(), DocumentStoreError> {
        if self.unavailable {
            return Err(DocumentStoreError::Unavailable(
                "server selection timed out".to_string(),
            ));
        }
        Ok(())
    }

    fn documents(&self, database: &str, collection: &str) -> Option<&Vec<Fields>> {
        self.collections
            .iter()
            .find(|(db, coll, _)| db == database && coll == collection)
            .map(|(_, _, documents)| documents)
    }
}

fn matches(document: &Fields, filter: &Fields) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn list_databases(&self) -> Result<Vec<String>, DocumentStoreError> {
        self.check_available()?;
        let mut databases: Vec<String> = self
            .collections
            .iter()
            .map(|(database, _, _)| database.clone())
            .collect();
        databases.sort();
        databases.dedup();
        Ok(databases)
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, DocumentStoreError> {
        self.check_available()?;
        Ok(self
            .collections
            .iter()
            .filter(|(db, _, _)| db == database)
            .map(|(_, collection, _)| collection.clone())
            .collect())
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Fields>, DocumentStoreError> {
        self.check_available()?;
        Ok(match self.documents(database, collection) {
            Some(_) => vec![fields(json!({"key": {"_id": 1}, "name": "_id_"}))],
            None => Vec::new(),
        })
    }

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<(), DocumentStoreError> {
        self.check_available()?;
        lock(&self.created).push((database.to_string(), collection.to_string()));
        Ok(())
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Fields,
    ) -> Result<Vec<Fields>, DocumentStoreError> {
        self.check_available()?;
        let found = self
            .documents(database, collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches(document, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        lock(&self.find_filters).push(filter);
        Ok(found)
    }

    async fn find_first(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<Fields>, DocumentStoreError> {
        self.check_available()?;
        Ok(self
            .documents(database, collection)
            .and_then(|documents| documents.first().cloned()))
    }
}

/// In-memory device catalog. A device matches when its alias contains the query.
#[derive(Clone, Default)]
pub struct MockDeviceCatalog {
    devices: Vec<DeviceRow>,
    failing: bool,
    calls: Arc<Mutex<Vec<(String, i64)>>>,
}

impl MockDeviceCatalog {
    pub fn new(devices: Vec<DeviceRow>) -> Self {
        MockDeviceCatalog {
            devices,
            ..Self::default()
        }
    }

    /// Every lookup fails as if the pool could not hand out a connection.
    pub fn failing() -> Self {
        MockDeviceCatalog {
            failing: true,
            ..Self::default()
        }
    }

    pub fn get_calls(&self) -> Vec<(String, i64)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl DeviceCatalog for MockDeviceCatalog {
    async fn find_devices(
        &self,
        query: &str,
        project_id: i64,
    ) -> Result<Vec<DeviceRow>, CatalogError> {
        lock(&self.calls).push((query.to_string(), project_id));

        if self.failing {
            return Err(CatalogError::Query(sqlx::Error::PoolTimedOut));
        }

        Ok(self
            .devices
            .iter()
            .filter(|device| device.display_name().contains(query))
            .cloned()
            .collect())
    }
}
