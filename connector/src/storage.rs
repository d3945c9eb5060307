//! Connector-side wrapper around a store client.
//!
//! [`RecordStorage`] maps the store's not-found status onto `Option`/`bool`
//! and every other status onto [`Error::Store`].

use std::sync::Arc;

use common::{
    Bins, IndexSpec, InfoResponse, Record, RecordIterator, RecordKey, RecordMeta, Statement,
    StoreClient, StoreError, Ttl, status,
};

use crate::error::{Error, Result};

#[derive(Clone)]
pub(crate) struct RecordStorage {
    client: Arc<dyn StoreClient>,
}

impl RecordStorage {
    pub(crate) fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    /// Creates a new storage over a connected in-memory store.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        let store = common::InMemoryStore::new();
        store.connect().await.ok();
        Self::new(Arc::new(store))
    }

    pub(crate) async fn connect(&self) -> std::result::Result<(), StoreError> {
        self.client.connect().await
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.client.close().await.map_err(Error::from)
    }

    pub(crate) async fn put(&self, key: &RecordKey, bins: Bins, ttl: Ttl) -> Result<RecordKey> {
        self.client
            .put(key, bins, RecordMeta::with_ttl(ttl))
            .await
            .map_err(Error::from)
    }

    /// Reads a record, or None if it does not exist.
    pub(crate) async fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        match self.client.get(key).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn exists(&self, key: &RecordKey) -> Result<bool> {
        match self.client.exists(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a record. Returns false if it did not exist.
    pub(crate) async fn remove(&self, key: &RecordKey) -> Result<bool> {
        match self.client.remove(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn query(
        &self,
        namespace: &str,
        set: &str,
        statement: Statement,
    ) -> Result<Box<dyn RecordIterator + Send + 'static>> {
        self.client
            .query(namespace, set, statement)
            .await
            .map_err(Error::from)
    }

    /// Creates a string index. Returns false if the index already existed.
    pub(crate) async fn create_string_index(&self, spec: IndexSpec) -> Result<bool> {
        match self.client.create_string_index(spec).await {
            Ok(()) => Ok(true),
            Err(e) if e.code == status::INDEX_FOUND => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn info(&self, command: &str) -> Result<InfoResponse> {
        self.client.info(command).await.map_err(Error::from)
    }
}
