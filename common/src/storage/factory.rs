//! Client factories for creating store clients from configuration.
//!
//! A data source never constructs its client directly; it asks a
//! [`ClientFactory`] so that embedders can swap the in-memory store for a
//! networked client without touching connector code.

use std::sync::Arc;

use super::config::ClientConfig;
use super::in_memory::InMemoryStore;
use super::{StoreClient, StoreResult};

/// Builds a store client for a given configuration.
///
/// Any `Fn(&ClientConfig) -> StoreResult<Arc<dyn StoreClient>>` closure is a
/// factory, which keeps one-off test wiring short.
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: &ClientConfig) -> StoreResult<Arc<dyn StoreClient>>;
}

impl<F> ClientFactory for F
where
    F: Fn(&ClientConfig) -> StoreResult<Arc<dyn StoreClient>> + Send + Sync,
{
    fn create(&self, config: &ClientConfig) -> StoreResult<Arc<dyn StoreClient>> {
        self(config)
    }
}

/// Factory producing [`InMemoryStore`] clients.
///
/// By default every call creates a fresh, empty store answering on the first
/// configured host. [`InMemoryClientFactory::shared`] hands out the same store
/// instead, so several data sources can observe each other's writes.
#[derive(Default)]
pub struct InMemoryClientFactory {
    shared: Option<Arc<InMemoryStore>>,
}

impl InMemoryClientFactory {
    /// Creates a factory that builds a new store per call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory that always returns `store`.
    pub fn shared(store: Arc<InMemoryStore>) -> Self {
        Self {
            shared: Some(store),
        }
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn create(&self, config: &ClientConfig) -> StoreResult<Arc<dyn StoreClient>> {
        match &self.shared {
            Some(store) => Ok(store.clone()),
            None => Ok(Arc::new(InMemoryStore::from_config(config))),
        }
    }
}
