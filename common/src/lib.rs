pub mod storage;

pub use storage::config::{ClientConfig, Credentials, LogLevel, Policies};
pub use storage::factory::{ClientFactory, InMemoryClientFactory};
#[cfg(feature = "test-utils")]
pub use storage::in_memory::FailingStore;
pub use storage::in_memory::{Clock, InMemoryStore, WallClock};
pub use storage::{
    BinValue, Bins, EqualityFilter, Host, IndexSpec, InfoResponse, Record, RecordIterator,
    RecordKey, RecordMeta, Statement, StoreClient, StoreError, StoreResult, Ttl, UserKey, status,
};
