pub mod config;
pub mod factory;
pub mod in_memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

/// Store status codes.
///
/// `OK` never travels inside a [`StoreError`]; every other code is defined by
/// the store and passed through to callers untouched.
pub mod status {
    pub const OK: i32 = 0;
    pub const CLIENT_ERROR: i32 = -1;
    pub const INVALID_ARGUMENT: i32 = -2;
    pub const CONNECTION_ERROR: i32 = -10;
    pub const RECORD_NOT_FOUND: i32 = 2;
    pub const PARAMETER_ERROR: i32 = 4;
    pub const TIMEOUT: i32 = 9;
    pub const BIN_NAME_TOO_LONG: i32 = 21;
    pub const INDEX_FOUND: i32 = 200;
    pub const INDEX_NOT_FOUND: i32 = 201;
}

/// Maximum length of a bin name in bytes.
pub const MAX_BIN_NAME_LEN: usize = 15;

/// Maximum length of a set name in bytes.
pub const MAX_SET_NAME_LEN: usize = 63;

/// Maximum length of a namespace name in bytes.
pub const MAX_NAMESPACE_LEN: usize = 31;

/// Longest record time-to-live, in seconds.
pub const MAX_TTL_SECS: u64 = u32::MAX as u64;

/// The user-supplied part of a record key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserKey {
    String(String),
    Int(i64),
    Bytes(Bytes),
}

impl UserKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            UserKey::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, UserKey::String(_))
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::String(s) => write!(f, "{}", s),
            UserKey::Int(v) => write!(f, "{}", v),
            UserKey::Bytes(b) => write!(f, "{:?}", b),
        }
    }
}

/// Three-part address of a record: namespace, set and user key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub namespace: String,
    pub set: String,
    pub key: UserKey,
}

impl RecordKey {
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, key: UserKey) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            key,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.key)
    }
}

/// A typed bin value. The store has no boolean bin type.
#[derive(Clone, Debug, PartialEq)]
pub enum BinValue {
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Bytes),
}

impl From<i64> for BinValue {
    fn from(v: i64) -> Self {
        BinValue::Int(v)
    }
}

impl From<f64> for BinValue {
    fn from(v: f64) -> Self {
        BinValue::Float(v)
    }
}

impl From<&str> for BinValue {
    fn from(s: &str) -> Self {
        BinValue::String(s.to_string())
    }
}

impl From<String> for BinValue {
    fn from(s: String) -> Self {
        BinValue::String(s)
    }
}

impl From<Bytes> for BinValue {
    fn from(b: Bytes) -> Self {
        BinValue::Bytes(b)
    }
}

/// The bins of a record, ordered by name.
pub type Bins = BTreeMap<String, BinValue>;

/// Record expiration policy, in seconds.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum Ttl {
    /// Use the namespace default.
    #[default]
    Default,
    NoExpiry,
    ExpireAfter(u64),
}

/// Metadata written with and returned alongside a record.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct RecordMeta {
    pub generation: u32,
    pub ttl: Ttl,
}

impl RecordMeta {
    pub fn with_ttl(ttl: Ttl) -> Self {
        Self { generation: 0, ttl }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub key: RecordKey,
    pub bins: Bins,
    pub meta: RecordMeta,
}

impl Record {
    pub fn new(key: RecordKey, bins: Bins, meta: RecordMeta) -> Self {
        Self { key, bins, meta }
    }
}

/// A single equality predicate on a bin, evaluated through a secondary index.
#[derive(Clone, Debug, PartialEq)]
pub struct EqualityFilter {
    pub bin: String,
    pub value: BinValue,
}

impl EqualityFilter {
    pub fn new(bin: impl Into<String>, value: BinValue) -> Self {
        Self {
            bin: bin.into(),
            value,
        }
    }
}

/// A scan statement. All filters must match for a record to be returned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    pub filters: Vec<EqualityFilter>,
    /// Scan cluster nodes in parallel.
    pub concurrent: bool,
    /// Return keys and metadata only.
    pub nobins: bool,
}

/// Parameters of a string secondary index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub namespace: String,
    pub set: String,
    pub bin: String,
    pub index: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host {
    pub addr: String,
    pub port: u16,
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Answer to an info command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoResponse {
    pub host: Host,
    pub response: String,
}

/// Error returned by store operations, carrying the store's status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: i32,
    pub message: String,
}

impl StoreError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(key: &RecordKey) -> Self {
        Self::new(status::RECORD_NOT_FOUND, format!("record not found: {}", key))
    }

    pub fn is_not_found(&self) -> bool {
        self.code == status::RECORD_NOT_FOUND
    }
}

impl std::error::Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store error {}: {}", self.code, self.message)
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Streaming scan results.
///
/// `next` yields one record at a time, an error that ends the scan, or `None`
/// once the scan is complete. Dropping the iterator abandons the scan.
#[async_trait]
pub trait RecordIterator {
    async fn next(&mut self) -> StoreResult<Option<Record>>;
}

/// Client for an Aerospike-style record store.
///
/// Implementations serialize requests internally, so a single client may be
/// shared across tasks.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Opens the connection to the cluster.
    async fn connect(&self) -> StoreResult<()>;

    /// Closes the connection. Further operations fail until reconnected.
    async fn close(&self) -> StoreResult<()>;

    /// Writes `bins` to the record at `key`, replacing any existing bins.
    async fn put(&self, key: &RecordKey, bins: Bins, meta: RecordMeta) -> StoreResult<RecordKey>;

    /// Reads a record. A missing record fails with [`status::RECORD_NOT_FOUND`].
    async fn get(&self, key: &RecordKey) -> StoreResult<Record>;

    /// Reads record metadata. A missing record fails with [`status::RECORD_NOT_FOUND`].
    async fn exists(&self, key: &RecordKey) -> StoreResult<RecordMeta>;

    /// Removes a record. A missing record fails with [`status::RECORD_NOT_FOUND`].
    async fn remove(&self, key: &RecordKey) -> StoreResult<RecordKey>;

    /// Scans a set, returning the records that match every filter of the statement.
    async fn query(
        &self,
        namespace: &str,
        set: &str,
        statement: Statement,
    ) -> StoreResult<Box<dyn RecordIterator + Send + 'static>>;

    /// Creates a string secondary index. Fails with [`status::INDEX_FOUND`] if
    /// an index with the same name exists.
    async fn create_string_index(&self, spec: IndexSpec) -> StoreResult<()>;

    /// Sends an info command to a cluster node.
    async fn info(&self, command: &str) -> StoreResult<InfoResponse>;
}
