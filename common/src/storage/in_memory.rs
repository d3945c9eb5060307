use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::config::ClientConfig;
use super::{
    Bins, Host, IndexSpec, InfoResponse, MAX_BIN_NAME_LEN, Record, RecordIterator, RecordKey,
    RecordMeta, Statement, StoreClient, StoreError, StoreResult, Ttl, status,
};

/// Trait for providing the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time as milliseconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Clock implementation that returns the real system time.
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }
}

/// Internal wrapper that stores bins alongside their expiration timestamp.
#[derive(Clone, Debug)]
struct StoredRecord {
    bins: Bins,
    generation: u32,
    /// `None` means the record never expires.
    expire_ts: Option<i64>,
}

impl StoredRecord {
    fn is_expired(&self, now: i64) -> bool {
        self.expire_ts.is_some_and(|ts| now >= ts)
    }

    fn meta(&self, now: i64) -> RecordMeta {
        let ttl = match self.expire_ts {
            Some(ts) => Ttl::ExpireAfter((ts.saturating_sub(now).max(0) as u64).div_ceil(1000)),
            None => Ttl::NoExpiry,
        };
        RecordMeta {
            generation: self.generation,
            ttl,
        }
    }
}

/// Computes the absolute expiration timestamp (ms) from a TTL in seconds.
fn compute_expire_ts(now: i64, ttl: Ttl, default_ttl: Option<u64>) -> Option<i64> {
    let secs = match ttl {
        Ttl::Default => default_ttl,
        Ttl::NoExpiry => None,
        Ttl::ExpireAfter(secs) => Some(secs),
    };
    secs.map(|s| {
        let ms = i64::try_from(s.saturating_mul(1000)).unwrap_or(i64::MAX);
        now.saturating_add(ms)
    })
}

fn validate_bins(bins: &Bins) -> StoreResult<()> {
    if bins.is_empty() {
        return Err(StoreError::new(
            status::PARAMETER_ERROR,
            "record must contain at least one bin",
        ));
    }
    if let Some(name) = bins.keys().find(|name| name.len() > MAX_BIN_NAME_LEN) {
        return Err(StoreError::new(
            status::BIN_NAME_TOO_LONG,
            format!("bin name '{}' exceeds {} bytes", name, MAX_BIN_NAME_LEN),
        ));
    }
    Ok(())
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::new(
        status::CLIENT_ERROR,
        format!("Failed to acquire lock: {}", e),
    )
}

/// In-memory implementation of [`StoreClient`] using a BTreeMap.
///
/// Stores every record in memory and is useful for testing or embedding where
/// no cluster is available. It enforces the store constraints the connector
/// depends on: no empty records, bounded bin names, `RECORD_NOT_FOUND` for
/// missing keys, and rejection of operations before `connect`. Supports
/// TTL-based expiration via a configurable [`Clock`].
pub struct InMemoryStore {
    data: Arc<RwLock<BTreeMap<RecordKey, StoredRecord>>>,
    indexes: Arc<RwLock<BTreeMap<(String, String), IndexSpec>>>,
    connected: AtomicBool,
    reachable: AtomicBool,
    host: Host,
    clock: Arc<dyn Clock>,
    default_ttl: Option<u64>,
}

impl InMemoryStore {
    /// Creates a new, disconnected store with no records.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            indexes: Arc::new(RwLock::new(BTreeMap::new())),
            connected: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            host: Host {
                addr: "localhost".to_string(),
                port: 3000,
            },
            clock: Arc::new(WallClock),
            default_ttl: None,
        }
    }

    /// Creates a store that answers on the first seed host of `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut store = Self::new();
        if let Some(host) = config.hosts.first() {
            store.host = host.clone();
        }
        store
    }

    /// Creates a store whose `connect` always fails, as if no node answered.
    pub fn unreachable() -> Self {
        let store = Self::new();
        store.set_reachable(false);
        store
    }

    /// Controls whether subsequent `connect` calls succeed.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Sets a custom clock for TTL expiration checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the namespace default TTL (in seconds) for records written with [`Ttl::Default`].
    pub fn with_default_ttl(mut self, ttl: u64) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Returns the number of live records in a set.
    pub fn record_count(&self, namespace: &str, set: &str) -> StoreResult<usize> {
        let data = self.data.read().map_err(lock_error)?;
        let now = self.clock.now();
        Ok(data
            .iter()
            .filter(|(k, r)| k.namespace == namespace && k.set == set && !r.is_expired(now))
            .count())
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::new(
                status::CLIENT_ERROR,
                "client is not connected",
            ))
        }
    }

    fn describe_indexes(&self) -> StoreResult<String> {
        let indexes = self.indexes.read().map_err(lock_error)?;
        Ok(indexes
            .values()
            .map(|spec| {
                format!(
                    "ns={}:set={}:indexname={}:bin={}:type=STRING",
                    spec.namespace, spec.set, spec.index, spec.bin
                )
            })
            .collect::<Vec<_>>()
            .join(";"))
    }

    fn describe_namespaces(&self) -> StoreResult<String> {
        let data = self.data.read().map_err(lock_error)?;
        let mut namespaces: Vec<&str> = data.keys().map(|k| k.namespace.as_str()).collect();
        namespaces.dedup();
        Ok(namespaces.join(";"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn connect(&self) -> StoreResult<()> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                status::CONNECTION_ERROR,
                format!("failed to connect to {}", self.host),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, key: &RecordKey, bins: Bins, meta: RecordMeta) -> StoreResult<RecordKey> {
        self.ensure_connected()?;
        validate_bins(&bins)?;
        let mut data = self.data.write().map_err(lock_error)?;

        let now = self.clock.now();
        let generation = data
            .get(key)
            .filter(|r| !r.is_expired(now))
            .map_or(1, |r| r.generation + 1);
        let expire_ts = compute_expire_ts(now, meta.ttl, self.default_ttl);
        data.insert(
            key.clone(),
            StoredRecord {
                bins,
                generation,
                expire_ts,
            },
        );
        Ok(key.clone())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: &RecordKey) -> StoreResult<Record> {
        self.ensure_connected()?;
        let data = self.data.read().map_err(lock_error)?;

        let now = self.clock.now();
        match data.get(key) {
            Some(stored) if !stored.is_expired(now) => Ok(Record::new(
                key.clone(),
                stored.bins.clone(),
                stored.meta(now),
            )),
            _ => Err(StoreError::not_found(key)),
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn exists(&self, key: &RecordKey) -> StoreResult<RecordMeta> {
        self.ensure_connected()?;
        let data = self.data.read().map_err(lock_error)?;

        let now = self.clock.now();
        match data.get(key) {
            Some(stored) if !stored.is_expired(now) => Ok(stored.meta(now)),
            _ => Err(StoreError::not_found(key)),
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn remove(&self, key: &RecordKey) -> StoreResult<RecordKey> {
        self.ensure_connected()?;
        let mut data = self.data.write().map_err(lock_error)?;

        let now = self.clock.now();
        match data.remove(key) {
            Some(stored) if !stored.is_expired(now) => Ok(key.clone()),
            _ => Err(StoreError::not_found(key)),
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn query(
        &self,
        namespace: &str,
        set: &str,
        statement: Statement,
    ) -> StoreResult<Box<dyn RecordIterator + Send + 'static>> {
        self.ensure_connected()?;
        let data = self.data.read().map_err(lock_error)?;

        let now = self.clock.now();
        let records: Vec<Record> = data
            .iter()
            .filter(|(key, stored)| {
                key.namespace == namespace && key.set == set && !stored.is_expired(now)
            })
            .filter(|(_, stored)| {
                statement
                    .filters
                    .iter()
                    .all(|f| stored.bins.get(&f.bin) == Some(&f.value))
            })
            .map(|(key, stored)| {
                let bins = if statement.nobins {
                    Bins::new()
                } else {
                    stored.bins.clone()
                };
                Record::new(key.clone(), bins, stored.meta(now))
            })
            .collect();

        Ok(Box::new(InMemoryIterator { records, index: 0 }))
    }

    async fn create_string_index(&self, spec: IndexSpec) -> StoreResult<()> {
        self.ensure_connected()?;
        let mut indexes = self.indexes.write().map_err(lock_error)?;

        let id = (spec.namespace.clone(), spec.index.clone());
        if indexes.contains_key(&id) {
            return Err(StoreError::new(
                status::INDEX_FOUND,
                format!("index '{}' already exists", spec.index),
            ));
        }
        indexes.insert(id, spec);
        Ok(())
    }

    async fn info(&self, command: &str) -> StoreResult<InfoResponse> {
        self.ensure_connected()?;
        let response = match command {
            "status" => "ok".to_string(),
            "namespaces" => self.describe_namespaces()?,
            "sindex" => self.describe_indexes()?,
            other => {
                return Err(StoreError::new(
                    status::PARAMETER_ERROR,
                    format!("unknown info command '{}'", other),
                ));
            }
        };
        Ok(InfoResponse {
            host: self.host.clone(),
            response,
        })
    }
}

struct InMemoryIterator {
    records: Vec<Record>,
    index: usize,
}

#[async_trait]
impl RecordIterator for InMemoryIterator {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn next(&mut self) -> StoreResult<Option<Record>> {
        if self.index >= self.records.len() {
            Ok(None)
        } else {
            let record = self.records[self.index].clone();
            self.index += 1;
            Ok(Some(record))
        }
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StoreError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StoreError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StoreResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A client wrapper that delegates to an inner [`StoreClient`] but can inject
/// failures into `put`, `remove`, `info` and scans on demand.
///
/// Scan failures fire mid-stream: the iterator yields `after` records and then
/// the error, which exercises the "first stream error aborts" paths.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let store = FailingStore::wrap(Arc::new(InMemoryStore::new()));
/// store.fail_put(StoreError::new(13, "record too big"));
/// // every put now returns Err(...)
///
/// store.fail_scan_after(2, StoreError::new(9, "timeout"));
/// // the next scan yields two records, then the error
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStore {
    inner: Arc<dyn StoreClient>,
    fail_put: FailSlot,
    fail_remove: FailSlot,
    fail_info: FailSlot,
    fail_scan: arc_swap::ArcSwap<Option<(usize, StoreError)>>,
}

#[cfg(feature = "test-utils")]
impl FailingStore {
    /// Wraps an existing client, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn StoreClient>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_put: arc_swap::ArcSwap::from_pointee(None),
            fail_remove: arc_swap::ArcSwap::from_pointee(None),
            fail_info: arc_swap::ArcSwap::from_pointee(None),
            fail_scan: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes `put` return the given error on every subsequent call.
    pub fn fail_put(&self, err: StoreError) {
        self.fail_put
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `remove` return the given error on every subsequent call.
    pub fn fail_remove(&self, err: StoreError) {
        self.fail_remove
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `remove` return the given error on the next call only.
    pub fn fail_remove_once(&self, err: StoreError) {
        self.fail_remove.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `info` return the given error on every subsequent call.
    pub fn fail_info(&self, err: StoreError) {
        self.fail_info
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes the next scan fail after yielding `after` records.
    pub fn fail_scan_after(&self, after: usize, err: StoreError) {
        self.fail_scan.store(Arc::new(Some((after, err))));
    }

    /// Clears every injected failure.
    pub fn clear(&self) {
        self.fail_put.store(Arc::new(None));
        self.fail_remove.store(Arc::new(None));
        self.fail_info.store(Arc::new(None));
        self.fail_scan.store(Arc::new(None));
    }
}

#[cfg(feature = "test-utils")]
struct FailingIterator {
    inner: Box<dyn RecordIterator + Send + 'static>,
    remaining: usize,
    error: StoreError,
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl RecordIterator for FailingIterator {
    async fn next(&mut self) -> StoreResult<Option<Record>> {
        if self.remaining == 0 {
            return Err(self.error.clone());
        }
        self.remaining -= 1;
        self.inner.next().await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StoreClient for FailingStore {
    async fn connect(&self) -> StoreResult<()> {
        self.inner.connect().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }

    async fn put(&self, key: &RecordKey, bins: Bins, meta: RecordMeta) -> StoreResult<RecordKey> {
        check_failure(&self.fail_put)?;
        self.inner.put(key, bins, meta).await
    }

    async fn get(&self, key: &RecordKey) -> StoreResult<Record> {
        self.inner.get(key).await
    }

    async fn exists(&self, key: &RecordKey) -> StoreResult<RecordMeta> {
        self.inner.exists(key).await
    }

    async fn remove(&self, key: &RecordKey) -> StoreResult<RecordKey> {
        check_failure(&self.fail_remove)?;
        self.inner.remove(key).await
    }

    async fn query(
        &self,
        namespace: &str,
        set: &str,
        statement: Statement,
    ) -> StoreResult<Box<dyn RecordIterator + Send + 'static>> {
        let inner = self.inner.query(namespace, set, statement).await?;
        let failure = self.fail_scan.swap(Arc::new(None));
        match failure.as_ref() {
            Some((after, error)) => Ok(Box::new(FailingIterator {
                inner,
                remaining: *after,
                error: error.clone(),
            })),
            None => Ok(inner),
        }
    }

    async fn create_string_index(&self, spec: IndexSpec) -> StoreResult<()> {
        self.inner.create_string_index(spec).await
    }

    async fn info(&self, command: &str) -> StoreResult<InfoResponse> {
        check_failure(&self.fail_info)?;
        self.inner.info(command).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicI64;

    use super::*;
    use crate::storage::{BinValue, EqualityFilter, UserKey};

    /// Test clock that only moves when told to.
    struct ManualClock(AtomicI64);

    impl Clock for ManualClock {
        fn now(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn key(id: &str) -> RecordKey {
        RecordKey::new("test", "posts", UserKey::String(id.to_string()))
    }

    fn bins(pairs: &[(&str, BinValue)]) -> Bins {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    async fn connected_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.connect().await.unwrap();
        store
    }

    async fn collect(mut iter: Box<dyn RecordIterator + Send>) -> Vec<Record> {
        let mut records = vec![];
        while let Some(record) = iter.next().await.unwrap() {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn should_reject_operations_before_connect() {
        // given
        let store = InMemoryStore::new();

        // when
        let result = store.get(&key("a")).await;

        // then
        assert_eq!(result.unwrap_err().code, status::CLIENT_ERROR);
    }

    #[tokio::test]
    async fn should_fail_connect_when_unreachable() {
        // given
        let store = InMemoryStore::unreachable();

        // when
        let result = store.connect().await;

        // then
        assert_eq!(result.unwrap_err().code, status::CONNECTION_ERROR);
    }

    #[tokio::test]
    async fn should_return_not_found_when_key_missing() {
        // given
        let store = connected_store().await;

        // when
        let result = store.get(&key("missing")).await;

        // then
        let err = result.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn should_store_and_retrieve_record() {
        // given
        let store = connected_store().await;
        let record_bins = bins(&[("title", "Post1".into()), ("views", 3i64.into())]);

        // when
        store
            .put(&key("a"), record_bins.clone(), RecordMeta::default())
            .await
            .unwrap();
        let record = store.get(&key("a")).await.unwrap();

        // then
        assert_eq!(record.key, key("a"));
        assert_eq!(record.bins, record_bins);
        assert_eq!(record.meta.generation, 1);
    }

    #[tokio::test]
    async fn should_bump_generation_on_overwrite() {
        // given
        let store = connected_store().await;
        store
            .put(&key("a"), bins(&[("v", 1i64.into())]), RecordMeta::default())
            .await
            .unwrap();

        // when
        store
            .put(&key("a"), bins(&[("v", 2i64.into())]), RecordMeta::default())
            .await
            .unwrap();
        let record = store.get(&key("a")).await.unwrap();

        // then
        assert_eq!(record.meta.generation, 2);
        assert_eq!(record.bins.get("v"), Some(&BinValue::Int(2)));
    }

    #[tokio::test]
    async fn should_reject_empty_record() {
        // given
        let store = connected_store().await;

        // when
        let result = store
            .put(&key("a"), Bins::new(), RecordMeta::default())
            .await;

        // then
        assert_eq!(result.unwrap_err().code, status::PARAMETER_ERROR);
    }

    #[tokio::test]
    async fn should_reject_long_bin_name() {
        // given
        let store = connected_store().await;

        // when
        let result = store
            .put(
                &key("a"),
                bins(&[("a_very_long_bin_name", 1i64.into())]),
                RecordMeta::default(),
            )
            .await;

        // then
        assert_eq!(result.unwrap_err().code, status::BIN_NAME_TOO_LONG);
    }

    #[tokio::test]
    async fn should_remove_existing_record() {
        // given
        let store = connected_store().await;
        store
            .put(&key("a"), bins(&[("v", 1i64.into())]), RecordMeta::default())
            .await
            .unwrap();

        // when
        store.remove(&key("a")).await.unwrap();

        // then
        assert!(store.exists(&key("a")).await.unwrap_err().is_not_found());
        assert!(store.remove(&key("a")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn should_expire_records_after_ttl() {
        // given
        let clock = Arc::new(ManualClock(AtomicI64::new(1_000)));
        let store = InMemoryStore::new().with_clock(clock.clone());
        store.connect().await.unwrap();
        store
            .put(
                &key("a"),
                bins(&[("v", 1i64.into())]),
                RecordMeta::with_ttl(Ttl::ExpireAfter(10)),
            )
            .await
            .unwrap();

        // when
        let before = store.exists(&key("a")).await;
        clock.0.store(11_000, Ordering::SeqCst);
        let after = store.exists(&key("a")).await;

        // then
        assert_eq!(before.unwrap().ttl, Ttl::ExpireAfter(10));
        assert!(after.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn should_saturate_oversized_ttl() {
        // given
        let clock = Arc::new(ManualClock(AtomicI64::new(1_000)));
        let store = InMemoryStore::new().with_clock(clock.clone());
        store.connect().await.unwrap();

        // when
        store
            .put(
                &key("a"),
                bins(&[("v", 1i64.into())]),
                RecordMeta::with_ttl(Ttl::ExpireAfter(u64::MAX / 10)),
            )
            .await
            .unwrap();
        clock.0.store(i64::MAX / 2, Ordering::SeqCst);

        // then
        assert!(store.get(&key("a")).await.is_ok());
    }

    #[tokio::test]
    async fn should_apply_default_ttl() {
        // given
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let store = InMemoryStore::new()
            .with_clock(clock.clone())
            .with_default_ttl(5);
        store.connect().await.unwrap();

        // when
        store
            .put(&key("a"), bins(&[("v", 1i64.into())]), RecordMeta::default())
            .await
            .unwrap();
        clock.0.store(5_000, Ordering::SeqCst);

        // then
        assert!(store.get(&key("a")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn should_query_set_with_equality_filters() {
        // given
        let store = connected_store().await;
        store
            .put(
                &key("a"),
                bins(&[("title", "My Post".into()), ("content", "Hello".into())]),
                RecordMeta::default(),
            )
            .await
            .unwrap();
        store
            .put(
                &key("b"),
                bins(&[("title", "Other".into()), ("content", "Hello".into())]),
                RecordMeta::default(),
            )
            .await
            .unwrap();
        store
            .put(
                &RecordKey::new("test", "users", UserKey::String("c".to_string())),
                bins(&[("title", "My Post".into())]),
                RecordMeta::default(),
            )
            .await
            .unwrap();
        let statement = Statement {
            filters: vec![
                EqualityFilter::new("title", "My Post".into()),
                EqualityFilter::new("content", "Hello".into()),
            ],
            ..Default::default()
        };

        // when
        let iter = store.query("test", "posts", statement).await.unwrap();
        let records = collect(iter).await;

        // then
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, key("a"));
    }

    #[tokio::test]
    async fn should_omit_bins_when_requested() {
        // given
        let store = connected_store().await;
        store
            .put(&key("a"), bins(&[("v", 1i64.into())]), RecordMeta::default())
            .await
            .unwrap();
        let statement = Statement {
            nobins: true,
            ..Default::default()
        };

        // when
        let iter = store.query("test", "posts", statement).await.unwrap();
        let records = collect(iter).await;

        // then
        assert_eq!(records.len(), 1);
        assert!(records[0].bins.is_empty());
    }

    #[tokio::test]
    async fn should_not_see_writes_after_query_started() {
        // given
        let store = connected_store().await;
        store
            .put(&key("a"), bins(&[("v", 1i64.into())]), RecordMeta::default())
            .await
            .unwrap();
        let iter = store
            .query("test", "posts", Statement::default())
            .await
            .unwrap();

        // when
        store
            .put(&key("b"), bins(&[("v", 2i64.into())]), RecordMeta::default())
            .await
            .unwrap();
        let records = collect(iter).await;

        // then
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn should_reject_duplicate_index() {
        // given
        let store = connected_store().await;
        let spec = IndexSpec {
            namespace: "test".to_string(),
            set: "posts".to_string(),
            bin: "name".to_string(),
            index: "posts_name_idx".to_string(),
        };
        store.create_string_index(spec.clone()).await.unwrap();

        // when
        let result = store.create_string_index(spec).await;

        // then
        assert_eq!(result.unwrap_err().code, status::INDEX_FOUND);
        let info = store.info("sindex").await.unwrap();
        assert!(info.response.contains("indexname=posts_name_idx"));
    }

    #[tokio::test]
    async fn should_answer_status_info() {
        // given
        let store = connected_store().await;

        // when
        let info = store.info("status").await.unwrap();

        // then
        assert_eq!(info.response, "ok");
        assert_eq!(info.host.port, 3000);
    }

    #[tokio::test]
    async fn should_reject_unknown_info_command() {
        // given
        let store = connected_store().await;

        // when
        let result = store.info("bogus").await;

        // then
        assert_eq!(result.unwrap_err().code, status::PARAMETER_ERROR);
    }
}
