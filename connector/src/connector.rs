//! The ORM-facing connector.

use std::sync::Arc;

use async_trait::async_trait;
use common::{IndexSpec, RecordKey, StoreClient};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::codec::{check_reserved, decode, encode};
use crate::config::Settings;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::filter::translate;
use crate::keys::{id_value, key_for_id, resolve_key, resolve_target};
use crate::model::{Count, Document, FieldType, Filter, Found, IdSelector, Target, Value, Where};
use crate::registry::{ModelDefinition, ModelRegistry};
use crate::scan::{DocumentIterator, record_stream};
use crate::storage::RecordStorage;

/// Connector type names reported to the ORM.
pub const TYPES: [&str; 3] = ["db", "nosql", "aerospike"];

/// Persistence operations the ORM drives through a data source.
///
/// Every operation addresses records of a named model; unregistered model
/// names use a default definition.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Returns true if the store answers a status request.
    async fn ping(&self) -> bool;

    /// Creates the secondary index of each named model, or of every
    /// registered model when `models` is `None`.
    async fn autoupdate(&self, models: Option<&[&str]>) -> Result<()>;

    /// Writes a new record and returns its id.
    async fn create(&self, model: &str, data: Document) -> Result<Value>;

    async fn save(&self, model: &str, data: Document) -> Result<Value> {
        self.create(model, data).await
    }

    async fn exists(&self, model: &str, id: &Value) -> Result<bool>;

    async fn find(&self, model: &str, ids: IdSelector) -> Result<Found>;

    async fn destroy(&self, model: &str, target: Target) -> Result<Count>;

    async fn all(&self, model: &str, filter: &Filter) -> Result<Vec<Document>>;

    async fn destroy_all(&self, model: &str, where_clause: Option<&Where>) -> Result<Count>;

    async fn count(&self, model: &str, where_clause: Option<&Where>) -> Result<u64>;

    /// Merges `data` into the stored document and returns the result.
    async fn update_attributes(&self, model: &str, id: &Value, data: Document)
    -> Result<Document>;

    /// Overwrites the record addressed by `where_clause`, which must be an id
    /// equality.
    async fn update(&self, model: &str, where_clause: &Where, data: Document) -> Result<Count>;

    async fn update_all(&self, model: &str, where_clause: &Where, data: Document) -> Result<Count> {
        self.update(model, where_clause, data).await
    }

    fn types(&self) -> &'static [&'static str] {
        &TYPES
    }

    fn default_id_type(&self) -> FieldType {
        FieldType::String
    }
}

/// How a `where` clause reaches its records.
#[derive(Debug, PartialEq)]
enum Lookup {
    /// Point lookup by id.
    One(Value),
    /// Point lookups for an id set.
    In(Vec<Value>),
    /// Filtered scan.
    Scan,
}

/// Classifies `where_clause` by whether it addresses records by id.
fn classify(model: &ModelDefinition, where_clause: Option<&Where>) -> Result<Lookup> {
    let Some(where_clause) = where_clause else {
        return Ok(Lookup::Scan);
    };
    let Some((field, value)) = where_clause.iter().find(|(f, _)| model.is_identity(f)) else {
        return Ok(Lookup::Scan);
    };
    if where_clause.len() > 1 {
        return Err(Error::UnsupportedQuery(format!(
            "'{}' is the record key and cannot be combined with other constraints",
            field
        )));
    }

    if let Some(id) = Value::from_json(value) {
        return Ok(Lookup::One(id));
    }
    let ids = value
        .as_object()
        .filter(|op| op.len() == 1)
        .and_then(|op| op.get("inq"))
        .and_then(|inq| inq.as_array())
        .ok_or_else(|| {
            Error::UnsupportedQuery(format!(
                "'{}' only supports equality or {{inq: [...]}}, got {}",
                field, value
            ))
        })?;
    let ids = ids
        .iter()
        .map(|id| {
            Value::from_json(id).ok_or_else(|| {
                Error::UnsupportedQuery(format!("'{}' inq entries must be scalars", field))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Lookup::In(ids))
}

/// Connector over an Aerospike-style record store.
///
/// Owns one shared client. Multi-record operations scan and then fan out
/// single-key operations, at most `max_fanout` at a time.
pub struct AerospikeConnector {
    settings: Settings,
    storage: RecordStorage,
    connection: Connection,
    registry: ModelRegistry,
}

impl AerospikeConnector {
    /// Creates a connector over `client`. The client is not connected yet.
    pub fn new(settings: Settings, client: Arc<dyn StoreClient>) -> Result<Self> {
        settings.validate()?;
        let storage = RecordStorage::new(client);
        Ok(Self {
            settings,
            connection: Connection::new(storage.clone()),
            storage,
            registry: ModelRegistry::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registers or replaces a model definition.
    pub fn define_model(&self, definition: ModelDefinition) -> Result<()> {
        debug!(model = %definition.name, "define model");
        self.registry.register(definition)
    }

    pub fn model(&self, name: &str) -> Result<Arc<ModelDefinition>> {
        self.registry.get(name)
    }

    /// Opens a streaming scan over the records matching `where_clause`.
    ///
    /// Identity constraints are not scannable; use `find` for them.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub async fn scan(&self, model: &str, where_clause: Option<&Where>) -> Result<DocumentIterator> {
        let definition = self.model(model)?;
        let filters = translate(&definition, where_clause)?;
        let (namespace, set) = resolve_target(&self.settings.namespace, &definition);
        let iter = self
            .storage
            .query(&namespace, &set, filters.into_statement())
            .await?;
        Ok(DocumentIterator::new(iter, definition))
    }

    fn key_for(&self, model: &ModelDefinition, id: &Value) -> Result<RecordKey> {
        key_for_id(&self.settings.namespace, model, id)
    }

    async fn find_one(&self, model: &ModelDefinition, id: &Value) -> Result<Option<Document>> {
        let key = self.key_for(model, id)?;
        let record = self.storage.get(&key).await?;
        Ok(record.map(|r| decode(model, r.bins, &r.key)))
    }

    /// Looks up every id, keeping request order and duplicates.
    async fn find_many(
        &self,
        model: &Arc<ModelDefinition>,
        ids: &[Value],
    ) -> Result<Vec<Option<Document>>> {
        let keys = ids
            .iter()
            .map(|id| self.key_for(model, id))
            .collect::<Result<Vec<_>>>()?;
        let storage = self.storage.clone();
        let model = Arc::clone(model);
        futures::stream::iter(keys.into_iter().map(move |key| {
            let storage = storage.clone();
            let model = Arc::clone(&model);
            async move {
                let record = storage.get(&key).await?;
                Ok::<_, Error>(record.map(|r| decode(&model, r.bins, &r.key)))
            }
        }))
        .buffered(self.settings.max_fanout)
        .try_collect()
        .await
    }

    /// Removes each key, at most `max_fanout` at a time.
    async fn remove_all(&self, keys: Vec<RecordKey>) -> Result<()> {
        let storage = self.storage.clone();
        futures::stream::iter(keys.into_iter().map(move |key| {
            let storage = storage.clone();
            async move { storage.remove(&key).await }
        }))
        .buffer_unordered(self.settings.max_fanout)
        .try_for_each(|_| async { Ok(()) })
        .await
    }

    async fn autoupdate_model(&self, name: &str) -> Result<()> {
        let definition = self.model(name)?;
        let (namespace, set) = resolve_target(&self.settings.namespace, &definition);
        let bin = self.settings.index_bin.clone();
        let spec = IndexSpec {
            index: format!("{}_{}_idx", set, bin),
            namespace,
            set,
            bin,
        };
        let index = spec.index.clone();
        if self.storage.create_string_index(spec).await? {
            debug!(model = %name, index = %index, "index created");
        } else {
            debug!(model = %name, index = %index, "index already exists");
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for AerospikeConnector {
    async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect().await
    }

    async fn ping(&self) -> bool {
        self.connection.ping().await
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn autoupdate(&self, models: Option<&[&str]>) -> Result<()> {
        if !self.connection.is_connected().await {
            debug!("waiting for connection before autoupdate");
            self.connection
                .wait_connected(self.settings.connection_timeout())
                .await?;
        }

        let names = match models {
            Some(models) => models.iter().map(|m| m.to_string()).collect(),
            None => self.registry.names()?,
        };
        for name in names {
            if let Err(e) = self.autoupdate_model(&name).await {
                warn!(model = %name, error = %e, "skipping index creation");
            }
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn create(&self, model: &str, mut data: Document) -> Result<Value> {
        check_reserved(&data)?;
        let definition = self.model(model)?;
        let key = resolve_key(&self.settings.namespace, &definition, &mut data)?;
        require_string_key(&key)?;
        let bins = encode(&definition, &data, false);
        self.storage.put(&key, bins, definition.ttl()).await?;
        Ok(id_value(&key.key))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn exists(&self, model: &str, id: &Value) -> Result<bool> {
        let definition = self.model(model)?;
        let key = self.key_for(&definition, id)?;
        self.storage.exists(&key).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn find(&self, model: &str, ids: IdSelector) -> Result<Found> {
        let definition = self.model(model)?;
        match ids {
            IdSelector::One(id) => Ok(Found::One(self.find_one(&definition, &id).await?)),
            IdSelector::In(ids) => Ok(Found::Many(self.find_many(&definition, &ids).await?)),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn destroy(&self, model: &str, target: Target) -> Result<Count> {
        let key = match target {
            Target::Key(key) => key,
            Target::Id(id) => {
                let definition = self.model(model)?;
                self.key_for(&definition, &id)?
            }
        };
        let removed = self.storage.remove(&key).await?;
        Ok(Count::new(u64::from(removed)))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn all(&self, model: &str, filter: &Filter) -> Result<Vec<Document>> {
        if filter.order.is_some() {
            return Err(Error::UnsupportedQuery("order is not supported".to_string()));
        }
        if filter.offset.is_some() || filter.skip.is_some() {
            return Err(Error::UnsupportedQuery(
                "offset and skip are not supported".to_string(),
            ));
        }

        let definition = self.model(model)?;
        let where_clause = filter.where_clause.as_ref();
        let mut docs: Vec<Document> = match classify(&definition, where_clause)? {
            Lookup::One(id) => self.find_one(&definition, &id).await?.into_iter().collect(),
            Lookup::In(ids) => self
                .find_many(&definition, &ids)
                .await?
                .into_iter()
                .flatten()
                .collect(),
            Lookup::Scan => self.scan(model, where_clause).await?.collect().await?,
        };
        if let Some(limit) = filter.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn destroy_all(&self, model: &str, where_clause: Option<&Where>) -> Result<Count> {
        let definition = self.model(model)?;

        if where_clause.is_none_or(|w| w.is_empty()) {
            let (namespace, set) = resolve_target(&self.settings.namespace, &definition);
            let statement = translate(&definition, None)?.with_nobins().into_statement();
            let iter = self.storage.query(&namespace, &set, statement).await?;
            let storage = self.storage.clone();
            let count = record_stream(iter)
                .map_ok(move |record| {
                    let storage = storage.clone();
                    async move { storage.remove(&record.key).await }
                })
                .try_buffer_unordered(self.settings.max_fanout)
                .try_fold(0u64, |count, _| async move { Ok(count + 1) })
                .await?;
            debug!(count, "destroyed all records");
            return Ok(Count::new(count));
        }

        let filter = Filter {
            where_clause: where_clause.cloned(),
            ..Default::default()
        };
        let docs = self.all(model, &filter).await?;
        let keys = docs
            .iter()
            .map(|doc| {
                let id = doc.get(&definition.id_name).ok_or_else(|| {
                    Error::Internal("decoded document has no identity field".to_string())
                })?;
                self.key_for(&definition, id)
            })
            .collect::<Result<Vec<_>>>()?;
        let count = keys.len() as u64;
        self.remove_all(keys).await?;
        debug!(count, "destroyed matching records");
        Ok(Count::new(count))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn count(&self, model: &str, where_clause: Option<&Where>) -> Result<u64> {
        let definition = self.model(model)?;
        match classify(&definition, where_clause)? {
            Lookup::One(id) => {
                let key = self.key_for(&definition, &id)?;
                Ok(u64::from(self.storage.exists(&key).await?))
            }
            Lookup::In(ids) => {
                let mut unique = Vec::with_capacity(ids.len());
                for id in ids {
                    if !unique.contains(&id) {
                        unique.push(id);
                    }
                }
                let found = self.find_many(&definition, &unique).await?;
                Ok(found.iter().flatten().count() as u64)
            }
            Lookup::Scan => {
                let (namespace, set) = resolve_target(&self.settings.namespace, &definition);
                let statement = translate(&definition, where_clause)?
                    .with_nobins()
                    .into_statement();
                let iter = self.storage.query(&namespace, &set, statement).await?;
                record_stream(iter)
                    .try_fold(0u64, |count, _| async move { Ok(count + 1) })
                    .await
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn update_attributes(
        &self,
        model: &str,
        id: &Value,
        mut data: Document,
    ) -> Result<Document> {
        check_reserved(&data)?;
        let definition = self.model(model)?;
        let key = self.key_for(&definition, id)?;
        require_string_key(&key)?;
        let mut current = self.find_one(&definition, id).await?.ok_or_else(|| {
            Error::NotFound(format!("no {} with id {:?}", definition.name, id))
        })?;

        data.remove(&definition.id_name);
        if let Some(alias) = definition.id_alias() {
            data.remove(alias);
        }
        current.merge(data);

        let bins = encode(&definition, &without_identity(&definition, &current), false);
        self.storage.put(&key, bins, definition.ttl()).await?;
        Ok(current)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    async fn update(&self, model: &str, where_clause: &Where, mut data: Document) -> Result<Count> {
        let definition = self.model(model)?;
        let Lookup::One(id) = classify(&definition, Some(where_clause))? else {
            return Err(Error::UnsupportedQuery(
                "update only supports a where clause of the form {id: value}".to_string(),
            ));
        };

        if let Some(alias) = definition.id_alias() {
            data.remove(alias);
        }
        data.insert(definition.id_name.clone(), id);
        self.create(model, data).await?;
        Ok(Count::new(1))
    }
}

fn require_string_key(key: &RecordKey) -> Result<()> {
    if key.key.is_string() {
        return Ok(());
    }
    Err(Error::InvalidKey(format!(
        "key {} is not a string; advanced key types need filtered delete support",
        key
    )))
}

fn without_identity(model: &ModelDefinition, doc: &Document) -> Document {
    doc.iter()
        .filter(|(field, _)| !model.is_identity(field))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use common::{InMemoryStore, RecordMeta, StoreClient};
    use serde_json::json;

    use super::*;
    use crate::registry::ModelConfig;

    async fn connector() -> AerospikeConnector {
        let connector =
            AerospikeConnector::new(Settings::default(), Arc::new(InMemoryStore::new())).unwrap();
        connector.connect().await.unwrap();
        connector
    }

    fn where_of(value: serde_json::Value) -> Where {
        Where::from_json(value).unwrap()
    }

    #[test]
    fn should_classify_id_equality_as_point_lookup() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let lookup = classify(&model, Some(&where_of(json!({"id": "a"})))).unwrap();

        // then
        assert_eq!(lookup, Lookup::One(Value::from("a")));
    }

    #[test]
    fn should_classify_inq_as_id_set() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let lookup = classify(&model, Some(&where_of(json!({"id": {"inq": ["a", "b"]}})))).unwrap();

        // then
        assert_eq!(
            lookup,
            Lookup::In(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn should_classify_alias_as_point_lookup() {
        // given
        let model = ModelDefinition::new("Post").with_config(ModelConfig {
            id_field: Some("title".to_string()),
            ..Default::default()
        });

        // when
        let lookup = classify(&model, Some(&where_of(json!({"title": "Post1"})))).unwrap();

        // then
        assert_eq!(lookup, Lookup::One(Value::from("Post1")));
    }

    #[test]
    fn should_reject_id_combined_with_other_fields() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let result = classify(&model, Some(&where_of(json!({"id": "a", "title": "b"}))));

        // then
        assert!(matches!(result, Err(Error::UnsupportedQuery(_))));
    }

    #[test]
    fn should_reject_id_range() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let result = classify(&model, Some(&where_of(json!({"id": {"gt": "a"}}))));

        // then
        assert!(matches!(result, Err(Error::UnsupportedQuery(_))));
    }

    #[tokio::test]
    async fn should_reject_integer_key_on_create() {
        // given
        let connector = connector().await;

        // when
        let result = connector
            .create("Post", Document::new().with("id", 7i64))
            .await;

        // then
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[tokio::test]
    async fn should_reject_integer_key_on_update_attributes() {
        // given
        let store = Arc::new(InMemoryStore::new());
        let connector = AerospikeConnector::new(Settings::default(), store.clone()).unwrap();
        connector.connect().await.unwrap();
        let key = key_for_id("test", &ModelDefinition::new("Post"), &Value::Int64(7)).unwrap();
        let bins = encode(&ModelDefinition::new("Post"), &Document::new(), false);
        store.put(&key, bins, RecordMeta::default()).await.unwrap();

        // when
        let result = connector
            .update_attributes("Post", &Value::Int64(7), Document::new().with("title", "b"))
            .await;

        // then
        assert!(matches!(result, Err(Error::InvalidKey(_))));
        let record = store.get(&key).await.unwrap();
        assert!(!record.bins.contains_key("title"));
    }

    #[tokio::test]
    async fn should_reject_sentinel_field_on_write() {
        // given
        let connector = connector().await;
        let id = connector
            .create("Post", Document::new().with("title", "a"))
            .await
            .unwrap();

        // when
        let created = connector
            .create("Post", Document::new().with("__empty", 5i64).with("title", "x"))
            .await;
        let updated = connector
            .update_attributes("Post", &id, Document::new().with("__empty", 5i64))
            .await;

        // then
        assert!(matches!(created, Err(Error::InvalidInput(_))));
        assert!(matches!(updated, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_return_not_found_when_updating_missing_record() {
        // given
        let connector = connector().await;

        // when
        let result = connector
            .update_attributes("Post", &Value::from("missing"), Document::new())
            .await;

        // then
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn should_count_zero_when_destroying_missing_record() {
        // given
        let connector = connector().await;

        // when
        let count = connector.destroy("Post", "missing".into()).await.unwrap();

        // then
        assert_eq!(count, Count::new(0));
    }

    #[tokio::test]
    async fn should_report_connector_types() {
        // given
        let connector = connector().await;

        // then
        assert_eq!(connector.types(), &["db", "nosql", "aerospike"]);
        assert_eq!(connector.default_id_type(), FieldType::String);
    }
}
