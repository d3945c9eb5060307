//! Public API types for connector operations.
//!
//! Documents are the ORM-facing shape of a record: an ordered map of field
//! names to scalar [`Value`]s. Filters and `where` clauses keep the ORM's JSON
//! shape so they can be deserialized straight from a request body.

use std::collections::BTreeMap;

use bytes::Bytes;
use common::RecordKey;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Bytes(Bytes),
}

impl Value {
    /// Converts a JSON scalar. Returns `None` for `null`, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(v) => Some(Value::Int64(v)),
                None => n.as_f64().map(Value::Float64),
            },
            _ => None,
        }
    }

    /// Converts to JSON. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Value::from(*v),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Bytes(b) => serde_json::Value::from(b.to_vec()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

/// Declared type of a model property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Bytes,
}

/// A model instance: field name to value, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Builds a document from a JSON object.
    ///
    /// `null` fields are skipped; nested arrays and objects are rejected
    /// because the store only holds scalar bins.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidInput(format!("document must be a JSON object, got {}", value))
        })?;
        let mut doc = Document::new();
        for (field, v) in object {
            if v.is_null() {
                continue;
            }
            let value = Value::from_json(v).ok_or_else(|| {
                Error::InvalidInput(format!("field '{}' is not a scalar value", field))
            })?;
            doc.insert(field.clone(), value);
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(field, value)| (field.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow merge: every field of `other` overwrites the same field here.
    pub fn merge(&mut self, other: Document) {
        self.0.extend(other.0);
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A `where` clause in the ORM's JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Where(serde_json::Map<String, serde_json::Value>);

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON value, which must be an object.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Where(map)),
            other => Err(Error::InvalidInput(format!(
                "where must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Builder-style equality constraint.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into().to_json());
        self
    }

    /// Builder-style `and` of clause sets.
    pub fn and(mut self, clauses: Vec<Where>) -> Self {
        let clauses = clauses
            .into_iter()
            .map(|w| serde_json::Value::Object(w.0))
            .collect();
        self.0
            .insert("and".to_string(), serde_json::Value::Array(clauses));
        self
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// Query options for `all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "where", default)]
    pub where_clause: Option<Where>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub order: Option<serde_json::Value>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_where(mut self, where_clause: Where) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Ids addressed by `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum IdSelector {
    One(Value),
    /// An `{inq: [...]}` id set.
    In(Vec<Value>),
}

impl From<Value> for IdSelector {
    fn from(id: Value) -> Self {
        IdSelector::One(id)
    }
}

impl From<&str> for IdSelector {
    fn from(id: &str) -> Self {
        IdSelector::One(id.into())
    }
}

impl From<String> for IdSelector {
    fn from(id: String) -> Self {
        IdSelector::One(id.into())
    }
}

/// Result of `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    One(Option<Document>),
    /// One slot per requested id, in request order.
    Many(Vec<Option<Document>>),
}

impl Found {
    /// Returns the single document of a [`Found::One`], or the first slot of a
    /// [`Found::Many`].
    pub fn one(self) -> Option<Document> {
        match self {
            Found::One(doc) => doc,
            Found::Many(docs) => docs.into_iter().next().flatten(),
        }
    }

    /// Returns every found document, dropping missing slots.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Found::One(doc) => doc.into_iter().collect(),
            Found::Many(docs) => docs.into_iter().flatten().collect(),
        }
    }
}

/// Result of destroy operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub count: u64,
}

impl Count {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

/// Record addressed by `destroy`.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A raw id, resolved against the model.
    Id(Value),
    /// An already-resolved key.
    Key(RecordKey),
}

impl From<RecordKey> for Target {
    fn from(key: RecordKey) -> Self {
        Target::Key(key)
    }
}

impl From<Value> for Target {
    fn from(id: Value) -> Self {
        Target::Id(id)
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Id(id.into())
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Target::Id(id.into())
    }
}
