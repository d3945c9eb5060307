//! Document to bin encoding.
//!
//! The store has no boolean bin type and refuses records without bins, so
//! booleans are written as `1`/`0` and an empty document is written as a
//! single sentinel bin.

use common::{BinValue, Bins, RecordKey};

use crate::error::{Error, Result};
use crate::keys::id_value;
use crate::model::{Document, FieldType, Value};
use crate::registry::ModelDefinition;

/// Name of the bin written for documents without user fields.
pub const SENTINEL_BIN: &str = "__empty";

fn sentinel() -> Bins {
    Bins::from([(SENTINEL_BIN.to_string(), BinValue::Int(1))])
}

/// Rejects documents that write the sentinel bin as a user field.
pub fn check_reserved(doc: &Document) -> Result<()> {
    if doc.contains(SENTINEL_BIN) {
        return Err(Error::InvalidInput(format!(
            "'{}' is reserved for empty documents",
            SENTINEL_BIN
        )));
    }
    Ok(())
}

/// Encodes a document into bins.
///
/// The identity field is dropped unless `keep_id` is set.
pub fn encode(model: &ModelDefinition, doc: &Document, keep_id: bool) -> Bins {
    let bins: Bins = doc
        .iter()
        .filter(|(field, _)| keep_id || **field != model.id_name)
        .map(|(field, value)| (field.clone(), to_bin(value)))
        .collect();
    if bins.is_empty() { sentinel() } else { bins }
}

/// Decodes a record's bins into a document, taking the id from `key`.
///
/// Integers become booleans only for properties declared as
/// [`FieldType::Boolean`]; undeclared fields keep the stored integer.
pub fn decode(model: &ModelDefinition, bins: Bins, key: &RecordKey) -> Document {
    let mut doc: Document = bins
        .into_iter()
        .filter(|(name, _)| name != SENTINEL_BIN)
        .map(|(name, bin)| {
            let value = from_bin(model.field_type(&name), bin);
            (name, value)
        })
        .collect();

    let id = id_value(&key.key);
    if let Some(alias) = model.id_alias() {
        doc.insert(alias, id.clone());
    }
    doc.insert(model.id_name.clone(), id);
    doc
}

/// Returns true if `bins` is exactly the empty-document sentinel.
pub fn is_sentinel_only(bins: &Bins) -> bool {
    bins.len() == 1 && bins.contains_key(SENTINEL_BIN)
}

pub(crate) fn to_bin(value: &Value) -> BinValue {
    match value {
        Value::String(s) => BinValue::String(s.clone()),
        Value::Int64(v) => BinValue::Int(*v),
        Value::Float64(v) => BinValue::Float(*v),
        Value::Bool(b) => BinValue::Int(i64::from(*b)),
        Value::Bytes(b) => BinValue::Bytes(b.clone()),
    }
}

fn from_bin(declared: Option<FieldType>, bin: BinValue) -> Value {
    match (declared, bin) {
        (Some(FieldType::Boolean), BinValue::Int(v)) => Value::Bool(v != 0),
        (_, BinValue::Int(v)) => Value::Int64(v),
        (_, BinValue::Float(v)) => Value::Float64(v),
        (_, BinValue::String(s)) => Value::String(s),
        (_, BinValue::Bytes(b)) => Value::Bytes(b),
    }
}
