//! Record key derivation.
//!
//! A document's id never lives in a bin: it is the user key of the record.
//! Resolving a key therefore strips the identity field (and the id alias)
//! from the document being written.

use common::{RecordKey, UserKey};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};
use crate::model::{Document, Value};
use crate::registry::ModelDefinition;

/// Length of generated ids in bytes, before hex encoding.
const GENERATED_ID_LEN: usize = 20;

/// Returns the `(namespace, set)` a model's records live in.
pub fn resolve_target(default_namespace: &str, model: &ModelDefinition) -> (String, String) {
    let namespace = model
        .config
        .namespace
        .clone()
        .unwrap_or_else(|| default_namespace.to_string());
    (namespace, model.set_name().to_string())
}

/// Derives the record key for `data`, removing the id fields from it.
///
/// The id alias takes precedence over the identity field when both are
/// present. A missing or empty id is replaced with a generated one.
pub fn resolve_key(
    default_namespace: &str,
    model: &ModelDefinition,
    data: &mut Document,
) -> Result<RecordKey> {
    let (namespace, set) = resolve_target(default_namespace, model);

    let aliased = model.id_alias().and_then(|alias| data.remove(alias));
    let identity = data.remove(&model.id_name);
    let id = match aliased.or(identity) {
        Some(Value::String(s)) if s.is_empty() => None,
        other => other,
    };

    let key = match id {
        Some(id) => user_key(id)?,
        None => UserKey::String(generate_id()),
    };
    Ok(RecordKey::new(namespace, set, key))
}

/// Derives the record key for a bare id.
pub fn key_for_id(
    default_namespace: &str,
    model: &ModelDefinition,
    id: &Value,
) -> Result<RecordKey> {
    let mut data = Document::new().with(model.id_name.clone(), id.clone());
    resolve_key(default_namespace, model, &mut data)
}

/// Converts a record's user key back into a document id.
pub fn id_value(key: &UserKey) -> Value {
    match key {
        UserKey::String(s) => Value::String(s.clone()),
        UserKey::Int(v) => Value::Int64(*v),
        UserKey::Bytes(b) => Value::Bytes(b.clone()),
    }
}

/// Generates a random id: 20 bytes from the OS CSPRNG, hex encoded.
pub fn generate_id() -> String {
    let mut bytes = [0u8; GENERATED_ID_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn user_key(id: Value) -> Result<UserKey> {
    match id {
        Value::String(s) => Ok(UserKey::String(s)),
        Value::Int64(v) => Ok(UserKey::Int(v)),
        Value::Bytes(b) => Ok(UserKey::Bytes(b)),
        other => Err(Error::InvalidKey(format!(
            "{:?} cannot be used as a record key",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelConfig;

    fn aliased_model() -> ModelDefinition {
        ModelDefinition::new("Post").with_config(ModelConfig {
            set: Some("posts".to_string()),
            namespace: Some("bar".to_string()),
            id_field: Some("title".to_string()),
            ttl: None,
        })
    }

    #[test]
    fn should_use_identity_field_and_strip_it() {
        // given
        let model = ModelDefinition::new("Post");
        let mut data = Document::new().with("id", "foo").with("title", "Post2");

        // when
        let key = resolve_key("test", &model, &mut data).unwrap();

        // then
        assert_eq!(key, RecordKey::new("test", "Post", UserKey::String("foo".to_string())));
        assert_eq!(data, Document::new().with("title", "Post2"));
    }

    #[test]
    fn should_prefer_alias_and_override_target() {
        // given
        let model = aliased_model();
        let mut data = Document::new()
            .with("id", "ignored")
            .with("title", "Post1")
            .with("content", "c");

        // when
        let key = resolve_key("test", &model, &mut data).unwrap();

        // then
        assert_eq!(key.namespace, "bar");
        assert_eq!(key.set, "posts");
        assert_eq!(key.key, UserKey::String("Post1".to_string()));
        assert_eq!(data, Document::new().with("content", "c"));
    }

    #[test]
    fn should_fall_back_to_identity_field_when_alias_absent() {
        // given
        let model = aliased_model();
        let mut data = Document::new().with("id", "foo");

        // when
        let key = resolve_key("test", &model, &mut data).unwrap();

        // then
        assert_eq!(key.key, UserKey::String("foo".to_string()));
        assert!(data.is_empty());
    }

    #[test]
    fn should_generate_id_when_missing_or_empty() {
        // given
        let model = ModelDefinition::new("Post");
        let mut missing = Document::new().with("title", "a");
        let mut empty = Document::new().with("id", "");

        // when
        let first = resolve_key("test", &model, &mut missing).unwrap();
        let second = resolve_key("test", &model, &mut empty).unwrap();

        // then
        for key in [&first, &second] {
            let id = key.key.as_str().unwrap();
            assert_eq!(id.len(), 40);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
        assert_ne!(first.key, second.key);
    }

    #[test]
    fn should_keep_integer_ids_as_integer_keys() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let key = key_for_id("test", &model, &Value::Int64(7)).unwrap();

        // then
        assert_eq!(key.key, UserKey::Int(7));
        assert_eq!(id_value(&key.key), Value::Int64(7));
    }

    #[test]
    fn should_reject_boolean_id() {
        // given
        let model = ModelDefinition::new("Post");

        // when
        let result = key_for_id("test", &model, &Value::Bool(true));

        // then
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }
}
