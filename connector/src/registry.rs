//! Model definitions and the registry that validates them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use common::Ttl;
use common::storage::{MAX_BIN_NAME_LEN, MAX_NAMESPACE_LEN, MAX_SET_NAME_LEN, MAX_TTL_SECS};
use serde::{Deserialize, Serialize};

use crate::codec::SENTINEL_BIN;
use crate::error::{Error, Result};
use crate::model::FieldType;

/// Identity field name used when a model does not name one.
pub const DEFAULT_ID_NAME: &str = "id";

/// Per-model storage overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Target set; defaults to the model name.
    #[serde(default)]
    pub set: Option<String>,
    /// Target namespace; defaults to the data source namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Field whose value is used as the id instead of the identity field.
    #[serde(default, rename = "idField")]
    pub id_field: Option<String>,
    /// Record time-to-live in seconds.
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// A registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    /// Identity field name.
    pub id_name: String,
    pub config: ModelConfig,
    /// Declared property types.
    pub properties: BTreeMap<String, FieldType>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_name: DEFAULT_ID_NAME.to_string(),
            config: ModelConfig::default(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_id_name(mut self, id_name: impl Into<String>) -> Self {
        self.id_name = id_name.into();
        self
    }

    pub fn with_config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.insert(name.into(), field_type);
        self
    }

    /// Set holding this model's records.
    pub fn set_name(&self) -> &str {
        self.config.set.as_deref().unwrap_or(&self.name)
    }

    pub fn id_alias(&self) -> Option<&str> {
        self.config.id_field.as_deref()
    }

    /// Returns true if `field` is the identity field or the id alias.
    pub fn is_identity(&self, field: &str) -> bool {
        field == self.id_name || self.id_alias() == Some(field)
    }

    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.properties.get(field).copied()
    }

    pub fn ttl(&self) -> Ttl {
        self.config.ttl.map_or(Ttl::Default, Ttl::ExpireAfter)
    }

    /// Checks the definition against the store's naming limits.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidInput("model name must not be empty".to_string()));
        }
        if self.id_name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "model '{}' has an empty identity field name",
                self.name
            )));
        }
        let set = self.set_name();
        if set.is_empty() || set.len() > MAX_SET_NAME_LEN {
            return Err(Error::InvalidInput(format!(
                "model '{}' maps to invalid set name '{}'",
                self.name, set
            )));
        }
        if let Some(namespace) = &self.config.namespace
            && (namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LEN)
        {
            return Err(Error::InvalidInput(format!(
                "model '{}' maps to invalid namespace '{}'",
                self.name, namespace
            )));
        }
        if let Some(alias) = self.id_alias()
            && (alias.is_empty() || alias == self.id_name)
        {
            return Err(Error::InvalidInput(format!(
                "model '{}' id alias must be non-empty and differ from '{}'",
                self.name, self.id_name
            )));
        }
        if let Some(ttl) = self.config.ttl
            && ttl > MAX_TTL_SECS
        {
            return Err(Error::InvalidInput(format!(
                "model '{}' ttl {} exceeds {} seconds",
                self.name, ttl, MAX_TTL_SECS
            )));
        }
        for property in self.properties.keys() {
            if self.is_identity(property) {
                continue;
            }
            if property == SENTINEL_BIN {
                return Err(Error::InvalidInput(format!(
                    "model '{}' property '{}' uses a reserved name",
                    self.name, property
                )));
            }
            if property.is_empty() || property.len() > MAX_BIN_NAME_LEN {
                return Err(Error::InvalidInput(format!(
                    "model '{}' property '{}' is not a valid bin name (max {} bytes)",
                    self.name, property, MAX_BIN_NAME_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Registered models, keyed by name.
///
/// Lookups of unregistered names return a default definition, so a model
/// can be used without registering it first.
#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<String, Arc<ModelDefinition>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers `definition`, replacing any model with the same name.
    pub fn register(&self, definition: ModelDefinition) -> Result<()> {
        definition.validate()?;
        let mut models = self
            .models
            .write()
            .map_err(|e| Error::Internal(format!("Failed to acquire lock: {}", e)))?;
        models.insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<ModelDefinition>> {
        let models = self
            .models
            .read()
            .map_err(|e| Error::Internal(format!("Failed to acquire lock: {}", e)))?;
        Ok(models
            .get(name)
            .cloned()
            .unwrap_or_else(|| Arc::new(ModelDefinition::new(name))))
    }

    /// Names of all registered models, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let models = self
            .models
            .read()
            .map_err(|e| Error::Internal(format!("Failed to acquire lock: {}", e)))?;
        let mut names: Vec<String> = models.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
