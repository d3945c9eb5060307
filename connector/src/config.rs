//! Data source settings.

use std::fmt;
use std::time::Duration;

use common::storage::Host;
use common::{ClientConfig, Credentials, LogLevel, Policies};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for an [`AerospikeConnector`](crate::AerospikeConnector) data source.
///
/// Every field has a default, so an empty JSON object deserializes to a
/// connector for `localhost:3000` in namespace `test`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Namespace used by models that do not configure one.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-operation timeout, also bounding how long `autoupdate` waits for a
    /// connection.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default)]
    pub log_level: LogLevel,
    /// Maximum number of single-key operations in flight during a fan-out.
    #[serde(default = "default_max_fanout")]
    pub max_fanout: usize,
    /// Bin covered by the secondary index `autoupdate` creates per model.
    #[serde(default = "default_index_bin")]
    pub index_bin: String,
    #[serde(default)]
    pub debug: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_namespace() -> String {
    "test".to_string()
}

fn default_connection_timeout_ms() -> u64 {
    20_000
}

fn default_max_fanout() -> usize {
    16
}

fn default_index_bin() -> String {
    "name".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            namespace: default_namespace(),
            username: None,
            password: None,
            connection_timeout_ms: default_connection_timeout_ms(),
            log_level: LogLevel::default(),
            max_fanout: default_max_fanout(),
            index_bin: default_index_bin(),
            debug: false,
        }
    }
}

impl Settings {
    /// Checks the settings for values no connector can work with.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::InvalidInput("port must be non-zero".to_string()));
        }
        if self.namespace.is_empty() {
            return Err(Error::InvalidInput(
                "namespace must not be empty".to_string(),
            ));
        }
        if self.max_fanout == 0 {
            return Err(Error::InvalidInput(
                "max_fanout must be at least 1".to_string(),
            ));
        }
        if self.index_bin.is_empty() || self.index_bin.len() > common::storage::MAX_BIN_NAME_LEN
        {
            return Err(Error::InvalidInput(format!(
                "index_bin '{}' is not a valid bin name",
                self.index_bin
            )));
        }
        Ok(())
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Builds the client configuration for these settings.
    ///
    /// Credentials are only passed on when a non-empty username is set.
    pub fn client_config(&self) -> ClientConfig {
        let credentials = self
            .username
            .as_ref()
            .filter(|u| !u.is_empty())
            .map(|username| Credentials {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            });
        ClientConfig {
            hosts: vec![Host {
                addr: self.host.clone(),
                port: self.port,
            }],
            namespace: self.namespace.clone(),
            credentials,
            log_level: self.log_level,
            policies: Policies {
                timeout_ms: self.connection_timeout_ms,
            },
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("namespace", &self.namespace)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("log_level", &self.log_level)
            .field("max_fanout", &self.max_fanout)
            .field("index_bin", &self.index_bin)
            .field("debug", &self.debug)
            .finish()
    }
}
