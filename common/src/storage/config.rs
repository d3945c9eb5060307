//! Client configuration passed to store client factories.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Host;

/// Log level requested from the store client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operation policies applied by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policies {
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for Policies {
    fn default() -> Self {
        Self { timeout_ms: 20_000 }
    }
}

/// Everything a client needs to reach the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Seed hosts.
    pub hosts: Vec<Host>,
    /// Namespace used when a key does not name one.
    pub namespace: String,
    pub credentials: Option<Credentials>,
    pub log_level: LogLevel,
    pub policies: Policies,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: vec![Host {
                addr: "localhost".to_string(),
                port: 3000,
            }],
            namespace: "test".to_string(),
            credentials: None,
            log_level: LogLevel::default(),
            policies: Policies::default(),
        }
    }
}
