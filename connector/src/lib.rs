//! ORM connector for an Aerospike-style record store.
//!
//! The connector lets an ORM persist named models in a key-value record store
//! whose only primitives are three-part record keys, flat records of typed
//! bins, point lookups and secondary-index equality scans.
//!
//! # Architecture
//!
//! Model operations are translated down to store operations:
//!
//! - **Keys**: a document's id becomes the record's user key; the namespace
//!   and set come from the model's configuration.
//! - **Codec**: documents become bins. Booleans are stored as `1`/`0` and an
//!   empty document as a single sentinel bin.
//! - **Filters**: `where` clauses become equality filters for a scan. Ranges,
//!   negation and `or` are rejected.
//! - **Fan-out**: operations the store has no native form for, such as
//!   deleting or counting by filter, scan first and then issue single-key
//!   operations with bounded concurrency.
//!
//! # Example
//!
//! ```ignore
//! use common::InMemoryClientFactory;
//! use connector::{Connector, Document, Filter, Settings, Where, initialize};
//!
//! let connector = initialize(Settings::default(), vec![], &InMemoryClientFactory::new(), true).await?;
//!
//! let id = connector
//!     .create("Post", Document::new().with("title", "My Post").with("content", "Hello"))
//!     .await?;
//!
//! let posts = connector
//!     .all("Post", &Filter::new().with_where(Where::new().eq("title", "My Post")))
//!     .await?;
//! assert_eq!(posts[0].get("id"), Some(&id));
//!
//! connector.destroy_all("Post", None).await?;
//! ```

mod codec;
mod config;
mod connection;
mod connector;
mod datasource;
mod error;
mod filter;
mod keys;
mod model;
mod registry;
mod scan;
mod storage;

pub use codec::{SENTINEL_BIN, check_reserved, decode, encode, is_sentinel_only};
pub use config::Settings;
pub use connector::{AerospikeConnector, Connector, TYPES};
pub use datasource::initialize;
pub use error::{Error, Result};
pub use filter::{FilterSet, translate};
pub use keys::{generate_id, key_for_id, resolve_key, resolve_target};
pub use model::{Count, Document, FieldType, Filter, Found, IdSelector, Target, Value, Where};
pub use registry::{DEFAULT_ID_NAME, ModelConfig, ModelDefinition, ModelRegistry};
pub use scan::DocumentIterator;
