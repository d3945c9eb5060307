//! Data source initialization.

use common::ClientFactory;
use tracing::{debug, info};

use crate::config::Settings;
use crate::connector::{AerospikeConnector, Connector};
use crate::error::Result;
use crate::registry::ModelDefinition;

/// Builds a connector for `settings`, registering `models`.
///
/// The client comes from `factory`. When `connect` is set the connector is
/// connected before it is returned, and a failed connect fails the call.
pub async fn initialize(
    settings: Settings,
    models: Vec<ModelDefinition>,
    factory: &dyn ClientFactory,
    connect: bool,
) -> Result<AerospikeConnector> {
    settings.validate()?;
    if settings.debug {
        info!(?settings, "initializing data source");
    } else {
        debug!(?settings, "initializing data source");
    }

    let client = factory.create(&settings.client_config())?;
    let connector = AerospikeConnector::new(settings, client)?;
    for model in models {
        connector.define_model(model)?;
    }
    if connect {
        connector.connect().await?;
    }
    Ok(connector)
}
