//! Connection state of a connector's store client.

use std::time::Duration;

use common::StoreError;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::RecordStorage;

#[derive(Default)]
struct ConnectionState {
    connected: bool,
    /// Error of the last failed connect, cleared by a successful one.
    error: Option<StoreError>,
}

/// Tracks whether the client is connected and announces when it becomes so.
///
/// Callers of [`Connection::connect`] serialize on the state lock, so the
/// client is connected at most once no matter how many tasks race.
pub(crate) struct Connection {
    storage: RecordStorage,
    state: Mutex<ConnectionState>,
    connected_tx: watch::Sender<bool>,
}

impl Connection {
    pub(crate) fn new(storage: RecordStorage) -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            storage,
            state: Mutex::new(ConnectionState::default()),
            connected_tx,
        }
    }

    pub(crate) async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.connected {
            drop(state);
            tokio::task::yield_now().await;
            return Ok(());
        }

        match self.storage.connect().await {
            Ok(()) => {
                state.connected = true;
                state.error = None;
                self.connected_tx.send_replace(true);
                debug!("store connection established");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "store connection failed");
                state.error = Some(e.clone());
                Err(Error::Connection(format!("failed to connect: {}", e)))
            }
        }
    }

    pub(crate) async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Ok(());
        }
        debug!("disconnect");
        state.connected = false;
        self.connected_tx.send_replace(false);
        self.storage.close().await
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    /// Returns the error of the last failed connect, if any.
    pub(crate) async fn last_error(&self) -> Option<StoreError> {
        self.state.lock().await.error.clone()
    }

    /// Checks the cluster status. False if not connected or the last connect failed.
    pub(crate) async fn ping(&self) -> bool {
        {
            let state = self.state.lock().await;
            if !state.connected || state.error.is_some() {
                return false;
            }
        }
        match self.storage.info("status").await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "ping failed");
                false
            }
        }
    }

    /// Waits until the connection is established, for at most `timeout`.
    pub(crate) async fn wait_connected(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.connected_tx.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|connected| *connected))
            .await
            .map(|r| r.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::Connection(
                "connection state channel closed".to_string(),
            )),
            Err(_) => Err(Error::Connection(match self.last_error().await {
                Some(e) => format!(
                    "not connected after {:?}, last connect failed: {}",
                    timeout, e
                ),
                None => format!("not connected after {:?}", timeout),
            })),
        }
    }
}
