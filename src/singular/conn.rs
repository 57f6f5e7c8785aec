//! # Mastership oracle connection.
//!
//! A [`Conn`] wraps this replica's connection to the replicated store whose
//! primary designates the master. The coordinator only ever asks two things
//! of it: is the connection still alive, and does it point at the primary.
//!
//! [`ConnectionIsFatal`] turns a connection into a [`FatalPolicy`]: once the
//! connection stops answering `ping`, every worker error becomes fatal, so
//! the supervisor shuts down and the owning process reconnects from scratch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    core::FatalPolicy,
    error::{ConnError, WorkerError},
};

/// Connection to the mastership oracle.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use fleetvisor::{Conn, ConnError};
///
/// /// Compares the store's current primary with our own address.
/// struct StoreConn {
///     local: String,
///     primary: Arc<std::sync::Mutex<String>>,
/// }
///
/// #[async_trait]
/// impl Conn for StoreConn {
///     async fn ping(&self) -> Result<(), ConnError> {
///         Ok(())
///     }
///
///     async fn is_master(&self) -> Result<bool, ConnError> {
///         let primary = self
///             .primary
///             .lock()
///             .map_err(|_| ConnError::query("primary lookup poisoned"))?;
///         Ok(*primary == self.local)
///     }
/// }
/// ```
#[async_trait]
pub trait Conn: Send + Sync + 'static {
    /// Checks that the connection is still alive.
    async fn ping(&self) -> Result<(), ConnError>;

    /// Reports whether this replica's connection points at the store's primary.
    async fn is_master(&self) -> Result<bool, ConnError>;
}

/// Fatal policy that escalates every error once the connection is down.
///
/// An error is fatal if it is [`WorkerError::Fatal`] or if the connection no
/// longer answers `ping`. The newest fatal error always wins.
pub struct ConnectionIsFatal {
    conn: Arc<dyn Conn>,
}

impl ConnectionIsFatal {
    pub fn new(conn: Arc<dyn Conn>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl FatalPolicy for ConnectionIsFatal {
    async fn is_fatal(&self, err: &WorkerError) -> bool {
        if matches!(err, WorkerError::Fatal { .. }) {
            return true;
        }
        match self.conn.ping().await {
            Ok(()) => {
                tracing::debug!(error = %err, "worker error is not fatal");
                false
            }
            Err(ping) => {
                tracing::info!(error = %err, ping = %ping, "connection down, worker error is fatal");
                true
            }
        }
    }

    fn more_important(&self, _candidate: &WorkerError, _current: &WorkerError) -> bool {
        true
    }
}
