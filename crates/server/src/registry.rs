//! The set of live connections.

use std::collections::HashMap;
use std::mem;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connection::{ConnectionHandle, Dispatch};

/// Tracks every started connection until it stops, so they can all be closed at
/// shutdown.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<u64, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` to the live set, then starts it on `stream`.
    pub fn start(
        self: &Arc<Self>,
        connection: ConnectionHandle,
        stream: TcpStream,
        peer: SocketAddr,
        dispatcher: Arc<dyn Dispatch>,
    ) {
        self.lock().insert(connection.id(), Arc::clone(&connection));
        debug!(id = connection.id(), %peer, "connection registered");
        connection.start(stream, peer, Arc::clone(self), dispatcher);
    }

    /// Removes `connection` if present and closes it.
    pub fn stop(&self, connection: &ConnectionHandle) {
        if self.lock().remove(&connection.id()).is_some() {
            debug!(id = connection.id(), "connection unregistered");
        }
        connection.stop();
    }

    /// Closes every live connection.
    pub fn stop_all(&self) {
        let connections = mem::take(&mut *self.lock());
        info!(connections = connections.len(), "stopping all connections");
        for connection in connections.values() {
            connection.stop();
        }
    }

    /// Periodic housekeeping, called once per second by the server.
    ///
    /// Nothing to sweep yet, there is no idle timeout.
    pub fn tick(&self) {}

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, ConnectionHandle>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
