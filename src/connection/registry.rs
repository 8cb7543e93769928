//! Connection registry - one entry per open websocket

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::ServerMsg;

/// Capacity of each connection's outbound queue
pub const OUTBOX_CAPACITY: usize = 64;

/// Server-side view of one connected peer
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    /// Outbound messages, drained by the socket writer task
    pub tx: mpsc::Sender<ServerMsg>,
    /// Match this connection is currently playing in
    pub match_id: Option<Uuid>,
    pub connected_at: u64,
}

/// Registry of all open connections plus the online counter
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionHandle>,
    online: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection, returns the updated online count
    pub fn register(&self, conn_id: Uuid, tx: mpsc::Sender<ServerMsg>) -> usize {
        let handle = ConnectionHandle {
            conn_id,
            tx,
            match_id: None,
            connected_at: unix_millis(),
        };
        if self.connections.insert(conn_id, handle).is_some() {
            return self.online();
        }
        self.online.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Forget a connection. Returns its last handle if it was registered.
    pub fn unregister(&self, conn_id: Uuid) -> Option<ConnectionHandle> {
        let (_, handle) = self.connections.remove(&conn_id)?;
        self.online.fetch_sub(1, Ordering::Relaxed);
        Some(handle)
    }

    pub fn online(&self) -> usize {
        self.online.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self, conn_id: &Uuid) -> bool {
        self.connections.contains_key(conn_id)
    }

    pub fn match_of(&self, conn_id: &Uuid) -> Option<Uuid> {
        self.connections.get(conn_id).and_then(|c| c.match_id)
    }

    /// Attach a connection to a match. No-op for unknown connections.
    pub fn set_match(&self, conn_id: &Uuid, match_id: Uuid) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            conn.match_id = Some(match_id);
        }
    }

    /// Detach a connection, unless it has already moved on to another match
    pub fn clear_match_if(&self, conn_id: &Uuid, match_id: Uuid) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            if conn.match_id == Some(match_id) {
                conn.match_id = None;
            }
        }
    }

    /// Queue a message for one connection. A full outbox drops the message.
    pub fn send_to(&self, conn_id: &Uuid, msg: ServerMsg) -> bool {
        let Some(conn) = self.connections.get(conn_id) else {
            return false;
        };
        match conn.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %conn_id, "Outbox full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = %conn_id, "Outbox closed");
                false
            }
        }
    }

    /// Queue a message for every connection
    pub fn broadcast(&self, msg: &ServerMsg) {
        for conn in self.connections.iter() {
            if let Err(TrySendError::Full(_)) = conn.tx.try_send(msg.clone()) {
                warn!(conn_id = %conn.conn_id, "Outbox full, dropping broadcast");
            }
        }
    }
}
