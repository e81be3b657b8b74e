//! Connection registry
//!
//! Tracks live push connections keyed by user id. A user may hold several
//! simultaneous connections (browser tabs); each is represented by a handle
//! carrying an outbound channel and a liveness flag. The map is sharded with
//! per-key locking (`DashMap`) so unrelated users' connect/disconnect traffic
//! never serializes.
//!
//! Delivery is fire-and-forget: a failed send on one connection affects
//! neither the other connections nor the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Outbound events sent to a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Deliver a serialized JSON frame
    Deliver(String),
    /// Heartbeat probe; the writer task must answer with a protocol ping
    Ping,
    /// The registry gave up on this connection; the writer task must close
    Terminate,
}

struct ConnectionHandle {
    id: u64,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
    /// Set on acknowledgement, cleared by each heartbeat sweep. A connection
    /// that stays cleared across a full cycle is considered dead.
    alive: Arc<AtomicBool>,
}

/// Registry of live connections per user
pub struct ConnectionRegistry {
    connections: DashMap<String, Vec<ConnectionHandle>>,
    next_id: AtomicU64,
    heartbeat_interval: Duration,
}

impl ConnectionRegistry {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            heartbeat_interval,
        }
    }

    /// Register a verified connection under a user id. Returns the connection
    /// id and the receiver half for the connection's writer task.
    ///
    /// Callers must verify the credential token before registering; the
    /// registry trusts the user id it is given.
    pub fn register(&self, user_id: &str) -> (u64, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle {
            id,
            tx,
            alive: Arc::new(AtomicBool::new(true)),
        };

        self.connections
            .entry(user_id.to_string())
            .or_default()
            .push(handle);

        tracing::debug!(user_id, connection_id = id, "Connection registered");
        (id, rx)
    }

    /// Remove a connection. Drops the user's entry entirely once the last
    /// connection is gone.
    pub fn unregister(&self, user_id: &str, connection_id: u64) {
        if let Some(mut entry) = self.connections.get_mut(user_id) {
            entry.retain(|h| h.id != connection_id);
            let empty = entry.is_empty();
            drop(entry);
            if empty {
                self.connections
                    .remove_if(user_id, |_, handles| handles.is_empty());
            }
        }
        tracing::debug!(user_id, connection_id, "Connection unregistered");
    }

    /// Record a heartbeat acknowledgement from a connection
    pub fn mark_alive(&self, user_id: &str, connection_id: u64) {
        if let Some(entry) = self.connections.get(user_id) {
            if let Some(handle) = entry.iter().find(|h| h.id == connection_id) {
                handle.alive.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Deliver a frame to every live connection of one user. Best-effort: if
    /// the user has no connections the frame is silently dropped (it is
    /// already durable in the store).
    pub fn send_to_user(&self, user_id: &str, frame: &str) {
        if let Some(entry) = self.connections.get(user_id) {
            for handle in entry.iter() {
                if handle
                    .tx
                    .send(ConnectionEvent::Deliver(frame.to_string()))
                    .is_err()
                {
                    tracing::debug!(
                        user_id,
                        connection_id = handle.id,
                        "Dropping frame for closed connection"
                    );
                }
            }
        }
    }

    /// Number of live connections for a user
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.connections
            .get(user_id)
            .map(|e| e.len())
            .unwrap_or(0)
    }

    /// Whether the user currently has any registry entry
    pub fn is_connected(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    /// One heartbeat sweep: terminate connections that never acknowledged the
    /// previous probe, ping the rest.
    pub fn sweep(&self) {
        let mut dead: Vec<(String, u64)> = Vec::new();

        for entry in self.connections.iter() {
            for handle in entry.value().iter() {
                if handle.alive.swap(false, Ordering::Relaxed) {
                    let _ = handle.tx.send(ConnectionEvent::Ping);
                } else {
                    let _ = handle.tx.send(ConnectionEvent::Terminate);
                    dead.push((entry.key().clone(), handle.id));
                }
            }
        }

        for (user_id, connection_id) in dead {
            tracing::debug!(
                user_id = %user_id,
                connection_id,
                "Terminating unresponsive connection"
            );
            self.unregister(&user_id, connection_id);
        }
    }

    /// Spawn the periodic heartbeat task
    pub fn start_heartbeat_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = registry.heartbeat_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick must not count as a missed cycle
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Heartbeat task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        registry.sweep();
                    }
                }
            }
        })
    }
}
