//! WebSocket support for real-time upload processing notifications
//!
//! Clients open a WebSocket to receive plain-text stage messages as uploads
//! move through the pipeline, without polling. The hub owns every registered
//! listener; sockets themselves are driven by per-connection forwarding tasks
//! so one slow or dead socket never delays delivery to the others.

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub mod messages;

pub use messages::StatusUpdate;

/// Registry of active listener connections
///
/// Handles connection lifecycle and status broadcasting. Each registered
/// listener is represented by the sending half of its forwarding channel; a
/// listener whose channel is gone is removed the next time a broadcast
/// touches it.
pub struct NotificationHub {
    connections: DashMap<String, mpsc::UnboundedSender<StatusUpdate>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    /// Create a new notification hub
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Add a new listener connection
    pub fn register(&self, listener_id: String, tx: mpsc::UnboundedSender<StatusUpdate>) {
        debug!(listener_id = %listener_id, "Adding listener connection");
        self.connections.insert(listener_id, tx);
    }

    /// Remove a listener connection. A no-op when the listener was already
    /// pruned by a failed broadcast.
    pub fn unregister(&self, listener_id: &str) {
        debug!(listener_id = %listener_id, "Removing listener connection");
        self.connections.remove(listener_id);
    }

    /// Broadcast a status update to every registered listener
    ///
    /// Sends are non-blocking channel writes; the actual socket traffic
    /// happens in each connection's forwarding task. A failed send means the
    /// listener is gone, and it is silently dropped from the registry without
    /// affecting delivery to the others.
    pub fn broadcast(&self, update: StatusUpdate) {
        let mut sent_count = 0;
        let mut dead: Vec<String> = Vec::new();

        for entry in self.connections.iter() {
            if entry.value().send(update.clone()).is_ok() {
                sent_count += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }

        // Removal happens after iteration; the shard iterators are never
        // mutated underneath.
        for listener_id in dead {
            debug!(listener_id = %listener_id, "Pruning dead listener");
            self.connections.remove(&listener_id);
        }

        if sent_count > 0 {
            debug!(sent_count, update = %update, "Broadcast status update");
        }
    }

    /// Get the number of active listener connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Handle a WebSocket connection
///
/// This function is called when a WebSocket connection is established.
/// It registers the listener with the hub, forwards broadcast updates out to
/// the socket, and keeps the connection open until the client goes away. No
/// inbound message format is required; text frames are ignored.
pub async fn handle_ws_connection(socket: WebSocket, hub: Arc<NotificationHub>) {
    let listener_id = uuid::Uuid::new_v4().to_string();
    info!(listener_id = %listener_id, "New listener connection");

    // Split the socket into sender and receiver
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Create a channel for pushing status updates to this connection
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<StatusUpdate>();

    hub.register(listener_id.clone(), update_tx);

    // Spawn task to forward updates from the channel to the WebSocket
    let listener_id_clone = listener_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            if ws_tx
                .send(Message::Text(update.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
        debug!(listener_id = %listener_id_clone, "Listener send task ended");
    });

    // Drain incoming frames until the client disconnects
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                debug!(listener_id = %listener_id, text = %text, "Ignoring inbound text frame");
            }
            Ok(Message::Binary(_)) => {
                debug!(listener_id = %listener_id, "Ignoring inbound binary frame");
            }
            Ok(Message::Ping(_)) => {
                // axum answers pings automatically
            }
            Ok(Message::Pong(_)) => {
                // Pong received - connection is alive
            }
            Ok(Message::Close(_)) => {
                info!(listener_id = %listener_id, "Listener connection closed by client");
                break;
            }
            Err(e) => {
                error!(listener_id = %listener_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Clean up
    hub.unregister(&listener_id);
    send_task.abort();
    info!(listener_id = %listener_id, "Listener connection closed");
}
