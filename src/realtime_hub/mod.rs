//! RealtimeHub - WebSocket fan-out to dashboard observers
//!
//! ## Responsibilities
//!
//! - WebSocket connection management
//! - Broadcasting sensor state to every connected observer
//!
//! Observers are write-only from the hub's point of view: each connection
//! holds an unbounded channel drained by its socket task. A send failure
//! means that task is gone, so the connection is pruned after the fan-out
//! instead of aborting delivery to the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::threat_classifier::{Alert, SensorKind, Severity};

/// Alert detail embedded in a non-safe sensor message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub sensor: SensorKind,
}

/// One observer-facing state update.
///
/// The `alert` object is present only when the threat level is not safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorMessage {
    pub sensor: SensorKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub threat_level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertPayload>,
}

impl SensorMessage {
    pub fn from_alert(alert: &Alert) -> Self {
        let detail = if alert.severity.is_safe() {
            None
        } else {
            Some(AlertPayload {
                title: alert.title.clone(),
                message: alert.message.clone(),
                severity: alert.severity,
                sensor: alert.sensor,
            })
        };

        Self {
            sensor: alert.sensor,
            value: alert.value,
            timestamp: alert.timestamp,
            threat_level: alert.severity,
            alert: detail,
        }
    }
}

/// Observer connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new observer; returns its id and the message receiver the
    /// socket task must drain.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(connection_id = %id, "Observer connected");

        (id, rx)
    }

    /// Unregister an observer. Removing an id that is already gone is a no-op.
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Observer disconnected");
        }
    }

    /// Broadcast a message to every observer connected at call time.
    ///
    /// Connections whose socket task has gone away are pruned afterwards;
    /// their failure never blocks delivery to the remaining observers.
    pub async fn broadcast(&self, message: &SensorMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize sensor message");
                return;
            }
        };

        let broken: Vec<Uuid> = {
            let connections = self.connections.read().await;
            tracing::debug!(
                observers = connections.len(),
                sensor = %message.sensor,
                "Broadcasting sensor message"
            );

            connections
                .values()
                .filter(|conn| conn.tx.send(json.clone()).is_err())
                .map(|conn| conn.id)
                .collect()
        };

        if !broken.is_empty() {
            let mut connections = self.connections.write().await;
            for id in broken {
                if connections.remove(&id).is_some() {
                    self.connection_count.fetch_sub(1, Ordering::Relaxed);
                    tracing::warn!(connection_id = %id, "Dropped broken observer connection");
                }
            }
        }
    }

    /// Number of live observer connections.
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
