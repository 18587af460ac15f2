//! Relay configuration, state, and host-facing events

use crate::discovery::SchedulerConfig;
use crate::store::Message;
use crate::sync::SyncConfig;
use serde::Serialize;
use std::time::Duration;

/// Configuration for a relay node.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Identifier stamped on locally originated messages.
    pub node_id: String,

    /// SQLite URL for the message store.
    pub db_url: String,

    /// Capacity bound on stored messages.
    pub max_messages: i64,

    /// Payload byte cap enforced at ingress and on the wire.
    pub max_payload_bytes: usize,

    /// Cap on messages sent per sync connection.
    pub max_send_batch: usize,

    /// Sanity cap on one inbound sync frame.
    pub max_frame_bytes: usize,

    /// Per-phase I/O timeout inside a sync session.
    pub sync_timeout: Duration,

    /// Discovery retry base interval.
    pub base_discovery_interval: Duration,

    /// Discovery retry cap.
    pub max_discovery_interval: Duration,

    /// Period of the housekeeping pass.
    pub housekeeping_interval: Duration,

    /// Peers seen within this window count as active.
    pub active_window: Duration,

    /// Peers silent this long are swept and reported lost.
    pub stale_window: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            node_id: uuid::Uuid::new_v4().to_string(),
            db_url: "sqlite::memory:".to_string(),
            max_messages: 1000,
            max_payload_bytes: 4096,
            max_send_batch: 200,
            max_frame_bytes: 1024 * 1024,
            sync_timeout: Duration::from_secs(10),
            base_discovery_interval: Duration::from_secs(60),
            max_discovery_interval: Duration::from_secs(300),
            housekeeping_interval: Duration::from_secs(60),
            active_window: Duration::from_secs(30),
            stale_window: Duration::from_secs(60),
        }
    }
}

impl RelayConfig {
    pub(crate) fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_send_batch: self.max_send_batch,
            max_payload_bytes: self.max_payload_bytes,
            max_frame_bytes: self.max_frame_bytes,
            io_timeout: self.sync_timeout,
        }
    }

    pub(crate) fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            base_interval: self.base_discovery_interval,
            max_interval: self.max_discovery_interval,
            housekeeping_interval: self.housekeeping_interval,
            stale_window: self.stale_window,
        }
    }
}

/// Lifecycle of the relay as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Stopped,
    Starting,
    Running,
}

/// Events surfaced to the host application.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A new message arrived from a peer and was stored.
    MessageReceived(Message),

    /// A peer was sighted.
    PeerDiscovered(String),

    /// A peer went stale or was reported lost.
    PeerLost(String),
}

/// Point-in-time view for the host's status query.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub running: bool,
    pub peer_count: usize,
    pub pending_count: i64,
    pub discovery_interval_ms: u64,
}
