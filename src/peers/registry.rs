use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;

/// A peer the relay has heard from, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerRecord {
    pub peer_id: String,
    /// Last discovery signal, epoch milliseconds.
    pub last_seen: i64,
}

/// In-memory map of peer id to last-seen time.
///
/// Process-lifetime only; rebuilt from scratch on every relay start.
/// Safe for concurrent use from the discovery callback path and the
/// housekeeping sweep without caller-side locking.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<String, i64>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or refresh a discovery signal for a peer.
    pub fn noted(&self, peer_id: &str) {
        self.noted_at(peer_id, now_ms());
    }

    fn noted_at(&self, peer_id: &str, now: i64) {
        self.peers.insert(peer_id.to_string(), now);
    }

    /// Whether a peer was seen within `window`.
    pub fn is_active(&self, peer_id: &str, window: Duration) -> bool {
        self.is_active_at(peer_id, window, now_ms())
    }

    fn is_active_at(&self, peer_id: &str, window: Duration, now: i64) -> bool {
        self.peers
            .get(peer_id)
            .map(|seen| now - *seen <= window.as_millis() as i64)
            .unwrap_or(false)
    }

    /// Ids of all peers seen within `window`.
    pub fn snapshot(&self, window: Duration) -> Vec<String> {
        self.snapshot_at(window, now_ms())
    }

    fn snapshot_at(&self, window: Duration, now: i64) -> Vec<String> {
        let window = window.as_millis() as i64;
        self.peers
            .iter()
            .filter(|entry| now - *entry.value() <= window)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Records of all peers seen within `window`, for host read-back.
    pub fn records(&self, window: Duration) -> Vec<PeerRecord> {
        let now = now_ms();
        let window = window.as_millis() as i64;
        self.peers
            .iter()
            .filter(|entry| now - *entry.value() <= window)
            .map(|entry| PeerRecord {
                peer_id: entry.key().clone(),
                last_seen: *entry.value(),
            })
            .collect()
    }

    /// Remove and return every peer not seen within `stale_window`.
    ///
    /// The caller notifies "peer lost" for each returned id.
    pub fn sweep_stale(&self, stale_window: Duration) -> Vec<String> {
        self.sweep_stale_at(stale_window, now_ms())
    }

    fn sweep_stale_at(&self, stale_window: Duration, now: i64) -> Vec<String> {
        let window = stale_window.as_millis() as i64;
        let candidates: Vec<String> = self
            .peers
            .iter()
            .filter(|entry| now - *entry.value() > window)
            .map(|entry| entry.key().clone())
            .collect();

        // re-check under the shard lock: a refresh racing the scan keeps
        // the peer
        candidates
            .into_iter()
            .filter(|peer_id| {
                self.peers
                    .remove_if(peer_id, |_, seen| now - *seen > window)
                    .is_some()
            })
            .collect()
    }

    /// Drop a peer on an explicit loss notification.
    pub fn remove(&self, peer_id: &str) -> bool {
        self.peers.remove(peer_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
