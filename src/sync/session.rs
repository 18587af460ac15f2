//! One pairwise exchange over one connected peer stream

use crate::relay::RelayEvent;
use crate::store::MessageStore;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::framing::FrameStream;
use crate::sync::wire;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Tunables for a single sync exchange.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cap on messages sent per connection.
    pub max_send_batch: usize,

    /// Payload byte cap; oversized rows are never sent or accepted.
    pub max_payload_bytes: usize,

    /// Sanity cap on one inbound frame.
    pub max_frame_bytes: usize,

    /// Per-phase I/O timeout.
    pub io_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_send_batch: 200,
            max_payload_bytes: 4096,
            max_frame_bytes: 1024 * 1024,
            io_timeout: Duration::from_secs(10),
        }
    }
}

/// What one exchange accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    /// Messages offered to the peer.
    pub sent: usize,

    /// Messages newly written to the store from the peer's batch.
    pub received: usize,
}

/// Runs the exchange protocol once over one connected byte stream.
///
/// The procedure is symmetric: both ends write their outbound batch
/// before blocking on the inbound read, so neither side deadlocks on the
/// full-duplex stream. A fresh session is created per connection; there
/// is no cross-session state.
pub struct SyncSession {
    store: Arc<MessageStore>,
    config: SyncConfig,
    events: mpsc::Sender<RelayEvent>,
}

impl SyncSession {
    pub fn new(
        store: Arc<MessageStore>,
        config: SyncConfig,
        events: mpsc::Sender<RelayEvent>,
    ) -> Self {
        Self {
            store,
            config,
            events,
        }
    }

    /// Perform one bidirectional exchange with the peer on `stream`.
    ///
    /// Any error aborts the exchange; messages already inserted stay
    /// (the protocol is per-message atomic, not transactional).
    pub async fn run<S>(&self, peer_id: &str, stream: S) -> SyncResult<SyncOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = FrameStream::new(stream, self.config.max_frame_bytes);

        // Outbound: pending rows, re-filtered for expiry and size in case
        // a stale or corrupt row survived the last sweep.
        let batch: Vec<_> = self
            .store
            .pending(self.config.max_send_batch as i64)
            .await?
            .into_iter()
            .filter(|m| !m.is_expired() && m.payload_bytes() <= self.config.max_payload_bytes)
            .collect();

        let frame = wire::encode_frame(&batch)?;
        self.with_timeout(framed.write_frame(&frame)).await??;
        tracing::debug!(peer = peer_id, count = batch.len(), "sent sync batch");

        // Inbound: exactly one frame, sent by the peer under the same rule.
        let inbound = self.with_timeout(framed.read_frame()).await??;
        let candidates = wire::decode_frame(&inbound)?;
        tracing::debug!(peer = peer_id, count = candidates.len(), "received sync batch");

        let mut received = 0;
        for candidate in candidates {
            if candidate.is_expired() {
                tracing::debug!(id = %candidate.id, "dropping expired message from peer");
                continue;
            }
            if candidate.payload_bytes() > self.config.max_payload_bytes {
                tracing::warn!(id = %candidate.id, "dropping oversized message from peer");
                continue;
            }

            let forwarded = candidate.increment_hop();
            if self.store.insert(&forwarded).await? {
                received += 1;
                counter!("driftmesh_messages_relayed_total").increment(1);
                let _ = self
                    .events
                    .send(RelayEvent::MessageReceived(forwarded))
                    .await;
            }
        }

        framed.shutdown().await;
        Ok(SyncOutcome {
            sent: batch.len(),
            received,
        })
    }

    async fn with_timeout<F, T>(&self, fut: F) -> SyncResult<T>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(self.config.io_timeout, fut)
            .await
            .map_err(|_| SyncError::Timeout(self.config.io_timeout))
    }
}
