//! Wire encoding for the exchange protocol
//!
//! One frame is one UTF-8 line holding a JSON array of message records
//! (`id, sender, payload, lat, lng, ttl, hops, timestamp`). A malformed
//! record is dropped on its own; only a malformed top-level frame aborts
//! the session.

use crate::store::Message;
use crate::sync::error::{SyncError, SyncResult};

/// Serialize a batch as a single frame (no trailing newline).
pub fn encode_frame(batch: &[Message]) -> SyncResult<String> {
    serde_json::to_string(batch).map_err(|e| SyncError::MalformedFrame(e.to_string()))
}

/// Parse one frame into candidate messages.
///
/// Individual records that fail to decode are dropped so one corrupt
/// entry cannot poison the rest of the batch.
pub fn decode_frame(frame: &str) -> SyncResult<Vec<Message>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(frame.trim_end())
        .map_err(|e| SyncError::MalformedFrame(e.to_string()))?;

    let mut messages = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Message>(entry) {
            Ok(message) => messages.push(message),
            Err(e) => tracing::warn!(error = %e, "dropping malformed message record"),
        }
    }
    Ok(messages)
}
