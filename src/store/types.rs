//! Message value type

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single relayed message.
///
/// Messages are immutable values: relaying produces a fresh copy via
/// [`Message::increment_hop`], the stored original is never mutated.
/// On the wire `created_at` travels under the field name `timestamp`;
/// the `delivered` flag is local bookkeeping and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Globally unique identifier, assigned once at origination.
    pub id: String,

    /// Opaque originator identifier.
    pub sender: String,

    /// UTF-8 text payload, byte length bounded by the relay's cap.
    pub payload: String,

    /// Origination latitude (domain metadata, unused by relay logic).
    pub lat: f64,

    /// Origination longitude.
    pub lng: f64,

    /// Maximum hop budget, fixed at origination.
    pub ttl: u32,

    /// Relay hops traversed so far.
    pub hops: u32,

    /// Origination time, epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub created_at: i64,

    /// Already handed to the consuming application on this node.
    #[serde(skip)]
    pub delivered: bool,
}

impl Message {
    /// Originate a new message with a fresh id and a zero hop count.
    pub fn new(
        sender: impl Into<String>,
        payload: impl Into<String>,
        lat: f64,
        lng: f64,
        ttl: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            payload: payload.into(),
            lat,
            lng,
            ttl,
            hops: 0,
            created_at: Utc::now().timestamp_millis(),
            delivered: false,
        }
    }

    /// Copy-transform for relaying: same message, one more hop.
    pub fn increment_hop(&self) -> Self {
        Self {
            hops: self.hops + 1,
            delivered: false,
            ..self.clone()
        }
    }

    /// A message is expired once its hop budget is spent.
    pub fn is_expired(&self) -> bool {
        self.hops >= self.ttl
    }

    /// Payload size in UTF-8 bytes.
    pub fn payload_bytes(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message() {
        let msg = Message::new("node-a", "hello", 12.9, 77.6, 5);
        assert_eq!(msg.hops, 0);
        assert_eq!(msg.ttl, 5);
        assert!(!msg.delivered);
        assert!(!msg.is_expired());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_increment_hop_is_non_destructive() {
        let mut original = Message::new("node-a", "hello", 1.0, 2.0, 5);
        original.hops = 2;

        let relayed = original.increment_hop();

        assert_eq!(relayed.hops, 3);
        assert_eq!(relayed.id, original.id);
        assert_eq!(relayed.sender, original.sender);
        assert_eq!(relayed.payload, original.payload);
        assert_eq!(relayed.ttl, original.ttl);
        assert_eq!(relayed.created_at, original.created_at);
        // the original value is untouched
        assert_eq!(original.hops, 2);
    }

    #[test]
    fn test_expiry_boundary() {
        let mut msg = Message::new("node-a", "hello", 0.0, 0.0, 3);
        msg.hops = 2;
        assert!(!msg.is_expired());
        msg.hops = 3;
        assert!(msg.is_expired());
        msg.hops = 4;
        assert!(msg.is_expired());
    }

    #[test]
    fn test_wire_field_names() {
        let msg = Message::new("node-a", "hi", 0.0, 0.0, 5);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("timestamp").is_some());
        assert!(json.get("created_at").is_none());
        assert!(json.get("delivered").is_none());
    }

    #[test]
    fn test_payload_bytes_counts_utf8() {
        let msg = Message::new("node-a", "héllo", 0.0, 0.0, 5);
        assert_eq!(msg.payload_bytes(), 6);
    }
}
