//! Persistent bounded message store
//!
//! Durable table of relayed messages with dedup by id, capacity
//! eviction on insert, and explicit expiry purges.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::MessageStore;
pub use types::Message;
