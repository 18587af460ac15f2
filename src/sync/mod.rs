//! Pairwise synchronization protocol
//!
//! One frame each way per connection: both sides send their pending
//! batch as a JSON line, merge what the peer sent, and hang up. Dedup in
//! the store bounds the redundant work the flooding strategy creates.

pub mod error;
pub mod framing;
pub mod session;
pub mod wire;

pub use error::{SyncError, SyncResult};
pub use framing::FrameStream;
pub use session::{SyncConfig, SyncOutcome, SyncSession};
