//! Peer liveness registry

pub mod registry;

pub use registry::{PeerRecord, PeerRegistry};
