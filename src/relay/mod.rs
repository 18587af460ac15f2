//! Relay lifecycle and host-facing API

pub mod error;
pub mod relay;
pub mod types;

pub use error::{RelayError, RelayResult};
pub use relay::MeshRelay;
pub use types::{RelayConfig, RelayEvent, RelayState, RelayStatus};
