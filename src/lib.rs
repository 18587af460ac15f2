//! DriftMesh is a store-carry-forward message relay for intermittently
//! connected nodes.
//!
//! Every node keeps a bounded SQLite-backed message store, floods its
//! pending messages to whichever peers a transport can reach, and dedups
//! by message id so a message crosses each node at most once usefully.
//! The transport itself lives behind the [`transport::Discovery`] trait;
//! hosts plug in TCP, Bluetooth bridges, or test doubles.
//!
//! Typical embedding:
//!
//! ```no_run
//! use driftmesh::{MeshRelay, RelayConfig};
//! use driftmesh::transport::TcpEndpoint;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let (endpoint, events) = TcpEndpoint::new(Default::default());
//! let endpoint = Arc::new(endpoint);
//! endpoint.listen().await?;
//!
//! let (relay, mut relay_events) =
//!     MeshRelay::new(RelayConfig::default(), endpoint, events).await?;
//! relay.start().await?;
//!
//! let id = relay.send("supplies at north shelter", 12.97, 77.59, 5).await?;
//! # let _ = (id, relay_events.recv().await);
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod metrics;
pub mod peers;
pub mod relay;
pub mod store;
pub mod sync;
pub mod transport;

pub use relay::{MeshRelay, RelayConfig, RelayError, RelayEvent, RelayResult, RelayState, RelayStatus};
pub use store::{Message, MessageStore};
