//! Transport/discovery collaborator boundary
//!
//! The core never talks to a radio directly. Whatever performs peer
//! discovery and connection establishment implements [`Discovery`] and
//! feeds [`DiscoveryEvent`]s over a channel; any established connection
//! crosses the boundary as a boxed byte stream.

pub mod tcp;

use async_trait::async_trait;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

pub use tcp::{TcpEndpoint, TcpEndpointConfig};

/// A connected, ordered, reliable byte stream to exactly one peer.
pub trait RelayStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RelayStream for T {}

/// Boxed stream handed across the collaborator boundary.
pub type PeerStream = Box<dyn RelayStream>;

/// Signals from the discovery/transport collaborator.
pub enum DiscoveryEvent {
    /// A peer was sighted (no connection yet).
    PeerDiscovered { peer_id: String },

    /// A byte stream to a peer is up; the relay runs one sync session on it.
    ConnectionEstablished { peer_id: String, stream: PeerStream },

    /// The collaborator reports the peer gone.
    PeerLost { peer_id: String },
}

impl fmt::Debug for DiscoveryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerDiscovered { peer_id } => {
                f.debug_struct("PeerDiscovered").field("peer_id", peer_id).finish()
            }
            Self::ConnectionEstablished { peer_id, .. } => f
                .debug_struct("ConnectionEstablished")
                .field("peer_id", peer_id)
                .finish_non_exhaustive(),
            Self::PeerLost { peer_id } => {
                f.debug_struct("PeerLost").field("peer_id", peer_id).finish()
            }
        }
    }
}

/// Discovery operations the scheduler drives.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Prerequisite check run by `start()`; a false here fails startup closed.
    fn is_ready(&self) -> bool;

    /// Kick off one discovery attempt. Returns success or failure; the
    /// scheduler's backoff reacts to the result.
    async fn begin_discovery(&self) -> bool;

    /// Stop discovering; called during relay shutdown.
    async fn end_discovery(&self);
}
