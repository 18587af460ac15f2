//! TCP reference implementation of the discovery boundary
//!
//! Listens on a mesh port and dials a static seed list on every
//! discovery attempt. Real deployments swap this for a radio-backed
//! collaborator; the relay core only sees the [`Discovery`] trait and
//! the event channel.

use crate::transport::{Discovery, DiscoveryEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct TcpEndpointConfig {
    /// Address to accept inbound peer connections on.
    pub bind_addr: SocketAddr,

    /// Peers dialed on every discovery attempt.
    pub seeds: Vec<SocketAddr>,

    /// Dial timeout per seed.
    pub connect_timeout: Duration,
}

impl Default for TcpEndpointConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8888".parse().unwrap(),
            seeds: Vec::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

pub struct TcpEndpoint {
    config: TcpEndpointConfig,
    events: mpsc::Sender<DiscoveryEvent>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl TcpEndpoint {
    /// Create the endpoint and the event channel the relay consumes.
    pub fn new(config: TcpEndpointConfig) -> (Self, mpsc::Receiver<DiscoveryEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                config,
                events: tx,
                listener_task: Mutex::new(None),
                local_addr: Mutex::new(None),
            },
            rx,
        )
    }

    /// Bind the mesh port and start accepting peer connections.
    pub async fn listen(&self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);
        tracing::debug!(addr = %local_addr, "mesh listener up");

        let events = self.events.clone();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, remote)) => {
                        let peer_id = remote.to_string();
                        tracing::debug!(peer = %peer_id, "inbound peer connection");
                        if events
                            .send(DiscoveryEvent::ConnectionEstablished {
                                peer_id,
                                stream: Box::new(socket),
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "mesh listener accept failed");
                        break;
                    }
                }
            }
        });

        *self.listener_task.lock() = Some(task);
        Ok(local_addr)
    }

    /// Address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

#[async_trait]
impl Discovery for TcpEndpoint {
    fn is_ready(&self) -> bool {
        self.local_addr.lock().is_some()
    }

    async fn begin_discovery(&self) -> bool {
        if self.config.seeds.is_empty() {
            // nothing to dial; inbound connections still arrive
            return true;
        }

        let mut reached_any = false;
        for seed in &self.config.seeds {
            match timeout(self.config.connect_timeout, TcpStream::connect(seed)).await {
                Ok(Ok(socket)) => {
                    reached_any = true;
                    let peer_id = seed.to_string();
                    tracing::debug!(peer = %peer_id, "dialed seed peer");
                    let _ = self
                        .events
                        .send(DiscoveryEvent::PeerDiscovered {
                            peer_id: peer_id.clone(),
                        })
                        .await;
                    let _ = self
                        .events
                        .send(DiscoveryEvent::ConnectionEstablished {
                            peer_id,
                            stream: Box::new(socket),
                        })
                        .await;
                }
                Ok(Err(e)) => {
                    tracing::debug!(seed = %seed, error = %e, "seed unreachable");
                }
                Err(_) => {
                    tracing::debug!(seed = %seed, "seed dial timed out");
                }
            }
        }
        reached_any
    }

    async fn end_discovery(&self) {
        if let Some(task) = self.listener_task.lock().take() {
            task.abort();
        }
        *self.local_addr.lock() = None;
    }
}
