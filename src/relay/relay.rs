//! The relay handle: lifecycle, host API, event fan-out

use crate::discovery::DiscoveryScheduler;
use crate::peers::{PeerRecord, PeerRegistry};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::types::{RelayConfig, RelayEvent, RelayState, RelayStatus};
use crate::store::{Message, MessageStore};
use crate::sync::SyncSession;
use crate::transport::{Discovery, DiscoveryEvent};
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A store-carry-forward relay node.
///
/// The single context object owning every moving part: message store,
/// peer registry, discovery scheduler, and the pump that turns
/// collaborator events into sync sessions. Constructed once, started
/// and stopped any number of times, dropped to tear everything down.
pub struct MeshRelay {
    config: RelayConfig,
    store: Arc<MessageStore>,
    registry: Arc<PeerRegistry>,
    discovery: Arc<dyn Discovery>,
    discovery_events: Arc<tokio::sync::Mutex<mpsc::Receiver<DiscoveryEvent>>>,
    events_tx: mpsc::Sender<RelayEvent>,
    state: RwLock<RelayState>,
    running: Arc<AtomicBool>,
    scheduler: Mutex<Option<DiscoveryScheduler>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl MeshRelay {
    /// Build a relay over a discovery collaborator and its event feed.
    ///
    /// Returns the relay and the host-side event receiver
    /// (message-received, peer-discovered, peer-lost).
    pub async fn new(
        config: RelayConfig,
        discovery: Arc<dyn Discovery>,
        discovery_events: mpsc::Receiver<DiscoveryEvent>,
    ) -> RelayResult<(Self, mpsc::Receiver<RelayEvent>)> {
        let store = Arc::new(MessageStore::new(&config.db_url, config.max_messages).await?);
        let (events_tx, events_rx) = mpsc::channel(256);

        Ok((
            Self {
                config,
                store,
                registry: Arc::new(PeerRegistry::new()),
                discovery,
                discovery_events: Arc::new(tokio::sync::Mutex::new(discovery_events)),
                events_tx,
                state: RwLock::new(RelayState::Stopped),
                running: Arc::new(AtomicBool::new(false)),
                scheduler: Mutex::new(None),
                pump: Mutex::new(None),
            },
            events_rx,
        ))
    }

    /// Bring the relay up. Idempotent; fails closed when the discovery
    /// collaborator is not ready, leaving the relay Stopped.
    pub async fn start(&self) -> RelayResult<()> {
        {
            let mut state = self.state.write();
            match *state {
                RelayState::Running | RelayState::Starting => return Ok(()),
                RelayState::Stopped => *state = RelayState::Starting,
            }
        }

        if !self.discovery.is_ready() {
            *self.state.write() = RelayState::Stopped;
            tracing::warn!("relay start aborted: discovery collaborator not ready");
            return Err(RelayError::PrerequisitesNotMet(
                "discovery collaborator is not ready".into(),
            ));
        }

        crate::metrics::init_metrics();
        self.running.store(true, Ordering::SeqCst);
        *self.pump.lock() = Some(self.spawn_pump());
        *self.scheduler.lock() = Some(DiscoveryScheduler::spawn(
            self.config.scheduler_config(),
            self.discovery.clone(),
            self.registry.clone(),
            self.store.clone(),
            self.events_tx.clone(),
        ));

        *self.state.write() = RelayState::Running;
        tracing::info!(node = %self.config.node_id, "relay running");
        Ok(())
    }

    /// Take the relay down, cancelling timers and the event pump before
    /// returning. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write();
            if *state == RelayState::Stopped {
                return;
            }
            *state = RelayState::Stopped;
        }

        self.running.store(false, Ordering::SeqCst);

        // wait each task out so no loop iteration outlives this call
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.abort();
            if let Err(e) = pump.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "event pump ended abnormally");
                }
            }
        }

        self.discovery.end_discovery().await;
        tracing::info!(node = %self.config.node_id, "relay stopped");
    }

    /// Originate a message on this node.
    ///
    /// Validation happens before the store is touched; the returned id
    /// is the message's mesh-wide identity.
    pub async fn send(
        &self,
        payload: impl Into<String>,
        lat: f64,
        lng: f64,
        ttl: u32,
    ) -> RelayResult<String> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(RelayError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(RelayError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }

        let message = Message::new(&self.config.node_id, payload, lat, lng, ttl);
        self.store.insert(&message).await?;
        counter!("driftmesh_messages_originated_total").increment(1);
        tracing::debug!(id = %message.id, "message queued for relay");
        Ok(message.id)
    }

    /// Peers seen within `window`, with their last-seen times.
    pub fn list_peers(&self, window: Duration) -> Vec<PeerRecord> {
        self.registry.records(window)
    }

    /// Stored messages, newest first.
    pub async fn list_messages(&self, limit: i64) -> RelayResult<Vec<Message>> {
        Ok(self.store.recent(limit).await?)
    }

    /// Flag a message as consumed by the host application.
    pub async fn mark_delivered(&self, id: &str) -> RelayResult<()> {
        Ok(self.store.mark_delivered(id).await?)
    }

    pub async fn status(&self) -> RelayResult<RelayStatus> {
        let running = *self.state.read() == RelayState::Running;
        let discovery_interval = self
            .scheduler
            .lock()
            .as_ref()
            .map(|s| s.current_interval())
            .unwrap_or(self.config.base_discovery_interval);

        Ok(RelayStatus {
            running,
            peer_count: self.registry.snapshot(self.config.active_window).len(),
            pending_count: self.store.count().await?,
            discovery_interval_ms: discovery_interval.as_millis() as u64,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// Pump collaborator events: note peers, spawn one sync session per
    /// established connection, fan loss notifications out to the host.
    fn spawn_pump(&self) -> JoinHandle<()> {
        let events = self.discovery_events.clone();
        let registry = self.registry.clone();
        let store = self.store.clone();
        let host_tx = self.events_tx.clone();
        let running = self.running.clone();
        let sync_config = self.config.sync_config();

        tokio::spawn(async move {
            loop {
                let event = { events.lock().await.recv().await };
                let Some(event) = event else { break };

                match event {
                    DiscoveryEvent::PeerDiscovered { peer_id } => {
                        registry.noted(&peer_id);
                        let _ = host_tx.send(RelayEvent::PeerDiscovered(peer_id)).await;
                    }
                    DiscoveryEvent::ConnectionEstablished { peer_id, stream } => {
                        registry.noted(&peer_id);
                        if !running.load(Ordering::SeqCst) {
                            continue;
                        }

                        // each connection syncs on its own worker so a
                        // stalled peer cannot block the pump or timers
                        let session =
                            SyncSession::new(store.clone(), sync_config.clone(), host_tx.clone());
                        tokio::spawn(async move {
                            match session.run(&peer_id, stream).await {
                                Ok(outcome) => {
                                    counter!("driftmesh_sessions_total").increment(1);
                                    tracing::debug!(
                                        peer = %peer_id,
                                        sent = outcome.sent,
                                        received = outcome.received,
                                        "sync session finished"
                                    );
                                }
                                Err(e) => {
                                    counter!("driftmesh_sessions_failed_total").increment(1);
                                    tracing::warn!(peer = %peer_id, error = %e, "sync session aborted");
                                }
                            }
                        });
                    }
                    DiscoveryEvent::PeerLost { peer_id } => {
                        registry.remove(&peer_id);
                        let _ = host_tx.send(RelayEvent::PeerLost(peer_id)).await;
                    }
                }
            }
        })
    }
}
