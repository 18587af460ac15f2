//! Periodic discovery attempts and housekeeping

use crate::discovery::backoff::RetryBackoff;
use crate::peers::PeerRegistry;
use crate::relay::RelayEvent;
use crate::store::MessageStore;
use crate::transport::Discovery;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Discovery retry base interval.
    pub base_interval: Duration,

    /// Discovery retry cap.
    pub max_interval: Duration,

    /// Fixed period for the expiry/stale sweeps.
    pub housekeeping_interval: Duration,

    /// Peers silent this long are swept and reported lost.
    pub stale_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(60),
            max_interval: Duration::from_secs(300),
            housekeeping_interval: Duration::from_secs(60),
            stale_window: Duration::from_secs(60),
        }
    }
}

/// Drives the discovery collaborator and the periodic housekeeping pass.
///
/// Two independent timer loops on their own tasks: a slow peer or a
/// stuck discovery call never stalls the sweeps, and vice versa. Both
/// loops check the shared running flag so nothing fires after shutdown.
pub struct DiscoveryScheduler {
    running: Arc<AtomicBool>,
    backoff: Arc<RetryBackoff>,
    tasks: Vec<JoinHandle<()>>,
}

impl DiscoveryScheduler {
    pub fn spawn(
        config: SchedulerConfig,
        discovery: Arc<dyn Discovery>,
        registry: Arc<PeerRegistry>,
        store: Arc<MessageStore>,
        events: mpsc::Sender<RelayEvent>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let backoff = Arc::new(RetryBackoff::new(config.base_interval, config.max_interval));

        let discovery_task = {
            let running = running.clone();
            let backoff = backoff.clone();
            tokio::spawn(async move {
                // first attempt fires immediately; only the waits between
                // attempts are subject to backoff
                loop {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    if discovery.begin_discovery().await {
                        backoff.on_success();
                        tracing::debug!("discovery attempt succeeded");
                    } else {
                        let next = backoff.on_failure();
                        tracing::warn!(next_attempt = ?next, "discovery attempt failed");
                    }
                    tokio::time::sleep(backoff.current()).await;
                }
            })
        };

        let housekeeping_task = {
            let running = running.clone();
            let stale_window = config.stale_window;
            let period = config.housekeeping_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await; // skip the immediate first tick
                loop {
                    ticker.tick().await;
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }

                    for peer_id in registry.sweep_stale(stale_window) {
                        tracing::debug!(peer = %peer_id, "peer went stale");
                        let _ = events.send(RelayEvent::PeerLost(peer_id)).await;
                    }

                    match store.purge_expired().await {
                        Ok(purged) if purged > 0 => {
                            tracing::debug!(purged, "purged expired messages")
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "expiry purge failed"),
                    }
                }
            })
        };

        Self {
            running,
            backoff,
            tasks: vec![discovery_task, housekeeping_task],
        }
    }

    /// Current wait before the next discovery attempt.
    pub fn current_interval(&self) -> Duration {
        self.backoff.current()
    }

    /// Stop both loops and wait for them to unwind; no iteration runs
    /// after this returns.
    pub async fn shutdown(mut self) {
        self.running.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "scheduler task ended abnormally");
                }
            }
        }
    }
}

impl Drop for DiscoveryScheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedDiscovery {
        attempts: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl Discovery for ScriptedDiscovery {
        fn is_ready(&self) -> bool {
            true
        }

        async fn begin_discovery(&self) -> bool {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            n >= self.fail_first
        }

        async fn end_discovery(&self) {}
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            base_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(80),
            housekeeping_interval: Duration::from_millis(20),
            stale_window: Duration::from_millis(30),
        }
    }

    #[tokio::test]
    async fn test_backoff_grows_then_resets() {
        let discovery = Arc::new(ScriptedDiscovery {
            attempts: AtomicUsize::new(0),
            fail_first: 2,
        });
        let registry = Arc::new(PeerRegistry::new());
        let store = Arc::new(MessageStore::new_in_memory(100).await.unwrap());
        let (tx, _rx) = mpsc::channel(16);

        let scheduler = DiscoveryScheduler::spawn(
            fast_config(),
            discovery.clone(),
            registry,
            store,
            tx,
        );

        // two failures then successes; after a success the interval is
        // back at base
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(discovery.attempts.load(Ordering::SeqCst) >= 3);
        assert_eq!(scheduler.current_interval(), Duration::from_millis(10));

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_first_attempt_fires_immediately() {
        let discovery = Arc::new(ScriptedDiscovery {
            attempts: AtomicUsize::new(0),
            fail_first: 0,
        });
        let registry = Arc::new(PeerRegistry::new());
        let store = Arc::new(MessageStore::new_in_memory(100).await.unwrap());
        let (tx, _rx) = mpsc::channel(16);

        // production-scale intervals: only the immediate attempt can fire
        let config = SchedulerConfig {
            base_interval: Duration::from_secs(60),
            max_interval: Duration::from_secs(300),
            housekeeping_interval: Duration::from_secs(60),
            stale_window: Duration::from_secs(60),
        };
        let scheduler =
            DiscoveryScheduler::spawn(config, discovery.clone(), registry, store, tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(discovery.attempts.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_housekeeping_sweeps_stale_peers() {
        let discovery = Arc::new(ScriptedDiscovery {
            attempts: AtomicUsize::new(0),
            fail_first: 0,
        });
        let registry = Arc::new(PeerRegistry::new());
        let store = Arc::new(MessageStore::new_in_memory(100).await.unwrap());
        let (tx, mut rx) = mpsc::channel(16);

        registry.noted("soon-stale");
        let scheduler =
            DiscoveryScheduler::spawn(fast_config(), discovery, registry.clone(), store, tx);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("housekeeping never swept the peer")
            .unwrap();
        assert!(matches!(event, RelayEvent::PeerLost(ref p) if p == "soon-stale"));
        assert!(registry.is_empty());

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_attempts() {
        let discovery = Arc::new(ScriptedDiscovery {
            attempts: AtomicUsize::new(0),
            fail_first: 0,
        });
        let registry = Arc::new(PeerRegistry::new());
        let store = Arc::new(MessageStore::new_in_memory(100).await.unwrap());
        let (tx, _rx) = mpsc::channel(16);

        let scheduler = DiscoveryScheduler::spawn(
            fast_config(),
            discovery.clone(),
            registry,
            store,
            tx,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown().await;

        // shutdown waited for the loops, so the count is frozen the
        // moment it returns
        let after_stop = discovery.attempts.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(discovery.attempts.load(Ordering::SeqCst), after_stop);
    }
}
