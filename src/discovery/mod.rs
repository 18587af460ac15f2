//! Discovery-retry scheduling
//!
//! Decides when discovery attempts happen: exponential backoff on
//! failure, reset on success, plus the fixed-period housekeeping pass
//! (stale-peer sweep, expiry purge).

pub mod backoff;
pub mod scheduler;

pub use backoff::RetryBackoff;
pub use scheduler::{DiscoveryScheduler, SchedulerConfig};
