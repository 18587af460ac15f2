//! Metric descriptions for the relay's counters
//!
//! The crate emits counters through the `metrics` facade; hosts install
//! whichever recorder suits them. Without one the counters are no-ops.

use metrics::describe_counter;
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Register metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "driftmesh_messages_originated_total",
        "Messages created on this node"
    );
    describe_counter!(
        "driftmesh_messages_relayed_total",
        "Messages accepted from peers for forwarding"
    );
    describe_counter!(
        "driftmesh_messages_evicted_total",
        "Messages dropped to stay within store capacity"
    );
    describe_counter!(
        "driftmesh_messages_purged_total",
        "Messages removed by expiry housekeeping"
    );
    describe_counter!(
        "driftmesh_sessions_total",
        "Sync sessions completed successfully"
    );
    describe_counter!(
        "driftmesh_sessions_failed_total",
        "Sync sessions that aborted with an error"
    );
}
