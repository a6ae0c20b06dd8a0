//! Runtime metrics.
//!
//! Two scopes, matching the teacher's atomics-based design:
//!
//! - [`EngineMetrics`] is instance-owned by a [`crate::engine::FeedEngine`]
//!   — multiple engines may coexist (e.g. in tests), so these counters
//!   cannot live behind a single global.
//! - [`RuntimeMetrics`] is a process-wide singleton for the websocket
//!   ingestion layer (connection lifecycle), which sits outside the
//!   engine's ownership, mirroring the teacher's global `METRICS`.
//!
//! Both are lock-free: counters are written only by their single owning
//! thread and may be read with stale-but-never-torn values from anywhere.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use once_cell::sync::Lazy;

/// Per-type message counters for one feed engine.
///
/// `snapshot_count + delta_count + trade_count + unknown_count` always
/// equals `total_frames_ingested()`.
#[derive(Default)]
pub struct EngineMetrics {
    pub snapshot_count: AtomicUsize,
    pub delta_count: AtomicUsize,
    pub trade_count: AtomicUsize,
    pub unknown_count: AtomicUsize,
    pub parse_error_count: AtomicUsize,
    pub sequence_gap_count: AtomicUsize,
    pub delta_before_snapshot_count: AtomicUsize,
    pub bbo_emitted_count: AtomicUsize,
    pub egress_error_count: AtomicUsize,
    pub book_inconsistent_count: AtomicUsize,
}

impl EngineMetrics {
    pub fn total_frames_ingested(&self) -> usize {
        use std::sync::atomic::Ordering::Relaxed;
        self.snapshot_count.load(Relaxed)
            + self.delta_count.load(Relaxed)
            + self.trade_count.load(Relaxed)
            + self.unknown_count.load(Relaxed)
    }
}

/// Global runtime metrics for the websocket ingestion layer.
#[derive(Default)]
pub struct RuntimeMetrics {
    pub ws_connections_active: AtomicUsize,
    pub ws_reconnects: AtomicUsize,
    pub subscriptions_sent: AtomicUsize,
    pub subscription_errors: AtomicUsize,
    pub dropped_messages: AtomicUsize,
}

/// Global metrics registry (singleton), for the ingestion layer only.
pub static METRICS: Lazy<Arc<RuntimeMetrics>> = Lazy::new(|| Arc::new(RuntimeMetrics::default()));
