//! Engine counters
//!
//! All counters are relaxed atomics: they feed logs and operator
//! introspection, never control flow.

use crate::core::errors::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineStats {
    pub ticks_processed: AtomicU64,
    pub snapshots_published: AtomicU64,
    pub decisions: AtomicU64,
    pub orders_sent: AtomicU64,
    pub pretrade_rejects: AtomicU64,
    pub fills: AtomicU64,
    pub resync_requests: AtomicU64,
    /// Producer-side drops per queue, written as workers exit
    pub tick_queue_drops: AtomicU64,
    pub snapshot_queue_drops: AtomicU64,
    pub decision_queue_drops: AtomicU64,
    pub order_update_queue_drops: AtomicU64,
    pub trade_queue_drops: AtomicU64,
    pub control_queue_drops: AtomicU64,
    errors: [AtomicU64; ErrorKind::COUNT],
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_error(&self, kind: ErrorKind) {
        self.errors[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors[kind.index()].load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_counters_by_kind() {
        let stats = EngineStats::new();
        stats.record_error(ErrorKind::Risk);
        stats.record_error(ErrorKind::Risk);
        stats.record_error(ErrorKind::Protocol);

        assert_eq!(stats.error_count(ErrorKind::Risk), 2);
        assert_eq!(stats.error_count(ErrorKind::Protocol), 1);
        assert_eq!(stats.error_count(ErrorKind::Internal), 0);
        assert_eq!(stats.total_errors(), 3);
    }
}
