//! Risk limit snapshots
//!
//! Limits are immutable once published. Reconfiguration swaps the whole
//! `Arc` so a check in flight keeps the set it started with; readers
//! never see a half-updated limit table.

use parking_lot::RwLock;
use std::sync::Arc;

/// Pre-trade limit set, all money/quantity fields in fixed-point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskLimits {
    /// Max quantity per order
    pub max_order_qty: i64,
    /// Max notional per order
    pub max_order_value: i64,
    /// Rolling one-second outbound order budget
    pub max_orders_per_second: u32,
    /// Max simultaneously open orders
    pub max_open_orders: u32,
    /// Max absolute position quantity after a worst-case fill
    pub max_position_qty: i64,
    /// Max absolute position notional after a worst-case fill
    pub max_position_value: i64,
    /// Daily realized loss budget (positive number)
    pub max_daily_loss: i64,
    /// Max equity drop from the peak (positive number)
    pub max_drawdown: i64,
    /// Max distance between order price and reference, in basis points
    pub max_deviation_bps: i64,
    /// Consecutive errors before the kill switch fires
    pub error_threshold: u32,
    /// Venue rejects before the kill switch fires
    pub reject_threshold: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        use crate::core::fixed_point::SCALE;
        Self {
            max_order_qty: 10 * SCALE,
            max_order_value: 1_000_000 * SCALE,
            max_orders_per_second: 10,
            max_open_orders: 16,
            max_position_qty: 50 * SCALE,
            max_position_value: 5_000_000 * SCALE,
            max_daily_loss: 10_000 * SCALE,
            max_drawdown: 25_000 * SCALE,
            max_deviation_bps: 500,
            error_threshold: 5,
            reject_threshold: 5,
        }
    }
}

/// Hot-swappable holder for the active limit snapshot
///
/// Readers clone the `Arc` under a read lock (one uncontended atomic in
/// parking_lot); writers publish a whole new snapshot.
#[derive(Debug)]
pub struct LimitsHolder {
    current: RwLock<Arc<RiskLimits>>,
}

impl LimitsHolder {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            current: RwLock::new(Arc::new(limits)),
        }
    }

    /// Snapshot in effect right now
    #[inline]
    pub fn load(&self) -> Arc<RiskLimits> {
        Arc::clone(&self.current.read())
    }

    /// Publish a new snapshot; checks already running keep the old one
    pub fn store(&self, limits: RiskLimits) {
        *self.current.write() = Arc::new(limits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_visible_to_new_loads() {
        let holder = LimitsHolder::new(RiskLimits::default());
        let before = holder.load();

        let mut updated = RiskLimits::default();
        updated.max_open_orders = 2;
        holder.store(updated);

        // Old snapshot untouched, new loads see the change
        assert_ne!(before.max_open_orders, 2);
        assert_eq!(holder.load().max_open_orders, 2);
    }
}
