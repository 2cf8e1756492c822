//! Inventory-adjusted quoter
//!
//! Identical pricing to the baseline, but the skew term sees an
//! exponentially weighted moving average of the position (alpha 0.1 by
//! default) instead of the instantaneous value. A burst of fills then
//! moves the quotes gradually rather than snapping them, which damps the
//! quote/fill oscillation the raw skew produces in thin books.

use crate::baseline::BaselineQuoter;
use crate::volatility::EwmaVolatility;
use crate::QuoterParams;
use krill_core::fixed_point::mul_fixed;
use krill_core::orderbook::BookSnapshot;
use krill_core::strategy::{MarketSignal, PositionView, QuoteDecision, Quoter};

pub struct InventoryQuoter {
    params: QuoterParams,
    vol: EwmaVolatility,
    /// Fixed-point EWMA weight
    alpha: i64,
    /// Smoothed position, fixed-point
    ewma_position: i64,
    seeded: bool,
}

impl InventoryQuoter {
    pub fn new(params: QuoterParams, alpha: f64) -> Self {
        let alpha_fp = krill_core::fixed_point::from_f64(alpha.clamp(0.0, 1.0))
            .unwrap_or(krill_core::fixed_point::ONE / 10);
        Self {
            params,
            vol: EwmaVolatility::default(),
            alpha: alpha_fp,
            ewma_position: 0,
            seeded: false,
        }
    }

    #[inline]
    fn smooth(&mut self, position: i64) -> i64 {
        if !self.seeded {
            // First observation seeds the average
            self.seeded = true;
            self.ewma_position = position;
        } else {
            self.ewma_position += mul_fixed(self.alpha, position - self.ewma_position);
        }
        self.ewma_position
    }
}

impl Quoter for InventoryQuoter {
    fn compute_quotes(
        &mut self,
        snapshot: &BookSnapshot,
        position: &PositionView,
        _signal: &MarketSignal,
    ) -> QuoteDecision {
        let effective = self.smooth(position.quantity);
        BaselineQuoter::decide(&self.params, &mut self.vol, snapshot, effective)
    }

    fn name(&self) -> &'static str {
        "inventory"
    }

    fn reset(&mut self) {
        self.vol.reset();
        self.ewma_position = 0;
        self.seeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::around_mid;
    use krill_core::fixed_point::SCALE;

    fn view(qty: i64) -> PositionView {
        PositionView {
            quantity: qty,
            avg_price: 0,
        }
    }

    #[test]
    fn first_observation_seeds_average() {
        let mut q = InventoryQuoter::new(crate::tests::test_params(), 0.1);
        assert_eq!(q.smooth(5 * SCALE), 5 * SCALE);
    }

    #[test]
    fn ewma_damps_position_jumps() {
        let mut q = InventoryQuoter::new(crate::tests::test_params(), 0.1);
        q.smooth(0);
        // Position jumps to 10; the smoothed value follows slowly
        let s1 = q.smooth(10 * SCALE);
        assert_eq!(s1, SCALE); // 0 + 0.1 * 10
        let s2 = q.smooth(10 * SCALE);
        assert_eq!(s2, SCALE + 9 * SCALE / 10); // 1 + 0.1 * 9
        assert!(s2 < 10 * SCALE);
    }

    #[test]
    fn quotes_move_less_than_baseline_on_a_jump() {
        let params = crate::tests::test_params();
        let snap = around_mid(100, 2);

        let mut baseline = crate::BaselineQuoter::new(params);
        let mut inventory = InventoryQuoter::new(params, 0.1);

        // Both start flat
        let b_flat = baseline.compute_quotes(&snap, &view(0), &MarketSignal::default());
        inventory.compute_quotes(&snap, &view(0), &MarketSignal::default());

        // Position jumps to half the envelope
        let b_long = baseline.compute_quotes(&snap, &view(5 * SCALE), &MarketSignal::default());
        let i_long = inventory.compute_quotes(&snap, &view(5 * SCALE), &MarketSignal::default());

        let baseline_shift = b_flat.bid_price - b_long.bid_price;
        let inventory_shift = b_flat.bid_price - i_long.bid_price;
        assert!(baseline_shift > 0);
        assert!(
            inventory_shift < baseline_shift,
            "EWMA shift {} should lag baseline {}",
            inventory_shift,
            baseline_shift
        );
    }

    #[test]
    fn converges_to_instantaneous_position() {
        let mut q = InventoryQuoter::new(crate::tests::test_params(), 0.5);
        q.smooth(0);
        for _ in 0..30 {
            q.smooth(4 * SCALE);
        }
        let settled = q.smooth(4 * SCALE);
        assert!((settled - 4 * SCALE).abs() < SCALE / 1_000);
    }

    #[test]
    fn reset_clears_smoothing() {
        let mut q = InventoryQuoter::new(crate::tests::test_params(), 0.1);
        q.smooth(10 * SCALE);
        q.reset();
        assert_eq!(q.smooth(0), 0);
    }
}
