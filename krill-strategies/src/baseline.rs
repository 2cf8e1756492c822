//! Baseline two-sided quoter
//!
//! Fair value is the mid. The quoted spread is the target plus a
//! volatility adjustment, clamped into the configured band. Inventory
//! skews both quotes toward the side that reduces it, and sizes scale
//! down linearly as the position approaches its envelope.

use crate::volatility::EwmaVolatility;
use crate::{
    half_spread_of, round_down_to_tick, round_up_to_tick, scaled_sizes, skew_shift, QuoterParams,
};
use krill_core::orderbook::BookSnapshot;
use krill_core::strategy::{MarketSignal, PositionView, QuoteDecision, Quoter};
use tracing::debug;

pub struct BaselineQuoter {
    params: QuoterParams,
    vol: EwmaVolatility,
}

impl BaselineQuoter {
    pub fn new(params: QuoterParams) -> Self {
        Self {
            params,
            vol: EwmaVolatility::default(),
        }
    }

    /// Quote decision for a given effective position
    ///
    /// Shared with the inventory-adjusted variant, which substitutes its
    /// EWMA position here.
    pub(crate) fn decide(
        params: &QuoterParams,
        vol: &mut EwmaVolatility,
        snapshot: &BookSnapshot,
        effective_position: i64,
    ) -> QuoteDecision {
        if !snapshot.is_valid() {
            return QuoteDecision::no_quote("book invalid");
        }
        let Some(fair_value) = snapshot.mid() else {
            return QuoteDecision::no_quote("mid unavailable");
        };
        vol.on_price(fair_value);

        let spread_bps = (params.target_spread_bps + vol.adjustment_bps())
            .clamp(params.min_spread_bps, params.max_spread_bps);
        let half_spread = half_spread_of(fair_value, spread_bps);
        let shift = skew_shift(params, half_spread, effective_position);

        let bid = round_down_to_tick(fair_value - half_spread - shift, params.tick_size);
        let ask = round_up_to_tick(fair_value + half_spread - shift, params.tick_size);
        if bid <= 0 || bid >= ask {
            return QuoteDecision::no_quote("degenerate quote prices");
        }

        let (bid_size, ask_size) = scaled_sizes(params, effective_position);
        if bid_size == 0 && ask_size == 0 {
            return QuoteDecision::no_quote("sizes below minimum on both sides");
        }

        debug!(bid, ask, bid_size, ask_size, spread_bps, "baseline quote");
        QuoteDecision::quote(bid, bid_size, ask, ask_size)
    }
}

impl Quoter for BaselineQuoter {
    fn compute_quotes(
        &mut self,
        snapshot: &BookSnapshot,
        position: &PositionView,
        _signal: &MarketSignal,
    ) -> QuoteDecision {
        Self::decide(&self.params, &mut self.vol, snapshot, position.quantity)
    }

    fn name(&self) -> &'static str {
        "baseline"
    }

    fn reset(&mut self) {
        self.vol.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{around_mid, crossed, one_sided};
    use krill_core::fixed_point::SCALE;

    fn params() -> QuoterParams {
        crate::tests::test_params()
    }

    fn quote(position: i64) -> QuoteDecision {
        let mut q = BaselineQuoter::new(params());
        let snap = around_mid(100, 2); // mid 100.00, market spread 4 ticks
        q.compute_quotes(
            &snap,
            &PositionView {
                quantity: position,
                avg_price: 0,
            },
            &MarketSignal::default(),
        )
    }

    #[test]
    fn flat_position_quotes_symmetric() {
        let d = quote(0);
        assert!(d.should_quote);
        // 20 bps around 100.00: half spread 0.10
        assert_eq!(d.bid_price, 100 * SCALE - SCALE / 10);
        assert_eq!(d.ask_price, 100 * SCALE + SCALE / 10);
        assert_eq!(d.bid_size, SCALE);
        assert_eq!(d.ask_size, SCALE);
    }

    #[test]
    fn long_position_shifts_both_quotes_down() {
        let flat = quote(0);
        let long = quote(5 * SCALE);
        assert!(long.should_quote);
        assert!(long.bid_price < flat.bid_price);
        assert!(long.ask_price < flat.ask_price);
        // skew = 0.5 * 0.5 = 0.25; shift = 0.25 * 0.10 = 0.025, and the
        // bid rounds down to the 0.01 tick: 99.90 -> 99.87
        assert_eq!(flat.bid_price - long.bid_price, 3 * SCALE / 100);
    }

    #[test]
    fn short_position_shifts_both_quotes_up() {
        let flat = quote(0);
        let short = quote(-5 * SCALE);
        assert!(short.bid_price > flat.bid_price);
        assert!(short.ask_price > flat.ask_price);
    }

    #[test]
    fn sizes_shrink_with_inventory() {
        let d = quote(5 * SCALE);
        assert_eq!(d.bid_size, SCALE / 2);
        assert_eq!(d.ask_size, SCALE / 2);
    }

    #[test]
    fn deep_long_disables_bid() {
        let d = quote(95 * SCALE / 10);
        assert!(d.should_quote);
        assert_eq!(d.bid_size, 0);
        assert_eq!(d.ask_size, params().min_order_size);
    }

    #[test]
    fn invalid_book_does_not_quote() {
        let mut q = BaselineQuoter::new(params());
        let d = q.compute_quotes(
            &one_sided(100 * SCALE, SCALE),
            &PositionView::default(),
            &MarketSignal::default(),
        );
        assert!(!d.should_quote);
        assert_eq!(d.reason, "book invalid");

        let d = q.compute_quotes(
            &crossed(101 * SCALE, 100 * SCALE),
            &PositionView::default(),
            &MarketSignal::default(),
        );
        assert!(!d.should_quote);
    }

    proptest::proptest! {
        /// For any inventory and any sane two-sided book the baseline
        /// never crosses itself and never quotes through the mid
        #[test]
        fn quotes_never_cross(position_tenths in -120i64..120, mid_units in 10i64..10_000) {
            let mut q = BaselineQuoter::new(params());
            let snap = crate::test_helpers::around_mid(mid_units, 2);
            let d = q.compute_quotes(
                &snap,
                &PositionView { quantity: position_tenths * SCALE / 10, avg_price: 0 },
                &MarketSignal::default(),
            );
            if d.should_quote {
                proptest::prop_assert!(d.bid_price > 0);
                proptest::prop_assert!(d.bid_price < d.ask_price);
                proptest::prop_assert!(d.bid_size >= 0 && d.ask_size >= 0);
                proptest::prop_assert!(d.bid_size > 0 || d.ask_size > 0);
            }
        }
    }

    #[test]
    fn quotes_stay_on_tick() {
        let mut q = BaselineQuoter::new(params());
        // Mid at 100.005 puts raw quotes off-tick
        let snap = crate::test_helpers::two_sided(
            100 * SCALE,
            100 * SCALE + SCALE / 100,
            SCALE,
        );
        let d = q.compute_quotes(
            &snap,
            &PositionView::default(),
            &MarketSignal::default(),
        );
        assert!(d.should_quote);
        let tick = params().tick_size;
        assert_eq!(d.bid_price % tick, 0);
        assert_eq!(d.ask_price % tick, 0);
        assert!(d.bid_price < d.ask_price);
    }
}
