//! Avellaneda-Stoikov quoter
//!
//! Closed-form inventory model from "High-frequency trading in a limit
//! order book" (Avellaneda & Stoikov, 2008):
//!
//! ```text
//! r     = mid - q * gamma * sigma^2 * t
//! delta = gamma * sigma^2 * t + (2/gamma) * ln(1 + gamma/k)
//! bid   = r - delta/2,  ask = r + delta/2
//! ```
//!
//! Units: the horizon `T`, elapsed time and `t = max(0, T - elapsed)` are
//! seconds; `sigma` is a per-sqrt-second price volatility; `q` is the
//! signed position (relative to the inventory target) in base units. The
//! raw quotes are rounded to the venue tick and clamped into the baseline
//! `[min_spread_bps, max_spread_bps]` band around the mid.

use crate::{round_down_to_tick, round_up_to_tick, scaled_sizes, QuoterParams};
use krill_core::fixed_point::{bps_of, from_f64, to_f64};
use krill_core::orderbook::BookSnapshot;
use krill_core::strategy::{MarketSignal, PositionView, QuoteDecision, Quoter};
use krill_core::core::time::{monotonic_ns, Nanos};
use tracing::debug;

/// Model parameters; see module docs for units
#[derive(Debug, Clone, Copy)]
pub struct AsParams {
    /// Risk aversion (gamma > 0)
    pub gamma: f64,
    /// Volatility per sqrt-second
    pub sigma: f64,
    /// Order arrival intensity (k > 0)
    pub arrival_k: f64,
    /// Session horizon in seconds
    pub horizon_secs: f64,
}

pub struct AvellanedaStoikov {
    params: QuoterParams,
    model: AsParams,
    start_ns: Nanos,
}

impl AvellanedaStoikov {
    pub fn new(params: QuoterParams, model: AsParams) -> Self {
        Self {
            params,
            model,
            start_ns: monotonic_ns(),
        }
    }

    /// Seconds left before the horizon expires
    fn t_remaining(&self, now: Nanos) -> f64 {
        let elapsed = now.saturating_sub(self.start_ns) as f64 / 1e9;
        (self.model.horizon_secs - elapsed).max(0.0)
    }

    /// The constant (inventory-independent) half of the optimal spread
    fn intensity_term(&self) -> f64 {
        (2.0 / self.model.gamma) * (1.0 + self.model.gamma / self.model.arrival_k).ln()
    }

    fn decide(&self, snapshot: &BookSnapshot, position: i64, t_remaining: f64) -> QuoteDecision {
        if !snapshot.is_valid() {
            return QuoteDecision::no_quote("book invalid");
        }
        let Some(mid) = snapshot.mid() else {
            return QuoteDecision::no_quote("mid unavailable");
        };

        let q = to_f64(position - self.params.inventory_target);
        let risk_term = self.model.gamma * self.model.sigma * self.model.sigma * t_remaining;

        let reservation = to_f64(mid) - q * risk_term;
        let delta = risk_term + self.intensity_term();
        let raw_bid = reservation - delta / 2.0;
        let raw_ask = reservation + delta / 2.0;

        let (Ok(mut bid), Ok(mut ask)) = (from_f64(raw_bid), from_f64(raw_ask)) else {
            return QuoteDecision::no_quote("reservation price out of range");
        };

        // Clamp each quote into the baseline spread band around the mid
        let half_min = bps_of(mid, self.params.min_spread_bps) / 2;
        let half_max = bps_of(mid, self.params.max_spread_bps) / 2;
        bid = bid.clamp(mid - half_max, mid - half_min);
        ask = ask.clamp(mid + half_min, mid + half_max);

        bid = round_down_to_tick(bid, self.params.tick_size);
        ask = round_up_to_tick(ask, self.params.tick_size);
        if bid <= 0 || bid >= ask {
            return QuoteDecision::no_quote("degenerate quote prices");
        }

        let (bid_size, ask_size) = scaled_sizes(&self.params, position);
        if bid_size == 0 && ask_size == 0 {
            return QuoteDecision::no_quote("sizes below minimum on both sides");
        }

        debug!(bid, ask, reservation, delta, t_remaining, "avellaneda quote");
        QuoteDecision::quote(bid, bid_size, ask, ask_size)
    }
}

impl Quoter for AvellanedaStoikov {
    fn compute_quotes(
        &mut self,
        snapshot: &BookSnapshot,
        position: &PositionView,
        _signal: &MarketSignal,
    ) -> QuoteDecision {
        let t = self.t_remaining(monotonic_ns());
        self.decide(snapshot, position.quantity, t)
    }

    fn name(&self) -> &'static str {
        "avellaneda_stoikov"
    }

    fn reset(&mut self) {
        self.start_ns = monotonic_ns();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{around_mid, one_sided};
    use approx::assert_relative_eq;
    use krill_core::fixed_point::SCALE;

    fn model() -> AsParams {
        AsParams {
            gamma: 0.1,
            sigma: 2.0,
            arrival_k: 1.5,
            horizon_secs: 300.0,
        }
    }

    fn quoter() -> AvellanedaStoikov {
        AvellanedaStoikov::new(crate::tests::test_params(), model())
    }

    #[test]
    fn flat_inventory_centers_on_mid() {
        let q = quoter();
        let snap = around_mid(100, 2);
        let d = q.decide(&snap, 0, 60.0);
        assert!(d.should_quote);

        let mid = 100 * SCALE;
        // Symmetric around the mid when q = 0
        assert_eq!(mid - d.bid_price, d.ask_price - mid);
    }

    #[test]
    fn long_inventory_lowers_reservation_price() {
        let q = quoter();
        let snap = around_mid(100, 2);
        let flat = q.decide(&snap, 0, 60.0);
        let long = q.decide(&snap, SCALE, 60.0);
        assert!(long.bid_price <= flat.bid_price);
        assert!(long.ask_price <= flat.ask_price);

        let short = q.decide(&snap, -SCALE, 60.0);
        assert!(short.bid_price >= flat.bid_price);
        assert!(short.ask_price >= flat.ask_price);
    }

    #[test]
    fn spread_decays_toward_intensity_floor() {
        let q = quoter();
        let snap = around_mid(100, 2);

        let early = q.decide(&snap, 0, 300.0);
        let late = q.decide(&snap, 0, 1.0);
        let early_spread = early.ask_price - early.bid_price;
        let late_spread = late.ask_price - late.bid_price;
        assert!(late_spread <= early_spread);

        // At t = 0 only the intensity term is left (pre-clamp)
        let floor = q.intensity_term();
        let expected = (2.0 / 0.1) * (1.0 + 0.1 / 1.5f64).ln();
        assert_relative_eq!(floor, expected, epsilon = 1e-12);
    }

    #[test]
    fn quotes_clamped_into_spread_band() {
        // Huge risk term pushes the raw quotes far outside the band
        let mut model = model();
        model.sigma = 50.0;
        let q = AvellanedaStoikov::new(crate::tests::test_params(), model);
        let snap = around_mid(100, 2);

        let d = q.decide(&snap, 2 * SCALE, 300.0);
        assert!(d.should_quote);

        let mid = 100 * SCALE;
        let half_max = bps_of(mid, crate::tests::test_params().max_spread_bps) / 2;
        assert!(d.bid_price >= mid - half_max - crate::tests::test_params().tick_size);
        assert!(d.ask_price <= mid + half_max + crate::tests::test_params().tick_size);
        assert!(d.bid_price < mid && mid < d.ask_price);
    }

    #[test]
    fn invalid_book_refuses_to_quote() {
        let q = quoter();
        let d = q.decide(&one_sided(100 * SCALE, SCALE), 0, 60.0);
        assert!(!d.should_quote);
        assert_eq!(d.reason, "book invalid");
    }

    #[test]
    fn horizon_countdown() {
        let mut q = quoter();
        let t0 = q.t_remaining(q.start_ns);
        assert_relative_eq!(t0, 300.0, epsilon = 1e-9);
        let t1 = q.t_remaining(q.start_ns + 10_000_000_000); // +10s
        assert_relative_eq!(t1, 290.0, epsilon = 1e-6);
        // Past the horizon: floors at zero
        let t2 = q.t_remaining(q.start_ns + 400 * 1_000_000_000);
        assert_eq!(t2, 0.0);
        q.reset();
        assert!(q.t_remaining(monotonic_ns()) <= 300.0);
    }
}
