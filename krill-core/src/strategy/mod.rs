//! Strategy contract
//!
//! A quoting strategy is a [`Quoter`]: book snapshot + position + signal
//! in, [`QuoteDecision`] out, at most once per tick. Implementations live
//! in the strategies crate and carry their own state records; the engine
//! is generic over the trait so the hot path monomorphizes.

use crate::core::time::{Micros, Nanos};
use crate::core::types::{OrderId, Side};
use crate::exchange::TradeEvent;
use crate::orderbook::BookSnapshot;

/// Gating reason prefixes share "refresh gated" so operators can grep one
/// string for both cases
pub const REASON_MIN_LIFE: &str = "refresh gated: quote below min life";
pub const REASON_REFRESH: &str = "refresh gated: within refresh interval";

/// What the strategy wants on the wire
///
/// A size of 0 disables that side while keeping the other. `reason` is
/// set whenever `should_quote` is false.
#[derive(Debug, Clone, Copy)]
pub struct QuoteDecision {
    pub should_quote: bool,
    pub bid_price: i64,
    pub ask_price: i64,
    pub bid_size: i64,
    pub ask_size: i64,
    pub reason: &'static str,
}

impl QuoteDecision {
    #[inline]
    pub fn quote(bid_price: i64, bid_size: i64, ask_price: i64, ask_size: i64) -> Self {
        Self {
            should_quote: true,
            bid_price,
            ask_price,
            bid_size,
            ask_size,
            reason: "",
        }
    }

    #[inline]
    pub fn no_quote(reason: &'static str) -> Self {
        Self {
            should_quote: false,
            bid_price: 0,
            ask_price: 0,
            bid_size: 0,
            ask_size: 0,
            reason,
        }
    }
}

/// Position inputs to a quote decision
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionView {
    /// Signed fixed-point quantity: positive long
    pub quantity: i64,
    pub avg_price: i64,
}

/// Book-derived signal computed by the strategy worker
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketSignal {
    /// Depth imbalance in fixed-point [-1.0, 1.0]
    pub imbalance: i64,
    /// Last public trade price seen (0 before the first print)
    pub last_trade_price: i64,
}

/// The strategy family interface
pub trait Quoter: Send {
    /// Turn book state, inventory and signal into a quote decision
    ///
    /// Called at most once per tick, only after refresh gating passed.
    fn compute_quotes(
        &mut self,
        snapshot: &BookSnapshot,
        position: &PositionView,
        signal: &MarketSignal,
    ) -> QuoteDecision;

    /// One of our orders filled
    fn on_fill(&mut self, _side: Side, _price: i64, _qty: i64) {}

    /// One of our orders was cancelled
    fn on_cancel(&mut self, _id: OrderId) {}

    /// Public trade print, for volatility estimators
    fn on_trade(&mut self, _trade: &TradeEvent) {}

    fn name(&self) -> &'static str;

    /// Reset internal state (start of session)
    fn reset(&mut self) {}
}

/// Quote-rate gate: refresh interval plus minimum quote life
///
/// Quotes younger than `min_quote_life` are never replaced, even when the
/// strategy would like to; fresh decisions are computed at most once per
/// `quote_refresh` interval.
#[derive(Debug, Clone, Copy)]
pub struct QuoteGate {
    refresh_ns: u64,
    min_life_ns: u64,
    last_eval_ns: Nanos,
    last_quote_ns: Nanos,
}

impl QuoteGate {
    pub fn new(quote_refresh_us: Micros, min_quote_life_us: Micros) -> Self {
        Self {
            refresh_ns: quote_refresh_us * 1_000,
            min_life_ns: min_quote_life_us * 1_000,
            last_eval_ns: 0,
            last_quote_ns: 0,
        }
    }

    /// Check whether a new decision may be computed at `now`
    ///
    /// Returns the gating reason, or `None` when evaluation may proceed
    /// (which also stamps the evaluation time).
    pub fn check(&mut self, now: Nanos) -> Option<&'static str> {
        if self.last_quote_ns != 0 && now.saturating_sub(self.last_quote_ns) < self.min_life_ns {
            return Some(REASON_MIN_LIFE);
        }
        if self.last_eval_ns != 0 && now.saturating_sub(self.last_eval_ns) < self.refresh_ns {
            return Some(REASON_REFRESH);
        }
        self.last_eval_ns = now;
        None
    }

    /// Record that quotes were actually placed at `now`
    pub fn on_quoted(&mut self, now: Nanos) {
        self.last_quote_ns = now;
    }
}
