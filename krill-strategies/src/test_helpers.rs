//! Snapshot builders shared by the strategy tests

use krill_core::fixed_point::SCALE;
use krill_core::orderbook::{BookSnapshot, BookState};
use krill_core::Symbol;

/// Two-sided snapshot with one level each side
pub fn two_sided(bid_price: i64, ask_price: i64, qty: i64) -> BookSnapshot {
    let mut snap = BookSnapshot::empty(Symbol::new("BTCUSDT").unwrap());
    snap.state = BookState::TwoSided;
    snap.sequence = 1;
    snap.bids[0] = (bid_price, qty);
    snap.bid_depth = 1;
    snap.asks[0] = (ask_price, qty);
    snap.ask_depth = 1;
    snap
}

/// Convenience: symmetric book around a whole-dollar mid
pub fn around_mid(mid_units: i64, spread_ticks: i64) -> BookSnapshot {
    let tick = SCALE / 100;
    let mid = mid_units * SCALE;
    two_sided(mid - spread_ticks * tick, mid + spread_ticks * tick, SCALE)
}

/// One-sided (non-quotable) snapshot
pub fn one_sided(bid_price: i64, qty: i64) -> BookSnapshot {
    let mut snap = BookSnapshot::empty(Symbol::new("BTCUSDT").unwrap());
    snap.state = BookState::OneSided;
    snap.bids[0] = (bid_price, qty);
    snap.bid_depth = 1;
    snap
}

/// Crossed (transient, non-quotable) snapshot
pub fn crossed(bid_price: i64, ask_price: i64) -> BookSnapshot {
    let mut snap = two_sided(bid_price, ask_price, SCALE);
    snap.state = BookState::CrossedTransient;
    snap
}
