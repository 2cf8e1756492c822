//! Copyable top-of-book snapshot
//!
//! The tick worker owns the live book; everyone downstream works from
//! these fixed-size copies handed over the strategy queue. No heap, no
//! shared pointers, no lifetime back into the book.

use crate::core::time::Nanos;
use crate::core::types::{Side, Symbol};
use crate::orderbook::book::BookState;
use crate::orderbook::depth::{self, Vwap};

/// Levels carried per side in a snapshot
pub const TOP_DEPTH: usize = 16;

/// Fixed-size view of the top of one book
#[derive(Debug, Clone, Copy)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub sequence: u64,
    pub ts: Nanos,
    pub state: BookState,
    /// (price, quantity) best-first
    pub bids: [(i64, i64); TOP_DEPTH],
    pub asks: [(i64, i64); TOP_DEPTH],
    pub bid_depth: usize,
    pub ask_depth: usize,
}

impl BookSnapshot {
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            sequence: 0,
            ts: 0,
            state: BookState::Empty,
            bids: [(0, 0); TOP_DEPTH],
            asks: [(0, 0); TOP_DEPTH],
            bid_depth: 0,
            ask_depth: 0,
        }
    }

    #[inline(always)]
    pub fn bid_levels(&self) -> &[(i64, i64)] {
        &self.bids[..self.bid_depth]
    }

    #[inline(always)]
    pub fn ask_levels(&self) -> &[(i64, i64)] {
        &self.asks[..self.ask_depth]
    }

    #[inline]
    pub fn best_bid(&self) -> Option<(i64, i64)> {
        self.bid_levels().first().copied()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<(i64, i64)> {
        self.ask_levels().first().copied()
    }

    /// Quotable: both sides present and not crossed
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.state == BookState::TwoSided
    }

    #[inline]
    pub fn mid(&self) -> Option<i64> {
        depth::mid_price(
            self.best_bid().map(|(p, _)| p).unwrap_or(0),
            self.best_ask().map(|(p, _)| p).unwrap_or(0),
        )
    }

    #[inline]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((b, _)), Some((a, _))) => Some(a - b),
            _ => None,
        }
    }

    /// Spread in fixed-point basis points relative to the mid
    #[inline]
    pub fn spread_bps(&self) -> Option<i64> {
        depth::spread_bps(
            self.best_bid().map(|(p, _)| p).unwrap_or(0),
            self.best_ask().map(|(p, _)| p).unwrap_or(0),
        )
    }

    pub fn vwap(&self, side: Side, target_qty: i64) -> Option<Vwap> {
        let levels = match side {
            Side::Buy => self.bid_levels(),
            Side::Sell => self.ask_levels(),
        };
        depth::vwap(levels, target_qty)
    }

    pub fn imbalance(&self, levels: usize) -> i64 {
        depth::imbalance(self.bid_levels(), self.ask_levels(), levels)
    }
}
