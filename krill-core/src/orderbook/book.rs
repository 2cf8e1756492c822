//! L2 order book with optional per-order (L3) maintenance
//!
//! One book per symbol, owned by the tick worker; everything else sees it
//! through `BookSnapshot` copies. Sides are sorted maps keyed by
//! fixed-point price: bids are read in descending order, asks ascending.
//!
//! Invariants after every mutation:
//! - no zero-quantity level is ever stored
//! - `sequence` strictly increases across accepted updates
//! - a crossed or locked top of book parks the state in
//!   `CrossedTransient`; the book stays readable but is not quotable until
//!   a consistent update or snapshot clears it

use crate::core::time::Nanos;
use crate::core::types::{OrderId, Side, Symbol};
use crate::orderbook::depth::{self, Vwap};
use crate::orderbook::snapshot::{BookSnapshot, TOP_DEPTH};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// One aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: i64,
    pub quantity: i64,
    pub order_count: u32,
    pub last_update: Nanos,
}

/// Book lifecycle state
///
/// `CrossedTransient` is the only non-quotable live state: the most recent
/// update won on its own side, leaving best_bid >= best_ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BookState {
    #[default]
    Empty = 0,
    OneSided = 1,
    TwoSided = 2,
    CrossedTransient = 3,
}

/// Result of applying an adapter-sequenced update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// Sequence not strictly greater than the last accepted one
    StaleDropped,
    /// Applied, but the sequence jumped by more than the resync threshold
    GapDetected(u64),
}

/// Per-order entry for the L3 index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrder {
    pub id: OrderId,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
}

/// Default gap size that should trigger a resync request
pub const DEFAULT_GAP_THRESHOLD: u64 = 1_000;

/// L2 aggregated order book for a single symbol
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BTreeMap<i64, PriceLevel>,
    asks: BTreeMap<i64, PriceLevel>,
    /// L3 index, populated only when the feed carries per-order updates
    orders: HashMap<OrderId, BookOrder>,
    /// Internal sequence, bumped on every accepted mutation
    sequence: u64,
    /// Last adapter-supplied sequence accepted
    external_seq: u64,
    last_update: Nanos,
    state: BookState,
    gap_threshold: u64,
    /// Updates dropped for stale sequence numbers
    stale_drops: u64,
    top_bids: Vec<(i64, i64)>,
    top_asks: Vec<(i64, i64)>,
    cache_dirty: bool,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self::with_gap_threshold(symbol, DEFAULT_GAP_THRESHOLD)
    }

    pub fn with_gap_threshold(symbol: Symbol, gap_threshold: u64) -> Self {
        Self {
            symbol,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: HashMap::new(),
            sequence: 0,
            external_seq: 0,
            last_update: 0,
            state: BookState::Empty,
            gap_threshold,
            stale_drops: 0,
            top_bids: Vec::with_capacity(TOP_DEPTH),
            top_asks: Vec::with_capacity(TOP_DEPTH),
            cache_dirty: true,
        }
    }

    #[inline(always)]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    #[inline(always)]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline(always)]
    pub fn last_update(&self) -> Nanos {
        self.last_update
    }

    #[inline(always)]
    pub fn state(&self) -> BookState {
        self.state
    }

    /// Quotable: both sides present and not crossed
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.state == BookState::TwoSided
    }

    #[inline]
    pub fn stale_drops(&self) -> u64 {
        self.stale_drops
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Apply one L2 delta: quantity 0 removes the level, anything else
    /// inserts or replaces it
    pub fn apply_l2_update(&mut self, side: Side, price: i64, quantity: i64, ts: Nanos) {
        let levels = self.side_mut(side);
        if quantity <= 0 {
            levels.remove(&price);
        } else {
            levels
                .entry(price)
                .and_modify(|l| {
                    l.quantity = quantity;
                    l.last_update = ts;
                })
                .or_insert(PriceLevel {
                    price,
                    quantity,
                    order_count: 1,
                    last_update: ts,
                });
        }
        self.commit(ts);
    }

    /// Apply an adapter-sequenced L2 delta
    ///
    /// Updates whose sequence is not strictly greater than the last
    /// accepted one are dropped and counted. A jump past the gap
    /// threshold is applied but reported so the caller can request a
    /// resync.
    pub fn apply_external(
        &mut self,
        seq: u64,
        side: Side,
        price: i64,
        quantity: i64,
        ts: Nanos,
    ) -> UpdateOutcome {
        if seq <= self.external_seq {
            self.stale_drops += 1;
            debug!(
                symbol = %self.symbol,
                seq,
                current = self.external_seq,
                "dropping stale book update"
            );
            return UpdateOutcome::StaleDropped;
        }

        let gap = seq - self.external_seq - 1;
        self.external_seq = seq;
        self.apply_l2_update(side, price, quantity, ts);

        if gap > self.gap_threshold {
            warn!(symbol = %self.symbol, gap, "book sequence gap beyond threshold");
            return UpdateOutcome::GapDetected(gap);
        }
        UpdateOutcome::Applied
    }

    /// Replace both sides atomically (initial sync / resync)
    ///
    /// Zero-quantity entries in the input are skipped. The L3 index is
    /// cleared: a venue snapshot is aggregate-only.
    pub fn apply_snapshot(&mut self, bids: &[(i64, i64)], asks: &[(i64, i64)], ts: Nanos) {
        self.bids.clear();
        self.asks.clear();
        self.orders.clear();
        for &(price, quantity) in bids {
            if quantity > 0 {
                self.bids.insert(
                    price,
                    PriceLevel {
                        price,
                        quantity,
                        order_count: 1,
                        last_update: ts,
                    },
                );
            }
        }
        for &(price, quantity) in asks {
            if quantity > 0 {
                self.asks.insert(
                    price,
                    PriceLevel {
                        price,
                        quantity,
                        order_count: 1,
                        last_update: ts,
                    },
                );
            }
        }
        self.commit(ts);
    }

    /// Reset the adapter sequence after a resync snapshot
    pub fn reset_external_seq(&mut self, seq: u64) {
        self.external_seq = seq;
    }

    /// L3: add an order and fold it into its level's aggregate
    pub fn apply_l3_add(&mut self, order: BookOrder, ts: Nanos) {
        if order.quantity <= 0 {
            return;
        }
        self.orders.insert(order.id, order);
        let levels = self.side_mut(order.side);
        levels
            .entry(order.price)
            .and_modify(|l| {
                l.quantity += order.quantity;
                l.order_count += 1;
                l.last_update = ts;
            })
            .or_insert(PriceLevel {
                price: order.price,
                quantity: order.quantity,
                order_count: 1,
                last_update: ts,
            });
        self.commit(ts);
    }

    /// L3: change an order's quantity in place (same price)
    pub fn apply_l3_modify(&mut self, id: OrderId, new_quantity: i64, ts: Nanos) {
        let Some(order) = self.orders.get_mut(&id) else {
            return;
        };
        let delta = new_quantity - order.quantity;
        let (side, price) = (order.side, order.price);
        if new_quantity <= 0 {
            self.orders.remove(&id);
            self.rederive_level(side, price, delta, true, ts);
        } else {
            order.quantity = new_quantity;
            self.rederive_level(side, price, delta, false, ts);
        }
        self.commit(ts);
    }

    /// L3: remove an order and shrink its level
    pub fn apply_l3_remove(&mut self, id: OrderId, ts: Nanos) {
        let Some(order) = self.orders.remove(&id) else {
            return;
        };
        self.rederive_level(order.side, order.price, -order.quantity, true, ts);
        self.commit(ts);
    }

    fn rederive_level(&mut self, side: Side, price: i64, delta: i64, removed: bool, ts: Nanos) {
        let levels = self.side_mut(side);
        if let Some(level) = levels.get_mut(&price) {
            level.quantity += delta;
            if removed {
                level.order_count = level.order_count.saturating_sub(1);
            }
            level.last_update = ts;
            if level.quantity <= 0 || level.order_count == 0 {
                levels.remove(&price);
            }
        }
    }

    fn commit(&mut self, ts: Nanos) {
        self.sequence += 1;
        self.last_update = ts;
        self.cache_dirty = true;
        self.state = match (self.bids.last_key_value(), self.asks.first_key_value()) {
            (None, None) => BookState::Empty,
            (Some(_), None) | (None, Some(_)) => BookState::OneSided,
            (Some((bid, _)), Some((ask, _))) => {
                if bid >= ask {
                    BookState::CrossedTransient
                } else {
                    BookState::TwoSided
                }
            }
        };
    }

    #[inline(always)]
    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<i64, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[inline]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.last_key_value().map(|(_, l)| l)
    }

    #[inline]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first_key_value().map(|(_, l)| l)
    }

    /// Exact fixed-point mid; undefined unless both sides are present
    #[inline]
    pub fn mid(&self) -> Option<i64> {
        depth::mid_price(
            self.best_bid().map(|l| l.price).unwrap_or(0),
            self.best_ask().map(|l| l.price).unwrap_or(0),
        )
    }

    #[inline]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some(a.price - b.price),
            _ => None,
        }
    }

    /// Spread in fixed-point basis points relative to the mid
    #[inline]
    pub fn spread_bps(&self) -> Option<i64> {
        depth::spread_bps(
            self.best_bid().map(|l| l.price).unwrap_or(0),
            self.best_ask().map(|l| l.price).unwrap_or(0),
        )
    }

    /// VWAP walking from the top of `side` toward `target_qty`
    pub fn vwap(&mut self, side: Side, target_qty: i64) -> Option<Vwap> {
        self.refresh_cache();
        let levels = match side {
            Side::Buy => &self.top_bids,
            Side::Sell => &self.top_asks,
        };
        depth::vwap(levels, target_qty)
    }

    /// Imbalance over the top `levels` entries of each side
    pub fn imbalance(&mut self, levels: usize) -> i64 {
        self.refresh_cache();
        depth::imbalance(&self.top_bids, &self.top_asks, levels)
    }

    #[inline]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[inline]
    pub fn open_order_count(&self) -> usize {
        self.orders.len()
    }

    /// Copy the top of book into a queue-friendly snapshot
    pub fn snapshot(&mut self) -> BookSnapshot {
        self.refresh_cache();
        let mut snap = BookSnapshot::empty(self.symbol);
        snap.sequence = self.sequence;
        snap.ts = self.last_update;
        snap.state = self.state;
        snap.bid_depth = self.top_bids.len();
        snap.ask_depth = self.top_asks.len();
        snap.bids[..snap.bid_depth].copy_from_slice(&self.top_bids);
        snap.asks[..snap.ask_depth].copy_from_slice(&self.top_asks);
        snap
    }

    fn refresh_cache(&mut self) {
        if !self.cache_dirty {
            return;
        }
        self.top_bids.clear();
        self.top_bids.extend(
            self.bids
                .iter()
                .rev()
                .take(TOP_DEPTH)
                .map(|(_, l)| (l.price, l.quantity)),
        );
        self.top_asks.clear();
        self.top_asks.extend(
            self.asks
                .iter()
                .take(TOP_DEPTH)
                .map(|(_, l)| (l.price, l.quantity)),
        );
        self.cache_dirty = false;
    }
}
