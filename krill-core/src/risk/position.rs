//! Position and PnL accounting
//!
//! The per-symbol map is the one mutex-guarded structure in the engine;
//! every critical section is a map lookup plus scalar updates. Cost-basis
//! rules: same-signed fills re-average the entry price by notional,
//! opposite-signed fills close `min(|pos|, fill)` at the held average and
//! realize the difference, with any residual opening a fresh position at
//! the fill price.

use crate::core::fixed_point::{div_round_half_even, mul_fixed, SCALE};
use crate::core::time::Nanos;
use crate::core::types::{Side, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Snapshot of one symbol's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionState {
    /// Signed quantity: positive long, negative short
    pub quantity: i64,
    /// Average entry price of the open quantity
    pub avg_price: i64,
    /// Cumulative realized PnL
    pub realized_pnl: i64,
    /// Unrealized PnL at the last mark
    pub unrealized_pnl: i64,
    /// Last mark price seen (0 before the first mark)
    pub last_mark: i64,
    pub last_update: Nanos,
}

/// Deltas produced by applying one fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEffect {
    /// Realized PnL from the closed leg (0 when extending)
    pub realized: i64,
    /// Change in unrealized PnL implied by the new position/avg
    pub unrealized_delta: i64,
    /// Signed position after the fill
    pub position_after: i64,
}

/// All positions, keyed by symbol
#[derive(Debug, Default)]
pub struct PositionBook {
    map: Mutex<HashMap<Symbol, PositionState>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill under the cost-basis rules
    pub fn apply_fill(
        &self,
        symbol: Symbol,
        side: Side,
        price: i64,
        qty: i64,
        ts: Nanos,
    ) -> FillEffect {
        let mut map = self.map.lock();
        let pos = map.entry(symbol).or_default();

        let delta = side.sign() * qty;
        let old_qty = pos.quantity;
        let mut realized = 0i64;

        if old_qty == 0 || old_qty.signum() == delta.signum() {
            // Extending (or opening): notional-weighted average price
            let old_notional = pos.avg_price as i128 * old_qty.unsigned_abs() as i128;
            let fill_notional = price as i128 * qty as i128;
            let total_qty = old_qty.unsigned_abs() as i128 + qty as i128;
            pos.avg_price =
                div_round_half_even(old_notional + fill_notional, total_qty) as i64;
            pos.quantity = old_qty + delta;
        } else {
            // Reducing or flipping: realize the closed leg at the held avg
            let closed = old_qty.unsigned_abs().min(qty as u64) as i64;
            let leg = div_round_half_even(
                (price - pos.avg_price) as i128 * closed as i128,
                SCALE as i128,
            ) as i64;
            realized = if old_qty > 0 { leg } else { -leg };

            pos.realized_pnl += realized;
            pos.quantity = old_qty + delta;
            if pos.quantity == 0 {
                pos.avg_price = 0;
            } else if pos.quantity.signum() != old_qty.signum() {
                // Residual opened on the other side at the fill price
                pos.avg_price = price;
            }
        }

        // Keep unrealized consistent with the last mark without waiting
        // for the next periodic pass
        let unrealized_delta = if pos.last_mark > 0 {
            let new_unrealized = mul_fixed(pos.last_mark - pos.avg_price, pos.quantity);
            let d = new_unrealized - pos.unrealized_pnl;
            pos.unrealized_pnl = new_unrealized;
            d
        } else {
            0
        };

        pos.last_update = ts;
        FillEffect {
            realized,
            unrealized_delta,
            position_after: pos.quantity,
        }
    }

    /// Re-mark one symbol: `(mark - avg) * position`
    ///
    /// Returns the change in unrealized PnL.
    pub fn mark(&self, symbol: Symbol, mark: i64, ts: Nanos) -> i64 {
        let mut map = self.map.lock();
        let Some(pos) = map.get_mut(&symbol) else {
            return 0;
        };
        pos.last_mark = mark;
        let new_unrealized = if pos.quantity == 0 {
            0
        } else {
            mul_fixed(mark - pos.avg_price, pos.quantity)
        };
        let delta = new_unrealized - pos.unrealized_pnl;
        pos.unrealized_pnl = new_unrealized;
        pos.last_update = ts;
        delta
    }

    /// Copy of one symbol's state
    pub fn get(&self, symbol: Symbol) -> Option<PositionState> {
        self.map.lock().get(&symbol).copied()
    }

    /// Signed quantity for one symbol (0 when flat)
    #[inline]
    pub fn quantity(&self, symbol: Symbol) -> i64 {
        self.map.lock().get(&symbol).map_or(0, |p| p.quantity)
    }

    /// Sum of realized PnL across symbols
    pub fn total_realized(&self) -> i64 {
        self.map.lock().values().map(|p| p.realized_pnl).sum()
    }

    /// Sum of unrealized PnL across symbols
    pub fn total_unrealized(&self) -> i64 {
        self.map.lock().values().map(|p| p.unrealized_pnl).sum()
    }
}
