//! Depth metrics over (price, quantity) level slices
//!
//! Shared by the live book (over its top-of-book cache) and by
//! `BookSnapshot` (over its inline arrays). All arithmetic is integer
//! fixed-point with i128 intermediates.

use crate::core::fixed_point::{div_round_half_even, SCALE};

/// Volume-weighted average price over walked levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vwap {
    /// Weighted price of the filled portion, fixed-point
    pub price: i64,
    /// Quantity actually available toward the target, fixed-point
    pub filled_qty: i64,
    /// False when the side ran out of depth before the target quantity
    pub complete: bool,
}

/// Walk levels from the top until `target_qty` is filled
///
/// Levels must be ordered best-first. Returns `None` when the side has no
/// liquidity at all; otherwise the (possibly partial) VWAP with the
/// `complete` flag.
pub fn vwap(levels: &[(i64, i64)], target_qty: i64) -> Option<Vwap> {
    if target_qty <= 0 {
        return None;
    }

    let mut remaining = target_qty;
    let mut value: i128 = 0;
    let mut filled: i64 = 0;

    for &(price, qty) in levels {
        if qty <= 0 {
            break;
        }
        let take = qty.min(remaining);
        value += price as i128 * take as i128;
        filled += take;
        remaining -= take;
        if remaining == 0 {
            break;
        }
    }

    if filled == 0 {
        return None;
    }

    Some(Vwap {
        price: div_round_half_even(value, filled as i128) as i64,
        filled_qty: filled,
        complete: remaining == 0,
    })
}

/// Order-flow imbalance over the top `levels` entries of each side
///
/// `(sum_bid - sum_ask) / (sum_bid + sum_ask)` as fixed-point in
/// [-1.0, +1.0]; 0 when both sides are empty.
pub fn imbalance(bids: &[(i64, i64)], asks: &[(i64, i64)], levels: usize) -> i64 {
    let sum = |side: &[(i64, i64)]| -> i128 {
        side.iter()
            .take(levels)
            .map(|&(_, q)| q.max(0) as i128)
            .sum()
    };

    let bid_vol = sum(bids);
    let ask_vol = sum(asks);
    let total = bid_vol + ask_vol;
    if total == 0 {
        return 0;
    }

    div_round_half_even((bid_vol - ask_vol) * SCALE as i128, total) as i64
}

/// Spread in basis points relative to the mid, fixed-point
///
/// `spread * 10_000 / mid`; `None` when the mid is not positive.
#[inline]
pub fn spread_bps(bid: i64, ask: i64) -> Option<i64> {
    let mid = mid_price(bid, ask)?;
    if mid <= 0 {
        return None;
    }
    let spread = (ask - bid) as i128;
    Some(div_round_half_even(spread * 10_000 * SCALE as i128, mid as i128) as i64)
}

/// Exact fixed-point mid: `(bid + ask) / 2`
#[inline(always)]
pub fn mid_price(bid: i64, ask: i64) -> Option<i64> {
    if bid <= 0 || ask <= 0 {
        return None;
    }
    Some(((bid as i128 + ask as i128) / 2) as i64)
}
