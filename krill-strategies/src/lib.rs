//! Krill strategies - the quoting family
//!
//! Three implementations of the core `Quoter` contract:
//! - [`BaselineQuoter`]: mid fair value, clamped spread, linear inventory
//!   skew and size scaling
//! - [`InventoryQuoter`]: baseline math driven by an EWMA of position
//!   instead of the instantaneous position, damping quote oscillation
//! - [`AvellanedaStoikov`]: reservation-price / optimal-spread model,
//!   clamped into the baseline spread band
//!
//! Every variant owns its own state record; there is no shared base
//! state. All price math is i64 fixed-point; floats appear only in the
//! Avellaneda-Stoikov closed-form terms and the volatility estimator.

pub mod avellaneda;
pub mod baseline;
pub mod inventory;
pub mod test_helpers;
pub mod volatility;

pub use avellaneda::AvellanedaStoikov;
pub use baseline::BaselineQuoter;
pub use inventory::InventoryQuoter;
pub use volatility::EwmaVolatility;

use krill_core::config::StrategyConfig;
use krill_core::fixed_point::{div_fixed, div_round_half_even, mul_fixed, ONE};
use krill_core::{EngineError, Quoter};

/// Strategy parameters after boundary conversion, everything fixed-point
#[derive(Debug, Clone, Copy)]
pub struct QuoterParams {
    pub min_spread_bps: i64,
    pub max_spread_bps: i64,
    pub target_spread_bps: i64,
    /// Skew strength as fixed-point [0, 1]
    pub inventory_skew: i64,
    /// Inventory the skew steers toward (banker's-rounded at config load)
    pub inventory_target: i64,
    pub default_order_size: i64,
    pub min_order_size: i64,
    pub max_order_size: i64,
    pub max_position: i64,
    pub tick_size: i64,
}

impl QuoterParams {
    pub fn from_config(cfg: &StrategyConfig) -> Result<Self, EngineError> {
        Ok(Self {
            min_spread_bps: cfg.min_spread_bps,
            max_spread_bps: cfg.max_spread_bps,
            target_spread_bps: cfg.target_spread_bps,
            inventory_skew: krill_core::fixed_point::from_f64(cfg.inventory_skew)
                .map_err(|e| EngineError::Config(format!("strategy.inventory_skew: {}", e)))?,
            inventory_target: cfg.inventory_target_fixed()?,
            default_order_size: cfg.fixed(cfg.default_order_size, "default_order_size")?,
            min_order_size: cfg.fixed(cfg.min_order_size, "min_order_size")?,
            max_order_size: cfg.fixed(cfg.max_order_size, "max_order_size")?,
            max_position: cfg.fixed(cfg.max_position, "max_position")?,
            tick_size: cfg.tick_size_fixed()?,
        })
    }
}

/// Tagged-variant dispatch over the strategy family
///
/// One binary selects its quoter at startup from config; the engine
/// itself stays monomorphized over this enum.
pub enum StrategyKind {
    Baseline(BaselineQuoter),
    Inventory(InventoryQuoter),
    Avellaneda(AvellanedaStoikov),
}

impl StrategyKind {
    pub fn from_config(cfg: &StrategyConfig) -> Result<Self, EngineError> {
        let params = QuoterParams::from_config(cfg)?;
        match cfg.strategy_type.as_str() {
            "baseline" => Ok(StrategyKind::Baseline(BaselineQuoter::new(params))),
            "inventory" => Ok(StrategyKind::Inventory(InventoryQuoter::new(
                params,
                cfg.ewma_alpha,
            ))),
            "avellaneda_stoikov" => Ok(StrategyKind::Avellaneda(AvellanedaStoikov::new(
                params,
                avellaneda::AsParams {
                    gamma: cfg.gamma,
                    sigma: cfg.sigma,
                    arrival_k: cfg.arrival_k,
                    horizon_secs: cfg.horizon_secs,
                },
            ))),
            other => Err(EngineError::Config(format!(
                "unknown strategy type {:?}",
                other
            ))),
        }
    }
}

impl krill_core::Quoter for StrategyKind {
    fn compute_quotes(
        &mut self,
        snapshot: &krill_core::BookSnapshot,
        position: &krill_core::PositionView,
        signal: &krill_core::MarketSignal,
    ) -> krill_core::QuoteDecision {
        match self {
            StrategyKind::Baseline(q) => q.compute_quotes(snapshot, position, signal),
            StrategyKind::Inventory(q) => q.compute_quotes(snapshot, position, signal),
            StrategyKind::Avellaneda(q) => q.compute_quotes(snapshot, position, signal),
        }
    }

    fn on_fill(&mut self, side: krill_core::Side, price: i64, qty: i64) {
        match self {
            StrategyKind::Baseline(q) => q.on_fill(side, price, qty),
            StrategyKind::Inventory(q) => q.on_fill(side, price, qty),
            StrategyKind::Avellaneda(q) => q.on_fill(side, price, qty),
        }
    }

    fn on_cancel(&mut self, id: krill_core::OrderId) {
        match self {
            StrategyKind::Baseline(q) => q.on_cancel(id),
            StrategyKind::Inventory(q) => q.on_cancel(id),
            StrategyKind::Avellaneda(q) => q.on_cancel(id),
        }
    }

    fn on_trade(&mut self, trade: &krill_core::exchange::TradeEvent) {
        match self {
            StrategyKind::Baseline(q) => q.on_trade(trade),
            StrategyKind::Inventory(q) => q.on_trade(trade),
            StrategyKind::Avellaneda(q) => q.on_trade(trade),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StrategyKind::Baseline(q) => q.name(),
            StrategyKind::Inventory(q) => q.name(),
            StrategyKind::Avellaneda(q) => q.name(),
        }
    }

    fn reset(&mut self) {
        match self {
            StrategyKind::Baseline(q) => q.reset(),
            StrategyKind::Inventory(q) => q.reset(),
            StrategyKind::Avellaneda(q) => q.reset(),
        }
    }
}

/// `value * bps / 20_000`: half of a bps-fraction, used for half-spreads
#[inline(always)]
pub(crate) fn half_spread_of(value: i64, spread_bps: i64) -> i64 {
    div_round_half_even(value as i128 * spread_bps as i128, 20_000) as i64
}

/// Normalized inventory in [-1, 1]: `(position - target) / max_position`
#[inline]
pub(crate) fn inventory_ratio(params: &QuoterParams, position: i64) -> i64 {
    div_fixed(position - params.inventory_target, params.max_position)
        .unwrap_or(0)
        .clamp(-ONE, ONE)
}

/// Price shift applied to both quotes: `skew * half_spread`
///
/// Positive when long of target, which pushes both quotes down.
#[inline]
pub(crate) fn skew_shift(params: &QuoterParams, half_spread: i64, position: i64) -> i64 {
    let skew = mul_fixed(params.inventory_skew, inventory_ratio(params, position));
    mul_fixed(skew, half_spread)
}

/// Per-side sizes after linear inventory scaling
///
/// Both sides start from `default_order_size` and shrink as
/// `|position - target| / max_position` approaches 1. When the scaled
/// size falls below `min_order_size`, the side whose direction worsens
/// inventory is disabled (size 0) and the improving side floors at the
/// minimum.
pub(crate) fn scaled_sizes(params: &QuoterParams, position: i64) -> (i64, i64) {
    let ratio = inventory_ratio(params, position).unsigned_abs() as i64;
    let scaled = mul_fixed(params.default_order_size, ONE - ratio);
    let clamped = scaled.clamp(params.min_order_size, params.max_order_size);

    if scaled >= params.min_order_size {
        return (clamped, clamped);
    }

    // Scaled out: only the side that reduces inventory keeps quoting
    let distance = position - params.inventory_target;
    if distance > 0 {
        // Long of target: buying worsens, selling improves
        (0, params.min_order_size)
    } else if distance < 0 {
        (params.min_order_size, 0)
    } else {
        (0, 0)
    }
}

/// Round a bid down to the venue tick
#[inline(always)]
pub(crate) fn round_down_to_tick(price: i64, tick: i64) -> i64 {
    price - price.rem_euclid(tick)
}

/// Round an ask up to the venue tick
#[inline(always)]
pub(crate) fn round_up_to_tick(price: i64, tick: i64) -> i64 {
    let rem = price.rem_euclid(tick);
    if rem == 0 {
        price
    } else {
        price + (tick - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krill_core::fixed_point::SCALE;

    pub(crate) fn test_params() -> QuoterParams {
        QuoterParams {
            min_spread_bps: 2,
            max_spread_bps: 100,
            target_spread_bps: 20,
            inventory_skew: ONE / 2, // 0.5
            inventory_target: 0,
            default_order_size: SCALE,         // 1.0
            min_order_size: SCALE / 10,        // 0.1
            max_order_size: 2 * SCALE,         // 2.0
            max_position: 10 * SCALE,          // 10.0
            tick_size: SCALE / 100,            // 0.01
        }
    }

    #[test]
    fn ratio_clips_to_unit_range() {
        let p = test_params();
        assert_eq!(inventory_ratio(&p, 0), 0);
        assert_eq!(inventory_ratio(&p, 5 * SCALE), ONE / 2);
        assert_eq!(inventory_ratio(&p, 100 * SCALE), ONE);
        assert_eq!(inventory_ratio(&p, -100 * SCALE), -ONE);
    }

    #[test]
    fn sizes_scale_linearly() {
        let p = test_params();
        // Flat: default size both sides
        assert_eq!(scaled_sizes(&p, 0), (SCALE, SCALE));
        // Half way to the cap: half size
        assert_eq!(scaled_sizes(&p, 5 * SCALE), (SCALE / 2, SCALE / 2));
    }

    #[test]
    fn worsening_side_disabled_when_scaled_out() {
        let p = test_params();
        // 9.5/10 of the envelope long: scaled size 0.05 < min 0.1
        let (bid, ask) = scaled_sizes(&p, 95 * SCALE / 10);
        assert_eq!(bid, 0);
        assert_eq!(ask, p.min_order_size);

        let (bid, ask) = scaled_sizes(&p, -95 * SCALE / 10);
        assert_eq!(bid, p.min_order_size);
        assert_eq!(ask, 0);
    }

    #[test]
    fn tick_rounding() {
        let tick = SCALE / 100;
        assert_eq!(round_down_to_tick(100 * SCALE + 7, tick), 100 * SCALE);
        assert_eq!(round_up_to_tick(100 * SCALE + 7, tick), 100 * SCALE + tick);
        assert_eq!(round_down_to_tick(100 * SCALE, tick), 100 * SCALE);
        assert_eq!(round_up_to_tick(100 * SCALE, tick), 100 * SCALE);
    }

    #[test]
    fn half_spread_formula() {
        // 100.00 at 20 bps: half spread = 100 * 0.002 / 2 = 0.10
        assert_eq!(half_spread_of(100 * SCALE, 20), SCALE / 10);
    }
}
