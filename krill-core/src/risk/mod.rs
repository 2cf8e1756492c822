//! Pre-trade risk management
//!
//! Every outbound order passes through [`RiskManager::check_order`] before
//! it can reach the adapter. The check chain is synchronous and touches
//! only atomics plus one O(1) position-map lookup; it short-circuits on
//! the first failure, in this order:
//!
//! 1. kill switch
//! 2. symbol disabled
//! 3. order size (quantity, then notional)
//! 4. one-second rate window
//! 5. open-order count
//! 6. projected position after a worst-case full fill (quantity, notional)
//! 7. daily loss / drawdown
//! 8. price deviation from the reference
//!
//! The manager also owns position/PnL state and the kill switch, and is
//! fed by the order worker (`on_order_*`) and the periodic risk worker
//! (`mark_price`, `check_loss_limits`, `check_daily_reset`).

pub mod kill_switch;
pub mod limits;
pub mod position;
pub mod rate_window;

pub use kill_switch::KillSwitch;
pub use limits::{LimitsHolder, RiskLimits};
pub use position::{FillEffect, PositionBook, PositionState};
pub use rate_window::RateWindow;

use crate::core::fixed_point::notional;
use crate::core::time::{day_start, wall_secs, Nanos};
use crate::core::types::{Order, Side, Symbol};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Why an order was rejected pre-trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskReason {
    KillSwitchActive,
    SymbolDisabled,
    OrderSizeExceeded,
    OrderValueExceeded,
    RateLimit,
    OpenOrdersLimit,
    PositionLimitQty,
    PositionLimitValue,
    DailyLossLimit,
    DrawdownLimit,
    PriceDeviation,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskReason::KillSwitchActive => "KILL_SWITCH_ACTIVE",
            RiskReason::SymbolDisabled => "SYMBOL_DISABLED",
            RiskReason::OrderSizeExceeded => "ORDER_SIZE_EXCEEDED",
            RiskReason::OrderValueExceeded => "ORDER_VALUE_EXCEEDED",
            RiskReason::RateLimit => "RATE_LIMIT",
            RiskReason::OpenOrdersLimit => "OPEN_ORDERS_LIMIT",
            RiskReason::PositionLimitQty => "POSITION_LIMIT_QTY",
            RiskReason::PositionLimitValue => "POSITION_LIMIT_VALUE",
            RiskReason::DailyLossLimit => "DAILY_LOSS_LIMIT",
            RiskReason::DrawdownLimit => "DRAWDOWN_LIMIT",
            RiskReason::PriceDeviation => "PRICE_DEVIATION",
        };
        f.write_str(s)
    }
}

/// Outcome of a pre-trade check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDecision {
    Pass,
    Fail { reason: RiskReason, message: String },
}

impl RiskDecision {
    #[inline(always)]
    pub fn is_pass(&self) -> bool {
        matches!(self, RiskDecision::Pass)
    }

    fn fail(reason: RiskReason, message: String) -> Self {
        RiskDecision::Fail { reason, message }
    }
}

/// Central risk state: limits, positions, counters, kill switch
pub struct RiskManager {
    limits: LimitsHolder,
    positions: PositionBook,
    rate: RateWindow,
    kill: KillSwitch,
    disabled: RwLock<HashSet<Symbol>>,
    open_orders: AtomicU32,
    consecutive_errors: AtomicU32,
    rejects: AtomicU32,
    /// Realized PnL since the daily reset
    daily_realized: AtomicI64,
    /// Total PnL (realized + unrealized) - the equity curve
    equity: AtomicI64,
    peak_equity: AtomicI64,
    daily_reset_at: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Arc<Self> {
        info!(?limits, "risk manager initialized");
        Arc::new(Self {
            limits: LimitsHolder::new(limits),
            positions: PositionBook::new(),
            rate: RateWindow::new(),
            kill: KillSwitch::new(),
            disabled: RwLock::new(HashSet::new()),
            open_orders: AtomicU32::new(0),
            consecutive_errors: AtomicU32::new(0),
            rejects: AtomicU32::new(0),
            daily_realized: AtomicI64::new(0),
            equity: AtomicI64::new(0),
            peak_equity: AtomicI64::new(0),
            daily_reset_at: AtomicU64::new(day_start(wall_secs())),
            checks_passed: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill
    }

    #[inline]
    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn limits(&self) -> Arc<RiskLimits> {
        self.limits.load()
    }

    /// Hot-swap the limit snapshot
    pub fn update_limits(&self, limits: RiskLimits) {
        info!(?limits, "risk limits updated");
        self.limits.store(limits);
    }

    pub fn disable_symbol(&self, symbol: Symbol) {
        warn!(%symbol, "symbol disabled for trading");
        self.disabled.write().insert(symbol);
    }

    pub fn enable_symbol(&self, symbol: Symbol) {
        self.disabled.write().remove(&symbol);
    }

    // ------------------------------------------------------------------
    // The pre-trade gate
    // ------------------------------------------------------------------

    /// Validate one outbound order against the live limit snapshot
    pub fn check_order(&self, order: &Order, reference_price: i64) -> RiskDecision {
        let decision = self.run_checks(order, reference_price);
        match &decision {
            RiskDecision::Pass => {
                self.checks_passed.fetch_add(1, Ordering::Relaxed);
            }
            RiskDecision::Fail { reason, message } => {
                self.checks_failed.fetch_add(1, Ordering::Relaxed);
                warn!(%reason, %message, client_id = %order.client_id, "order rejected pre-trade");
            }
        }
        decision
    }

    fn run_checks(&self, order: &Order, reference_price: i64) -> RiskDecision {
        // 1. Kill switch
        if self.kill.is_active() {
            return RiskDecision::fail(
                RiskReason::KillSwitchActive,
                self.kill.reason().unwrap_or_default(),
            );
        }

        // 2. Symbol disabled
        if self.disabled.read().contains(&order.symbol) {
            return RiskDecision::fail(
                RiskReason::SymbolDisabled,
                format!("{} is disabled", order.symbol),
            );
        }

        let limits = self.limits.load();
        // Market orders carry no price; value checks fall back to the
        // reference for the worst case
        let check_price = if order.price > 0 {
            order.price
        } else {
            reference_price
        };

        // 3. Order size
        if order.quantity > limits.max_order_qty {
            return RiskDecision::fail(
                RiskReason::OrderSizeExceeded,
                format!("qty {} > max {}", order.quantity, limits.max_order_qty),
            );
        }
        let order_value = notional(check_price, order.quantity);
        if order_value > limits.max_order_value as i128 {
            return RiskDecision::fail(
                RiskReason::OrderValueExceeded,
                format!("value {} > max {}", order_value, limits.max_order_value),
            );
        }

        // 4. Rate limit
        if !self.rate.try_acquire(wall_secs(), limits.max_orders_per_second) {
            return RiskDecision::fail(
                RiskReason::RateLimit,
                format!("over {}/s", limits.max_orders_per_second),
            );
        }

        // 5. Open orders
        if self.open_orders.load(Ordering::Acquire) >= limits.max_open_orders {
            return RiskDecision::fail(
                RiskReason::OpenOrdersLimit,
                format!("{} open orders", limits.max_open_orders),
            );
        }

        // 6. Projected position after a worst-case full fill
        let current = self.positions.quantity(order.symbol);
        let projected = current + order.side.sign() * order.quantity;
        if projected.unsigned_abs() > limits.max_position_qty.unsigned_abs() {
            return RiskDecision::fail(
                RiskReason::PositionLimitQty,
                format!("projected {} > max {}", projected, limits.max_position_qty),
            );
        }
        let projected_value = notional(check_price, projected).unsigned_abs();
        if projected_value > limits.max_position_value.unsigned_abs() as u128 {
            return RiskDecision::fail(
                RiskReason::PositionLimitValue,
                format!(
                    "projected value {} > max {}",
                    projected_value, limits.max_position_value
                ),
            );
        }

        // 7. Daily loss / drawdown
        if self.daily_realized.load(Ordering::Acquire) <= -limits.max_daily_loss {
            return RiskDecision::fail(
                RiskReason::DailyLossLimit,
                format!("daily loss limit {}", limits.max_daily_loss),
            );
        }
        let equity = self.equity.load(Ordering::Acquire);
        let peak = self.peak_equity.load(Ordering::Acquire);
        if equity < peak - limits.max_drawdown {
            return RiskDecision::fail(
                RiskReason::DrawdownLimit,
                format!("equity {} below peak {} - {}", equity, peak, limits.max_drawdown),
            );
        }

        // 8. Price deviation from reference
        if order.price > 0 && reference_price > 0 {
            let deviation = (order.price - reference_price).unsigned_abs() as u128 * 10_000;
            let allowed = limits.max_deviation_bps as u128 * reference_price as u128;
            if deviation > allowed {
                return RiskDecision::fail(
                    RiskReason::PriceDeviation,
                    format!(
                        "price {} deviates more than {} bps from {}",
                        order.price, limits.max_deviation_bps, reference_price
                    ),
                );
            }
        }

        RiskDecision::Pass
    }

    // ------------------------------------------------------------------
    // Event hooks (order worker)
    // ------------------------------------------------------------------

    /// An order reached the venue and is resting
    pub fn on_order_opened(&self) {
        self.open_orders.fetch_add(1, Ordering::AcqRel);
        self.consecutive_errors.store(0, Ordering::Release);
    }

    /// An order left the venue (terminal status)
    pub fn on_order_closed(&self) {
        // Saturating: a replayed terminal update must not underflow
        let _ = self
            .open_orders
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Apply one fill to position, PnL and equity
    pub fn on_order_filled(
        &self,
        symbol: Symbol,
        side: Side,
        price: i64,
        qty: i64,
        ts: Nanos,
    ) -> FillEffect {
        let effect = self.positions.apply_fill(symbol, side, price, qty, ts);

        self.daily_realized.fetch_add(effect.realized, Ordering::AcqRel);
        let equity = self
            .equity
            .fetch_add(effect.realized + effect.unrealized_delta, Ordering::AcqRel)
            + effect.realized
            + effect.unrealized_delta;
        self.raise_peak(equity);
        self.check_loss_limits();
        effect
    }

    /// Venue rejected an order; trips the kill switch at the threshold
    pub fn on_order_rejected(&self) {
        let rejects = self.rejects.fetch_add(1, Ordering::AcqRel) + 1;
        let limits = self.limits.load();
        if rejects >= limits.reject_threshold {
            self.kill
                .activate(&format!("{} consecutive venue rejects", rejects));
        }
    }

    /// An order-path error; trips the kill switch at the threshold
    pub fn on_order_error(&self) {
        let errors = self.consecutive_errors.fetch_add(1, Ordering::AcqRel) + 1;
        let limits = self.limits.load();
        if errors >= limits.error_threshold {
            self.kill
                .activate(&format!("{} consecutive order errors", errors));
        }
    }

    /// An order round-trip succeeded; clears the error streak
    pub fn on_order_ok(&self) {
        self.consecutive_errors.store(0, Ordering::Release);
        self.rejects.store(0, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Periodic risk worker
    // ------------------------------------------------------------------

    /// Re-mark a symbol and fold the unrealized change into equity
    pub fn mark_price(&self, symbol: Symbol, mark: i64, ts: Nanos) {
        let delta = self.positions.mark(symbol, mark, ts);
        if delta != 0 {
            let equity = self.equity.fetch_add(delta, Ordering::AcqRel) + delta;
            self.raise_peak(equity);
        }
    }

    /// Evaluate loss/drawdown breaches; activates the kill switch
    ///
    /// Returns true when a breach was found.
    pub fn check_loss_limits(&self) -> bool {
        let limits = self.limits.load();
        let daily = self.daily_realized.load(Ordering::Acquire);
        if daily <= -limits.max_daily_loss {
            self.kill
                .activate(&format!("daily loss {} breached limit", daily));
            return true;
        }
        let equity = self.equity.load(Ordering::Acquire);
        let peak = self.peak_equity.load(Ordering::Acquire);
        if equity < peak - limits.max_drawdown {
            self.kill
                .activate(&format!("drawdown {} from peak {}", peak - equity, peak));
            return true;
        }
        false
    }

    /// Reset daily PnL on the UTC day boundary
    pub fn check_daily_reset(&self) {
        let today = day_start(wall_secs());
        let last = self.daily_reset_at.load(Ordering::Acquire);
        if today > last
            && self
                .daily_reset_at
                .compare_exchange(last, today, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            let was = self.daily_realized.swap(0, Ordering::AcqRel);
            info!(previous = was, "new trading day, daily PnL reset");
        }
    }

    fn raise_peak(&self, equity: i64) {
        let mut peak = self.peak_equity.load(Ordering::Relaxed);
        while equity > peak {
            match self.peak_equity.compare_exchange_weak(
                peak,
                equity,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => peak = actual,
            }
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn open_order_count(&self) -> u32 {
        self.open_orders.load(Ordering::Acquire)
    }

    pub fn daily_realized_pnl(&self) -> i64 {
        self.daily_realized.load(Ordering::Acquire)
    }

    pub fn equity(&self) -> i64 {
        self.equity.load(Ordering::Acquire)
    }

    pub fn peak_equity(&self) -> i64 {
        self.peak_equity.load(Ordering::Acquire)
    }

    pub fn checks_passed(&self) -> u64 {
        self.checks_passed.load(Ordering::Relaxed)
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }
}
