//! Trading engine orchestration
//!
//! One OS thread per worker, one owner per piece of long-lived state,
//! SPSC queues between them:
//!
//! ```text
//!  adapter ──ticks──▶ tick worker ──snapshots──▶ strategy worker
//!  adapter ──trades────────────────────────────▶ strategy worker
//!                                                      │ decisions
//!  adapter ──order updates──▶ order worker ◀───────────┘
//!  adapter ──session events─▶ risk worker    order worker ──notes──▶ strategy
//! ```
//!
//! The tick worker owns the book; the risk manager owns position/PnL; the
//! strategy worker owns the quoter and its gate; the order worker owns the
//! open-order map and the order pool. `start()` brings workers up in
//! dependency order (book, risk, strategy, order) and then connects the
//! adapter; `stop()` reverses it, each worker draining its queue up to the
//! configured deadline. Shutdown never cancels resting orders implicitly;
//! `cancel_all` is an explicit operator action (the engine only forces it
//! on a fatal error).

pub mod events;
pub mod stats;

pub use events::{ExecutionNote, QuoteCommand};
pub use stats::EngineStats;

use crate::core::errors::{EngineError, ErrorKind};
use crate::core::time::monotonic_ns;
use crate::core::types::{Order, OrderStatus, Symbol};
use crate::exchange::{
    AdapterEventSender, CancelRequest, ExchangeAdapter, MarketEvent, OrderRequest, OrderUpdate,
    SessionEvent, TradeEvent,
};
use crate::orderbook::{BookSnapshot, OrderBook, UpdateOutcome};
use crate::perf::OrderPool;
use crate::queue::{channel, Consumer, Producer};
use crate::risk::{RiskDecision, RiskManager};
use crate::strategy::{MarketSignal, PositionView, QuoteDecision, QuoteGate, Quoter};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Queue capacities (messages)
pub const TICK_QUEUE_CAPACITY: usize = 65_536;
pub const ORDER_UPDATE_QUEUE_CAPACITY: usize = 8_192;
pub const TRADE_QUEUE_CAPACITY: usize = 8_192;
pub const CONTROL_QUEUE_CAPACITY: usize = 4_096;
pub const SNAPSHOT_QUEUE_CAPACITY: usize = 8_192;
pub const DECISION_QUEUE_CAPACITY: usize = 4_096;
pub const NOTE_QUEUE_CAPACITY: usize = 4_096;

/// Engine tuning knobs (not part of the config file surface)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbol: Symbol,
    /// Refresh/min-life gating, microseconds
    pub quote_refresh_us: u64,
    pub min_quote_life_us: u64,
    /// Depth levels fed into the imbalance signal
    pub imbalance_levels: usize,
    /// Cadence of the periodic risk task
    pub risk_interval: Duration,
    /// Queue drain budget during `stop()`
    pub drain_deadline: Duration,
    /// Optional cores for [tick, strategy, order, risk]
    pub pin_cores: Option<[usize; 4]>,
}

impl EngineConfig {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quote_refresh_us: 10_000,
            min_quote_life_us: 50_000,
            imbalance_levels: 5,
            risk_interval: Duration::from_millis(100),
            drain_deadline: Duration::from_millis(500),
            pin_cores: None,
        }
    }
}

/// State shared across workers: shutdown flags and single-writer atomics
struct EngineShared {
    shutdown: AtomicBool,
    fatal: AtomicBool,
    /// Latest mid, written by the tick worker only; 0 before two-sided
    last_mid: AtomicI64,
    /// Set by the tick worker on a sequence gap, consumed by risk worker
    resync_needed: AtomicBool,
    stats: EngineStats,
}

impl EngineShared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            shutdown: AtomicBool::new(false),
            fatal: AtomicBool::new(false),
            last_mid: AtomicI64::new(0),
            resync_needed: AtomicBool::new(false),
            stats: EngineStats::new(),
        })
    }

    #[inline(always)]
    fn should_stop(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn fatal_error(&self, message: &str) {
        error!(message, "fatal engine error, forcing shutdown");
        self.stats.record_error(ErrorKind::Internal);
        self.fatal.store(true, Ordering::Release);
        self.shutdown.store(true, Ordering::Release);
    }
}

/// Spin briefly, then yield; workers never block on their queues
#[inline(always)]
fn idle_wait(spins: &mut u32) {
    *spins += 1;
    if *spins < 64 {
        std::hint::spin_loop();
    } else {
        *spins = 0;
        thread::yield_now();
    }
}

/// The multi-worker trading engine
pub struct TradingEngine<Q: Quoter + 'static> {
    config: EngineConfig,
    risk: Arc<RiskManager>,
    adapter: Arc<dyn ExchangeAdapter>,
    shared: Arc<EngineShared>,
    quoter: Option<Q>,
    handles: Vec<JoinHandle<()>>,
    running: bool,
}

impl<Q: Quoter + 'static> TradingEngine<Q> {
    pub fn new(
        config: EngineConfig,
        risk: Arc<RiskManager>,
        quoter: Q,
        adapter: Arc<dyn ExchangeAdapter>,
    ) -> Self {
        Self {
            config,
            risk,
            adapter,
            shared: EngineShared::new(),
            quoter: Some(quoter),
            handles: Vec::new(),
            running: false,
        }
    }

    #[inline]
    pub fn stats(&self) -> &EngineStats {
        &self.shared.stats
    }

    #[inline]
    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    /// True once a worker hit an unrecoverable error
    pub fn is_fatal(&self) -> bool {
        self.shared.fatal.load(Ordering::Acquire)
    }

    /// True once shutdown has been requested (by `stop`, a fatal error or
    /// an external shutdown handle)
    pub fn is_stopping(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Request an engine stop from outside (signal handler)
    pub fn shutdown_handle(&self) -> impl Fn() + Send + Sync + 'static {
        let shared = Arc::clone(&self.shared);
        move || {
            shared.shutdown.store(true, Ordering::Release);
        }
    }

    /// Explicit operator action; never implied by `stop()`
    pub fn cancel_all_orders(&self) -> Result<u32, EngineError> {
        self.adapter
            .cancel_all_orders(self.config.symbol)
            .map(|r| r.cancelled)
    }

    /// Bring up workers in dependency order, then connect the adapter
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.running {
            return Err(EngineError::Internal("engine already started".into()));
        }
        let quoter = self
            .quoter
            .take()
            .ok_or_else(|| EngineError::Internal("engine cannot be restarted".into()))?;

        info!(symbol = %self.config.symbol, strategy = quoter.name(), "starting engine");

        let (tick_tx, tick_rx) = channel::<MarketEvent>(TICK_QUEUE_CAPACITY);
        let (update_tx, update_rx) = channel::<OrderUpdate>(ORDER_UPDATE_QUEUE_CAPACITY);
        let (trade_tx, trade_rx) = channel::<TradeEvent>(TRADE_QUEUE_CAPACITY);
        let (session_tx, session_rx) = channel::<SessionEvent>(CONTROL_QUEUE_CAPACITY);
        let (snap_tx, snap_rx) = channel::<BookSnapshot>(SNAPSHOT_QUEUE_CAPACITY);
        let (decision_tx, decision_rx) = channel::<QuoteCommand>(DECISION_QUEUE_CAPACITY);
        let (note_tx, note_rx) = channel::<ExecutionNote>(NOTE_QUEUE_CAPACITY);

        let pins = self.config.pin_cores;

        // 1. Tick worker (book owner)
        self.handles.push(spawn_worker(
            "krill-tick",
            pins.map(|p| p[0]),
            tick_worker(
                self.config.clone(),
                Arc::clone(&self.shared),
                tick_rx,
                snap_tx,
            ),
        ));

        // 2. Risk worker (periodic task + control events)
        self.handles.push(spawn_worker(
            "krill-risk",
            pins.map(|p| p[3]),
            risk_worker(
                self.config.clone(),
                Arc::clone(&self.shared),
                Arc::clone(&self.risk),
                Arc::clone(&self.adapter),
                session_rx,
            ),
        ));

        // 3. Strategy worker (quoter owner)
        self.handles.push(spawn_worker(
            "krill-strategy",
            pins.map(|p| p[1]),
            strategy_worker(
                self.config.clone(),
                Arc::clone(&self.shared),
                Arc::clone(&self.risk),
                quoter,
                snap_rx,
                trade_rx,
                note_rx,
                decision_tx,
            ),
        ));

        // 4. Order worker (open-order map + pool owner)
        self.handles.push(spawn_worker(
            "krill-order",
            pins.map(|p| p[2]),
            order_worker(
                self.config.clone(),
                Arc::clone(&self.shared),
                Arc::clone(&self.risk),
                Arc::clone(&self.adapter),
                decision_rx,
                update_rx,
                note_tx,
            ),
        ));

        // Workers are up and polling; stop() must join them from here on,
        // even if bringing the adapter session up fails
        self.running = true;

        let connected = self
            .adapter
            .connect(AdapterEventSender::new(
                tick_tx, update_tx, trade_tx, session_tx,
            ))
            .and_then(|()| self.adapter.subscribe_orderbook(self.config.symbol, 32))
            .and_then(|()| self.adapter.subscribe_ticker(self.config.symbol))
            .and_then(|()| self.adapter.subscribe_trades(self.config.symbol));

        if let Err(e) = connected {
            error!(%e, "adapter bring-up failed, tearing workers down");
            let _ = self.stop();
            return Err(e);
        }
        Ok(())
    }

    /// Reverse of `start()`: flag shutdown, join workers, disconnect
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }
        info!("stopping engine");

        if self.is_fatal() {
            // Best effort: clear resting orders before going down hard
            match self.adapter.cancel_all_orders(self.config.symbol) {
                Ok(r) => warn!(cancelled = r.cancelled, "fatal stop: resting orders cancelled"),
                Err(e) => error!(%e, "fatal stop: cancel-all failed"),
            }
        }

        self.shared.shutdown.store(true, Ordering::Release);
        // Reverse dependency order: order, strategy, risk, tick
        for handle in self.handles.drain(..).rev() {
            let _ = handle.join();
        }
        self.adapter.disconnect()?;
        self.running = false;

        if self.is_fatal() {
            Err(EngineError::Internal(
                "engine stopped after fatal error".into(),
            ))
        } else {
            Ok(())
        }
    }
}

impl<Q: Quoter + 'static> Drop for TradingEngine<Q> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn spawn_worker(
    name: &str,
    pin: Option<usize>,
    body: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Some(core) = pin {
                if let Err(e) = crate::perf::pin_to_core(core) {
                    warn!(%e, core, "core pinning failed, continuing unpinned");
                }
            }
            body();
        })
        .expect("worker thread spawn")
}

// ----------------------------------------------------------------------
// Tick worker: owns the book, publishes snapshots
// ----------------------------------------------------------------------

fn tick_worker(
    config: EngineConfig,
    shared: Arc<EngineShared>,
    ticks: Consumer<MarketEvent>,
    snapshots: Producer<BookSnapshot>,
) -> impl FnOnce() + Send + 'static {
    move || {
        let mut book = OrderBook::new(config.symbol);
        let mut last_top: (i64, i64) = (0, 0);
        let mut spins = 0u32;

        let handle = |event: MarketEvent,
                      book: &mut OrderBook,
                      last_top: &mut (i64, i64)| {
            shared.stats.ticks_processed.fetch_add(1, Ordering::Relaxed);
            if event.symbol() != config.symbol {
                shared.stats.record_error(ErrorKind::Protocol);
                debug!(symbol = %event.symbol(), "tick for unsubscribed symbol dropped");
                return;
            }

            match event {
                MarketEvent::L2Update {
                    sequence,
                    side,
                    price,
                    quantity,
                    local_ts,
                    ..
                } => match book.apply_external(sequence, side, price, quantity, local_ts) {
                    UpdateOutcome::Applied => {}
                    UpdateOutcome::StaleDropped => {
                        shared.stats.record_error(ErrorKind::BookInconsistency);
                        return;
                    }
                    UpdateOutcome::GapDetected(_) => {
                        shared.stats.record_error(ErrorKind::BookInconsistency);
                        shared.resync_needed.store(true, Ordering::Release);
                    }
                },
                MarketEvent::Snapshot {
                    sequence,
                    bids,
                    asks,
                    bid_len,
                    ask_len,
                    local_ts,
                    ..
                } => {
                    book.apply_snapshot(&bids[..bid_len], &asks[..ask_len], local_ts);
                    book.reset_external_seq(sequence);
                }
                MarketEvent::L3Add { order, local_ts, .. } => book.apply_l3_add(order, local_ts),
                MarketEvent::L3Modify {
                    id,
                    new_quantity,
                    local_ts,
                    ..
                } => book.apply_l3_modify(id, new_quantity, local_ts),
                MarketEvent::L3Remove { id, local_ts, .. } => book.apply_l3_remove(id, local_ts),
            }

            if let Some(mid) = book.mid() {
                shared.last_mid.store(mid, Ordering::Release);
            }

            // Publish only when the top of book moved; downstream works
            // from the latest state, intermediate deltas carry nothing
            let top = (
                book.best_bid().map(|l| l.price).unwrap_or(0),
                book.best_ask().map(|l| l.price).unwrap_or(0),
            );
            let crossed = !book.is_valid();
            if top != *last_top || crossed {
                *last_top = top;
                if snapshots.push_or_drop(book.snapshot()) {
                    shared
                        .stats
                        .snapshots_published
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        while !shared.should_stop() {
            match ticks.pop() {
                Some(event) => handle(event, &mut book, &mut last_top),
                None => idle_wait(&mut spins),
            }
        }

        // Drain up to the deadline
        let deadline = Instant::now() + config.drain_deadline;
        while Instant::now() < deadline {
            match ticks.pop() {
                Some(event) => handle(event, &mut book, &mut last_top),
                None => break,
            }
        }
        shared
            .stats
            .tick_queue_drops
            .store(ticks.dropped(), Ordering::Release);
        debug!("tick worker exited");
    }
}

// ----------------------------------------------------------------------
// Strategy worker: owns the quoter and its gate
// ----------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn strategy_worker<Q: Quoter + 'static>(
    config: EngineConfig,
    shared: Arc<EngineShared>,
    risk: Arc<RiskManager>,
    mut quoter: Q,
    snapshots: Consumer<BookSnapshot>,
    trades: Consumer<TradeEvent>,
    notes: Consumer<ExecutionNote>,
    decisions: Producer<QuoteCommand>,
) -> impl FnOnce() + Send + 'static {
    move || {
        let mut gate = QuoteGate::new(config.quote_refresh_us, config.min_quote_life_us);
        let mut last_trade_price = 0i64;
        let mut spins = 0u32;

        let handle = |snapshot: BookSnapshot,
                      quoter: &mut Q,
                      gate: &mut QuoteGate,
                      last_trade_price: i64| {
            let now = monotonic_ns();

            let decision = if risk.kill_switch().is_active() {
                QuoteDecision::no_quote("kill switch active")
            } else if let Some(reason) = gate.check(now) {
                QuoteDecision::no_quote(reason)
            } else {
                let position = risk
                    .positions()
                    .get(snapshot.symbol)
                    .map(|p| PositionView {
                        quantity: p.quantity,
                        avg_price: p.avg_price,
                    })
                    .unwrap_or_default();
                let signal = MarketSignal {
                    imbalance: snapshot.imbalance(config.imbalance_levels),
                    last_trade_price,
                };
                let d = quoter.compute_quotes(&snapshot, &position, &signal);
                if d.should_quote {
                    gate.on_quoted(now);
                }
                d
            };

            shared.stats.decisions.fetch_add(1, Ordering::Relaxed);
            decisions.push_or_drop(QuoteCommand {
                symbol: snapshot.symbol,
                decision,
                reference_price: snapshot.mid().unwrap_or(0),
                ts: now,
            });
        };

        while !shared.should_stop() {
            // Execution notes and public prints feed strategy state first
            while let Some(note) = notes.pop() {
                match note {
                    ExecutionNote::Fill { side, price, qty } => quoter.on_fill(side, price, qty),
                    ExecutionNote::Cancelled { id } => quoter.on_cancel(id),
                }
            }
            while let Some(trade) = trades.pop() {
                last_trade_price = trade.price;
                quoter.on_trade(&trade);
            }

            // Work from the latest snapshot; stale ones carry no signal
            let mut latest = None;
            while let Some(snapshot) = snapshots.pop() {
                latest = Some(snapshot);
            }
            match latest {
                Some(snapshot) => handle(snapshot, &mut quoter, &mut gate, last_trade_price),
                None => idle_wait(&mut spins),
            }
        }

        let deadline = Instant::now() + config.drain_deadline;
        while Instant::now() < deadline {
            match snapshots.pop() {
                Some(snapshot) => handle(snapshot, &mut quoter, &mut gate, last_trade_price),
                None => break,
            }
        }
        shared
            .stats
            .snapshot_queue_drops
            .store(snapshots.dropped(), Ordering::Release);
        shared
            .stats
            .trade_queue_drops
            .store(trades.dropped(), Ordering::Release);
        debug!("strategy worker exited");
    }
}

// ----------------------------------------------------------------------
// Order worker: risk gate, dispatch, open-order tracking
// ----------------------------------------------------------------------

fn order_worker(
    config: EngineConfig,
    shared: Arc<EngineShared>,
    risk: Arc<RiskManager>,
    adapter: Arc<dyn ExchangeAdapter>,
    decisions: Consumer<QuoteCommand>,
    updates: Consumer<OrderUpdate>,
    notes: Producer<ExecutionNote>,
) -> impl FnOnce() + Send + 'static {
    move || {
        let open_orders: DashMap<crate::core::types::OrderId, Order> = DashMap::new();
        let pool = OrderPool::for_open_orders(risk.limits().max_open_orders as usize);
        let mut spins = 0u32;

        let apply_update = |update: OrderUpdate| {
            let Some(mut entry) = open_orders.get_mut(&update.client_id) else {
                // Late update for an order we already released (post-
                // shutdown responses land here too); ignore
                debug!(client_id = %update.client_id, "update for unknown order");
                return;
            };
            let order = entry.value_mut();
            order.exchange_id = Some(update.exchange_id);

            if update.fill_qty > 0 {
                if let Err(e) = order.apply_fill(update.fill_qty, update.local_ts) {
                    shared.stats.record_error(ErrorKind::Protocol);
                    warn!(%e, client_id = %update.client_id, "inconsistent fill update");
                    return;
                }
                shared.stats.fills.fetch_add(1, Ordering::Relaxed);
                risk.on_order_filled(
                    update.symbol,
                    order.side,
                    update.fill_price,
                    update.fill_qty,
                    update.local_ts,
                );
                notes.push_or_drop(ExecutionNote::Fill {
                    side: order.side,
                    price: update.fill_price,
                    qty: update.fill_qty,
                });
            } else if update.status != order.status && !order.status.is_terminal() {
                let _ = order.transition(update.status, update.local_ts);
            }

            match update.status {
                OrderStatus::Rejected => {
                    shared.stats.record_error(ErrorKind::OrderReject);
                    risk.on_order_rejected();
                }
                OrderStatus::Cancelled => {
                    notes.push_or_drop(ExecutionNote::Cancelled {
                        id: update.client_id,
                    });
                }
                _ => {}
            }

            let finished = order.status.is_terminal();
            let recycled = *order;
            drop(entry);
            if finished {
                open_orders.remove(&update.client_id);
                risk.on_order_closed();
                pool.release(recycled);
            }
        };

        let dispatch_side = |symbol: Symbol,
                             side: crate::core::types::Side,
                             price: i64,
                             size: i64,
                             reference_price: i64,
                             ts: crate::core::time::Nanos| {
            if size <= 0 {
                return;
            }
            let Some(mut order) = pool.acquire() else {
                shared.fatal_error("order pool exhausted");
                return;
            };
            // Repopulate the recycled slot in place
            order.client_id = crate::core::types::OrderId::next();
            order.exchange_id = None;
            order.symbol = symbol;
            order.side = side;
            order.order_type = crate::core::types::OrderType::Limit;
            order.tif = crate::core::types::TimeInForce::Gtc;
            order.price = price;
            order.quantity = size;
            order.filled_qty = 0;
            order.status = OrderStatus::Pending;
            order.created_ts = ts;
            order.updated_ts = ts;

            match risk.check_order(&order, reference_price) {
                RiskDecision::Pass => {
                    let client_id = order.client_id;
                    let request = OrderRequest {
                        client_id,
                        symbol,
                        side,
                        order_type: order.order_type,
                        tif: order.tif,
                        price,
                        quantity: size,
                    };
                    // Track before dispatch: the paper adapter acks inline
                    open_orders.insert(client_id, order);
                    match adapter.send_order(&request) {
                        Ok(response) if response.accepted => {
                            shared.stats.orders_sent.fetch_add(1, Ordering::Relaxed);
                            risk.on_order_opened();
                            risk.on_order_ok();
                        }
                        Ok(response) => {
                            shared.stats.record_error(ErrorKind::OrderReject);
                            risk.on_order_rejected();
                            debug!(message = ?response.message, "order rejected by venue");
                            if let Some((_, o)) = open_orders.remove(&client_id) {
                                pool.release(o);
                            }
                        }
                        Err(e) => {
                            shared.stats.record_error(ErrorKind::Connection);
                            risk.on_order_error();
                            warn!(%e, "order dispatch failed");
                            if let Some((_, o)) = open_orders.remove(&client_id) {
                                pool.release(o);
                            }
                        }
                    }
                }
                RiskDecision::Fail { .. } => {
                    shared.stats.pretrade_rejects.fetch_add(1, Ordering::Relaxed);
                    shared.stats.record_error(ErrorKind::Risk);
                    pool.release(order);
                }
            }
        };

        let handle_command = |command: QuoteCommand| {
            if !command.decision.should_quote {
                return;
            }
            // Replace working quotes: one resting order per side
            let stale: Vec<CancelRequest> = open_orders
                .iter()
                .map(|e| CancelRequest {
                    symbol: e.value().symbol,
                    client_id: e.value().client_id,
                })
                .collect();
            for cancel in stale {
                if let Err(e) = adapter.cancel_order(&cancel) {
                    shared.stats.record_error(ErrorKind::Connection);
                    warn!(%e, "cancel failed");
                }
            }

            let d = command.decision;
            dispatch_side(
                command.symbol,
                crate::core::types::Side::Buy,
                d.bid_price,
                d.bid_size,
                command.reference_price,
                command.ts,
            );
            dispatch_side(
                command.symbol,
                crate::core::types::Side::Sell,
                d.ask_price,
                d.ask_size,
                command.reference_price,
                command.ts,
            );
        };

        while !shared.should_stop() {
            // Venue order flow is applied strictly in arrival order and
            // before new decisions, so fills precede re-quotes
            let mut worked = false;
            while let Some(update) = updates.pop() {
                apply_update(update);
                worked = true;
            }
            if let Some(command) = decisions.pop() {
                handle_command(command);
                worked = true;
            }
            if !worked {
                idle_wait(&mut spins);
            }
        }

        let deadline = Instant::now() + config.drain_deadline;
        while Instant::now() < deadline {
            match updates.pop() {
                Some(update) => apply_update(update),
                None => break,
            }
        }
        shared
            .stats
            .decision_queue_drops
            .store(decisions.dropped(), Ordering::Release);
        shared
            .stats
            .order_update_queue_drops
            .store(updates.dropped(), Ordering::Release);
        debug!("order worker exited");
    }
}

// ----------------------------------------------------------------------
// Risk worker: periodic marks, loss limits, control events
// ----------------------------------------------------------------------

fn risk_worker(
    config: EngineConfig,
    shared: Arc<EngineShared>,
    risk: Arc<RiskManager>,
    adapter: Arc<dyn ExchangeAdapter>,
    session: Consumer<SessionEvent>,
) -> impl FnOnce() + Send + 'static {
    move || {
        let mut next_tick = Instant::now();
        let mut spins = 0u32;

        while !shared.should_stop() {
            while let Some(event) = session.pop() {
                match event {
                    SessionEvent::Connected => info!("adapter connected"),
                    SessionEvent::Disconnected => {
                        shared.stats.record_error(ErrorKind::Connection);
                        warn!("adapter disconnected");
                    }
                    SessionEvent::Error(message) => {
                        shared.stats.record_error(ErrorKind::Connection);
                        warn!(message, "venue error");
                    }
                }
            }

            if Instant::now() >= next_tick {
                next_tick += config.risk_interval;

                risk.check_daily_reset();
                let mid = shared.last_mid.load(Ordering::Acquire);
                if mid > 0 {
                    risk.mark_price(config.symbol, mid, monotonic_ns());
                }
                risk.check_loss_limits();

                if shared.resync_needed.swap(false, Ordering::AcqRel) {
                    shared.stats.resync_requests.fetch_add(1, Ordering::Relaxed);
                    if let Err(e) = adapter.request_resync(config.symbol) {
                        shared.stats.record_error(ErrorKind::Connection);
                        warn!(%e, "resync request failed");
                    }
                }
            } else {
                idle_wait(&mut spins);
            }
        }

        shared
            .stats
            .control_queue_drops
            .store(session.dropped(), Ordering::Release);
        debug!("risk worker exited");
    }
}
