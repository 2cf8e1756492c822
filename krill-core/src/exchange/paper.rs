//! Paper trading adapter
//!
//! In-process venue used for dry runs and the integration tests. Orders
//! are acknowledged immediately; a resting order fills when an injected
//! market update crosses its price, at the order's own price (pessimistic:
//! no price improvement). Tests drive it with `inject_top`,
//! `inject_snapshot` and `inject_trade`.

use crate::core::errors::EngineError;
use crate::core::time::monotonic_ns;
use crate::core::types::{OrderId, OrderStatus, OrderType, Side, Symbol};
use crate::exchange::{
    AdapterEventSender, Balance, CancelRequest, CancelResponse, ExchangeAdapter, MarketEvent,
    OrderRequest, OrderResponse, OrderSummary, OrderUpdate, SessionEvent, TradeEvent,
};
use crate::orderbook::TOP_DEPTH;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

const PAPER_BALANCE: i64 = 1_000_000 * crate::core::fixed_point::SCALE;

#[derive(Debug, Clone, Copy)]
struct Resting {
    request: OrderRequest,
    exchange_id: u64,
}

/// Simulated venue holding resting orders against an injected top of book
pub struct PaperAdapter {
    connected: AtomicBool,
    events: Mutex<Option<AdapterEventSender>>,
    resting: Mutex<HashMap<OrderId, Resting>>,
    /// (best_bid, best_ask) per symbol from injected data
    tops: Mutex<HashMap<Symbol, (i64, i64)>>,
    next_exchange_id: AtomicU64,
    next_sequence: AtomicU64,
    resync_requests: AtomicU64,
}

impl PaperAdapter {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            events: Mutex::new(None),
            resting: Mutex::new(HashMap::new()),
            tops: Mutex::new(HashMap::new()),
            next_exchange_id: AtomicU64::new(1),
            next_sequence: AtomicU64::new(1),
            resync_requests: AtomicU64::new(0),
        }
    }

    /// Resync snapshots requested so far (for tests and stats)
    pub fn resync_requests(&self) -> u64 {
        self.resync_requests.load(Ordering::Relaxed)
    }

    /// Inject a new top of book and run the fill simulation
    ///
    /// Emits the two L2 updates through the market queue, then fills any
    /// resting order the new top crosses.
    pub fn inject_top(&self, symbol: Symbol, bid: (i64, i64), ask: (i64, i64)) {
        let now = monotonic_ns();
        {
            let events = self.events.lock();
            if let Some(events) = events.as_ref() {
                let seq = self.next_sequence.fetch_add(2, Ordering::Relaxed);
                events.deliver_market(MarketEvent::L2Update {
                    symbol,
                    sequence: seq,
                    side: Side::Buy,
                    price: bid.0,
                    quantity: bid.1,
                    exchange_ts: now,
                    local_ts: now,
                });
                events.deliver_market(MarketEvent::L2Update {
                    symbol,
                    sequence: seq + 1,
                    side: Side::Sell,
                    price: ask.0,
                    quantity: ask.1,
                    exchange_ts: now,
                    local_ts: now,
                });
            }
        }
        self.tops.lock().insert(symbol, (bid.0, ask.0));
        self.match_resting(symbol, bid.0, ask.0);
    }

    /// Inject a full snapshot (also used to answer resync requests)
    pub fn inject_snapshot(&self, symbol: Symbol, bids: &[(i64, i64)], asks: &[(i64, i64)]) {
        let now = monotonic_ns();
        let mut bid_arr = [(0i64, 0i64); TOP_DEPTH];
        let mut ask_arr = [(0i64, 0i64); TOP_DEPTH];
        let bid_len = bids.len().min(TOP_DEPTH);
        let ask_len = asks.len().min(TOP_DEPTH);
        bid_arr[..bid_len].copy_from_slice(&bids[..bid_len]);
        ask_arr[..ask_len].copy_from_slice(&asks[..ask_len]);

        if let Some(events) = self.events.lock().as_ref() {
            events.deliver_market(MarketEvent::Snapshot {
                symbol,
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
                bids: bid_arr,
                asks: ask_arr,
                bid_len,
                ask_len,
                exchange_ts: now,
                local_ts: now,
            });
        }

        let best_bid = bids.first().map(|&(p, _)| p).unwrap_or(0);
        let best_ask = asks.first().map(|&(p, _)| p).unwrap_or(0);
        self.tops.lock().insert(symbol, (best_bid, best_ask));
        self.match_resting(symbol, best_bid, best_ask);
    }

    /// Inject a public trade print
    pub fn inject_trade(&self, symbol: Symbol, price: i64, quantity: i64, side: Side) {
        let now = monotonic_ns();
        if let Some(events) = self.events.lock().as_ref() {
            events.deliver_trade(TradeEvent {
                symbol,
                price,
                quantity,
                side,
                exchange_ts: now,
                local_ts: now,
            });
        }
    }

    fn match_resting(&self, symbol: Symbol, best_bid: i64, best_ask: i64) {
        let mut filled = Vec::new();
        {
            let mut resting = self.resting.lock();
            resting.retain(|_, order| {
                if order.request.symbol != symbol {
                    return true;
                }
                let crosses = match order.request.side {
                    Side::Buy => best_ask > 0 && best_ask <= order.request.price,
                    Side::Sell => best_bid > 0 && best_bid >= order.request.price,
                };
                if crosses {
                    filled.push(*order);
                    false
                } else {
                    true
                }
            });
        }

        for order in filled {
            debug!(client_id = %order.request.client_id, "paper fill");
            self.emit_update(
                &order.request,
                order.exchange_id,
                OrderStatus::Filled,
                order.request.quantity,
                order.request.price,
            );
        }
    }

    fn emit_update(
        &self,
        request: &OrderRequest,
        exchange_id: u64,
        status: OrderStatus,
        fill_qty: i64,
        fill_price: i64,
    ) {
        let now = monotonic_ns();
        if let Some(events) = self.events.lock().as_ref() {
            events.deliver_order_update(OrderUpdate {
                client_id: request.client_id,
                exchange_id,
                symbol: request.symbol,
                status,
                fill_qty,
                fill_price,
                exchange_ts: now,
                local_ts: now,
            });
        }
    }

    fn require_connected(&self) -> Result<(), EngineError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(EngineError::Connection("paper adapter not connected".into()))
        }
    }
}

impl Default for PaperAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeAdapter for PaperAdapter {
    fn name(&self) -> &str {
        "paper"
    }

    fn connect(&self, events: AdapterEventSender) -> Result<(), EngineError> {
        info!("paper adapter connected");
        events.deliver_session(SessionEvent::Connected);
        *self.events.lock() = Some(events);
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), EngineError> {
        if let Some(events) = self.events.lock().as_ref() {
            events.deliver_session(SessionEvent::Disconnected);
        }
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn subscribe_ticker(&self, _symbol: Symbol) -> Result<(), EngineError> {
        self.require_connected()
    }

    fn subscribe_orderbook(&self, _symbol: Symbol, _depth: usize) -> Result<(), EngineError> {
        self.require_connected()
    }

    fn subscribe_trades(&self, _symbol: Symbol) -> Result<(), EngineError> {
        self.require_connected()
    }

    fn unsubscribe(&self, _symbol: Symbol) -> Result<(), EngineError> {
        Ok(())
    }

    fn send_order(&self, request: &OrderRequest) -> Result<OrderResponse, EngineError> {
        self.require_connected()?;
        let exchange_id = self.next_exchange_id.fetch_add(1, Ordering::Relaxed);
        let (best_bid, best_ask) = self
            .tops
            .lock()
            .get(&request.symbol)
            .copied()
            .unwrap_or((0, 0));

        let would_cross = match request.side {
            Side::Buy => best_ask > 0 && request.price >= best_ask,
            Side::Sell => best_bid > 0 && request.price <= best_bid,
        };

        match request.order_type {
            OrderType::PostOnly if would_cross => {
                self.emit_update(request, exchange_id, OrderStatus::Rejected, 0, 0);
                return Ok(OrderResponse {
                    client_id: request.client_id,
                    exchange_id,
                    accepted: false,
                    message: Some("post-only order would cross".into()),
                });
            }
            OrderType::Market => {
                let fill_price = match request.side {
                    Side::Buy => best_ask,
                    Side::Sell => best_bid,
                };
                if fill_price == 0 {
                    self.emit_update(request, exchange_id, OrderStatus::Rejected, 0, 0);
                    return Ok(OrderResponse {
                        client_id: request.client_id,
                        exchange_id,
                        accepted: false,
                        message: Some("no liquidity for market order".into()),
                    });
                }
                self.emit_update(request, exchange_id, OrderStatus::Open, 0, 0);
                self.emit_update(
                    request,
                    exchange_id,
                    OrderStatus::Filled,
                    request.quantity,
                    fill_price,
                );
                return Ok(OrderResponse {
                    client_id: request.client_id,
                    exchange_id,
                    accepted: true,
                    message: None,
                });
            }
            _ => {}
        }

        self.emit_update(request, exchange_id, OrderStatus::Open, 0, 0);
        if would_cross {
            // Aggressive limit: immediate fill at its own price
            self.emit_update(
                request,
                exchange_id,
                OrderStatus::Filled,
                request.quantity,
                request.price,
            );
        } else {
            self.resting.lock().insert(
                request.client_id,
                Resting {
                    request: *request,
                    exchange_id,
                },
            );
        }

        Ok(OrderResponse {
            client_id: request.client_id,
            exchange_id,
            accepted: true,
            message: None,
        })
    }

    fn cancel_order(&self, request: &CancelRequest) -> Result<CancelResponse, EngineError> {
        self.require_connected()?;
        let removed = self.resting.lock().remove(&request.client_id);
        if let Some(order) = removed {
            self.emit_update(&order.request, order.exchange_id, OrderStatus::Cancelled, 0, 0);
            Ok(CancelResponse { cancelled: 1 })
        } else {
            Ok(CancelResponse { cancelled: 0 })
        }
    }

    fn cancel_all_orders(&self, symbol: Symbol) -> Result<CancelResponse, EngineError> {
        self.require_connected()?;
        let mut cancelled = Vec::new();
        self.resting.lock().retain(|_, order| {
            if order.request.symbol == symbol {
                cancelled.push(*order);
                false
            } else {
                true
            }
        });
        for order in &cancelled {
            self.emit_update(&order.request, order.exchange_id, OrderStatus::Cancelled, 0, 0);
        }
        Ok(CancelResponse {
            cancelled: cancelled.len() as u32,
        })
    }

    fn get_balance(&self, asset: &str) -> Result<Balance, EngineError> {
        Ok(Balance {
            asset: asset.to_string(),
            total: PAPER_BALANCE,
            available: PAPER_BALANCE,
        })
    }

    fn get_open_orders(&self, symbol: Symbol) -> Result<Vec<OrderSummary>, EngineError> {
        Ok(self
            .resting
            .lock()
            .values()
            .filter(|o| o.request.symbol == symbol)
            .map(|o| OrderSummary {
                client_id: o.request.client_id,
                exchange_id: o.exchange_id,
                symbol: o.request.symbol,
                side: o.request.side,
                price: o.request.price,
                quantity: o.request.quantity,
                filled_qty: 0,
            })
            .collect())
    }

    fn request_resync(&self, symbol: Symbol) -> Result<(), EngineError> {
        self.resync_requests.fetch_add(1, Ordering::Relaxed);
        let (bid, ask) = self.tops.lock().get(&symbol).copied().unwrap_or((0, 0));
        if bid > 0 || ask > 0 {
            // Answer with a snapshot of what the venue currently knows
            self.inject_snapshot(
                symbol,
                &[(bid, crate::core::fixed_point::SCALE)],
                &[(ask, crate::core::fixed_point::SCALE)],
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed_point::SCALE;
    use crate::core::types::TimeInForce;
    use crate::queue::channel;

    fn wire() -> (
        PaperAdapter,
        crate::queue::Consumer<MarketEvent>,
        crate::queue::Consumer<OrderUpdate>,
        crate::queue::Consumer<TradeEvent>,
        crate::queue::Consumer<SessionEvent>,
    ) {
        let (mtx, mrx) = channel(256);
        let (otx, orx) = channel(256);
        let (ttx, trx) = channel(256);
        let (stx, srx) = channel(64);
        let adapter = PaperAdapter::new();
        adapter
            .connect(AdapterEventSender::new(mtx, otx, ttx, stx))
            .unwrap();
        (adapter, mrx, orx, trx, srx)
    }

    fn sym() -> Symbol {
        Symbol::new("BTCUSDT").unwrap()
    }

    fn limit(side: Side, price: i64, qty: i64) -> OrderRequest {
        OrderRequest {
            client_id: OrderId::next(),
            symbol: sym(),
            side,
            order_type: OrderType::Limit,
            tif: TimeInForce::Gtc,
            price,
            quantity: qty,
        }
    }

    #[test]
    fn connect_emits_session_event() {
        let (_, _, _, _, srx) = wire();
        assert!(matches!(srx.pop(), Some(SessionEvent::Connected)));
    }

    #[test]
    fn resting_order_fills_when_crossed() {
        let (adapter, _mrx, orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));

        let req = limit(Side::Buy, 100 * SCALE + SCALE / 2, SCALE);
        let resp = adapter.send_order(&req).unwrap();
        assert!(resp.accepted);

        // Ack first
        let ack = orx.pop().unwrap();
        assert_eq!(ack.status, OrderStatus::Open);
        assert_eq!(ack.client_id, req.client_id);
        assert!(orx.pop().is_none());

        // Ask drops through our bid: fill at our price
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (100 * SCALE + SCALE / 4, SCALE));
        let fill = orx.pop().unwrap();
        assert_eq!(fill.status, OrderStatus::Filled);
        assert_eq!(fill.fill_qty, SCALE);
        assert_eq!(fill.fill_price, 100 * SCALE + SCALE / 2);
    }

    #[test]
    fn aggressive_limit_fills_immediately() {
        let (adapter, _mrx, orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));

        let req = limit(Side::Buy, 101 * SCALE, SCALE);
        adapter.send_order(&req).unwrap();

        assert_eq!(orx.pop().unwrap().status, OrderStatus::Open);
        let fill = orx.pop().unwrap();
        assert_eq!(fill.status, OrderStatus::Filled);
        assert!(adapter.get_open_orders(sym()).unwrap().is_empty());
    }

    #[test]
    fn post_only_crossing_is_rejected() {
        let (adapter, _mrx, orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));

        let mut req = limit(Side::Sell, 100 * SCALE, SCALE);
        req.order_type = OrderType::PostOnly;
        let resp = adapter.send_order(&req).unwrap();
        assert!(!resp.accepted);
        assert_eq!(orx.pop().unwrap().status, OrderStatus::Rejected);
    }

    #[test]
    fn cancel_all_clears_symbol() {
        let (adapter, _mrx, orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));

        adapter.send_order(&limit(Side::Buy, 99 * SCALE, SCALE)).unwrap();
        adapter.send_order(&limit(Side::Sell, 102 * SCALE, SCALE)).unwrap();
        while orx.pop().is_some() {}

        let resp = adapter.cancel_all_orders(sym()).unwrap();
        assert_eq!(resp.cancelled, 2);
        assert_eq!(orx.pop().unwrap().status, OrderStatus::Cancelled);
        assert_eq!(orx.pop().unwrap().status, OrderStatus::Cancelled);
        assert!(adapter.get_open_orders(sym()).unwrap().is_empty());
    }

    #[test]
    fn market_order_fills_at_touch() {
        let (adapter, _mrx, orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));

        let mut req = limit(Side::Buy, 0, SCALE);
        req.order_type = OrderType::Market;
        adapter.send_order(&req).unwrap();

        assert_eq!(orx.pop().unwrap().status, OrderStatus::Open);
        let fill = orx.pop().unwrap();
        assert_eq!(fill.fill_price, 101 * SCALE);
    }

    #[test]
    fn resync_replays_snapshot() {
        let (adapter, mrx, _orx, _trx, _srx) = wire();
        adapter.inject_top(sym(), (100 * SCALE, SCALE), (101 * SCALE, SCALE));
        while mrx.pop().is_some() {}

        adapter.request_resync(sym()).unwrap();
        assert_eq!(adapter.resync_requests(), 1);
        assert!(matches!(mrx.pop(), Some(MarketEvent::Snapshot { .. })));
    }
}
