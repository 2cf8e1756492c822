//! Exchange adapter boundary
//!
//! The core never talks wire protocols. An adapter implements
//! [`ExchangeAdapter`] for its venue and delivers everything inbound as
//! typed events through [`AdapterEventSender`] - the producer halves of
//! the engine's queues. There are no callbacks into engine state, so an
//! adapter cannot re-enter a worker, and the whole pipeline can be driven
//! by synthesized events in tests.
//!
//! Timestamps: events carry the venue's `exchange_ts` and the receipt
//! `local_ts`; the engine orders by local and keeps exchange time for
//! analytics.

pub mod paper;

pub use paper::PaperAdapter;

use crate::core::errors::EngineError;
use crate::core::time::Nanos;
use crate::core::types::{OrderId, OrderStatus, OrderType, Side, Symbol, TimeInForce};
use crate::orderbook::{BookOrder, TOP_DEPTH};
use crate::queue::Producer;
use std::collections::HashMap;
use std::sync::Arc;

/// Inbound market data, one message per book mutation
#[derive(Debug, Clone, Copy)]
pub enum MarketEvent {
    /// One aggregated level changed; quantity 0 removes the level
    L2Update {
        symbol: Symbol,
        sequence: u64,
        side: Side,
        price: i64,
        quantity: i64,
        exchange_ts: Nanos,
        local_ts: Nanos,
    },
    /// Full replacement of both sides (initial sync / resync)
    Snapshot {
        symbol: Symbol,
        sequence: u64,
        bids: [(i64, i64); TOP_DEPTH],
        asks: [(i64, i64); TOP_DEPTH],
        bid_len: usize,
        ask_len: usize,
        exchange_ts: Nanos,
        local_ts: Nanos,
    },
    /// Per-order add for venues with L3 feeds
    L3Add {
        symbol: Symbol,
        order: BookOrder,
        exchange_ts: Nanos,
        local_ts: Nanos,
    },
    L3Modify {
        symbol: Symbol,
        id: OrderId,
        new_quantity: i64,
        exchange_ts: Nanos,
        local_ts: Nanos,
    },
    L3Remove {
        symbol: Symbol,
        id: OrderId,
        exchange_ts: Nanos,
        local_ts: Nanos,
    },
}

impl MarketEvent {
    #[inline]
    pub fn symbol(&self) -> Symbol {
        match self {
            MarketEvent::L2Update { symbol, .. }
            | MarketEvent::Snapshot { symbol, .. }
            | MarketEvent::L3Add { symbol, .. }
            | MarketEvent::L3Modify { symbol, .. }
            | MarketEvent::L3Remove { symbol, .. } => *symbol,
        }
    }

    #[inline]
    pub fn local_ts(&self) -> Nanos {
        match self {
            MarketEvent::L2Update { local_ts, .. }
            | MarketEvent::Snapshot { local_ts, .. }
            | MarketEvent::L3Add { local_ts, .. }
            | MarketEvent::L3Modify { local_ts, .. }
            | MarketEvent::L3Remove { local_ts, .. } => *local_ts,
        }
    }
}

/// State change of one of our orders, in venue order
#[derive(Debug, Clone, Copy)]
pub struct OrderUpdate {
    pub client_id: OrderId,
    pub exchange_id: u64,
    pub symbol: Symbol,
    pub status: OrderStatus,
    /// Incremental fill carried by this update (0 for pure status moves)
    pub fill_qty: i64,
    pub fill_price: i64,
    pub exchange_ts: Nanos,
    pub local_ts: Nanos,
}

/// A public trade print
#[derive(Debug, Clone, Copy)]
pub struct TradeEvent {
    pub symbol: Symbol,
    pub price: i64,
    pub quantity: i64,
    /// Aggressor side
    pub side: Side,
    pub exchange_ts: Nanos,
    pub local_ts: Nanos,
}

/// Connection-level events for the control queue
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    /// Venue or transport error, recoverable from the engine's viewpoint
    Error(String),
}

/// Outbound order as handed to the adapter
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest {
    pub client_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub tif: TimeInForce,
    pub price: i64,
    pub quantity: i64,
}

/// Synchronous acknowledgement of `send_order`
#[derive(Debug, Clone)]
pub struct OrderResponse {
    pub client_id: OrderId,
    pub exchange_id: u64,
    pub accepted: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CancelRequest {
    pub symbol: Symbol,
    pub client_id: OrderId,
}

#[derive(Debug, Clone, Copy)]
pub struct CancelResponse {
    /// Orders actually cancelled
    pub cancelled: u32,
}

#[derive(Debug, Clone)]
pub struct Balance {
    pub asset: String,
    pub total: i64,
    pub available: i64,
}

/// Resting order as reported by the venue
#[derive(Debug, Clone, Copy)]
pub struct OrderSummary {
    pub client_id: OrderId,
    pub exchange_id: u64,
    pub symbol: Symbol,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub filled_qty: i64,
}

/// Producer halves of the engine queues, owned by the adapter
///
/// `deliver_*` drops on overflow and counts it; the engine surfaces the
/// counters through its stats.
pub struct AdapterEventSender {
    market: Producer<MarketEvent>,
    orders: Producer<OrderUpdate>,
    trades: Producer<TradeEvent>,
    session: Producer<SessionEvent>,
}

impl AdapterEventSender {
    pub fn new(
        market: Producer<MarketEvent>,
        orders: Producer<OrderUpdate>,
        trades: Producer<TradeEvent>,
        session: Producer<SessionEvent>,
    ) -> Self {
        Self {
            market,
            orders,
            trades,
            session,
        }
    }

    #[inline]
    pub fn deliver_market(&self, event: MarketEvent) -> bool {
        self.market.push_or_drop(event)
    }

    #[inline]
    pub fn deliver_order_update(&self, update: OrderUpdate) -> bool {
        self.orders.push_or_drop(update)
    }

    #[inline]
    pub fn deliver_trade(&self, trade: TradeEvent) -> bool {
        self.trades.push_or_drop(trade)
    }

    #[inline]
    pub fn deliver_session(&self, event: SessionEvent) -> bool {
        self.session.push_or_drop(event)
    }
}

/// What the core requires from a venue integration
///
/// Methods take `&self`: adapters are shared between the order worker
/// (order operations) and their own I/O threads, and manage interior
/// state themselves.
pub trait ExchangeAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Bind the event sender and bring the session up
    fn connect(&self, events: AdapterEventSender) -> Result<(), EngineError>;
    fn disconnect(&self) -> Result<(), EngineError>;
    fn is_connected(&self) -> bool;

    fn subscribe_ticker(&self, symbol: Symbol) -> Result<(), EngineError>;
    fn subscribe_orderbook(&self, symbol: Symbol, depth: usize) -> Result<(), EngineError>;
    fn subscribe_trades(&self, symbol: Symbol) -> Result<(), EngineError>;
    fn unsubscribe(&self, symbol: Symbol) -> Result<(), EngineError>;

    fn send_order(&self, request: &OrderRequest) -> Result<OrderResponse, EngineError>;
    fn cancel_order(&self, request: &CancelRequest) -> Result<CancelResponse, EngineError>;
    fn cancel_all_orders(&self, symbol: Symbol) -> Result<CancelResponse, EngineError>;

    fn get_balance(&self, asset: &str) -> Result<Balance, EngineError>;
    fn get_open_orders(&self, symbol: Symbol) -> Result<Vec<OrderSummary>, EngineError>;

    /// Ask the venue for a fresh book snapshot after a sequence gap
    fn request_resync(&self, symbol: Symbol) -> Result<(), EngineError>;
}

type AdapterFactory =
    Box<dyn Fn(&crate::config::ExchangeConfig) -> Result<Arc<dyn ExchangeAdapter>, EngineError> + Send + Sync>;

/// Name -> constructor registry handed to the engine at startup
///
/// No global state: the binary builds one, registers what it links, and
/// passes it in.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(&crate::config::ExchangeConfig) -> Result<Arc<dyn ExchangeAdapter>, EngineError>
            + Send
            + Sync
            + 'static,
    ) {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn build(
        &self,
        name: &str,
        config: &crate::config::ExchangeConfig,
    ) -> Result<Arc<dyn ExchangeAdapter>, EngineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::Config(format!("unknown exchange adapter {:?}", name)))?;
        factory(config)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
