//! Krill Core - single-venue market-making engine
//!
//! Krill connects to one exchange, maintains a live L2 order book from
//! streamed events, runs a quoting strategy and gates every outbound
//! order through a pre-trade risk manager.
//!
//! ## Architecture
//! - **One owner per state**: the tick worker owns the book, the risk
//!   manager owns position/PnL, the order worker owns the open-order map
//! - **Bounded SPSC queues** between workers; no shared mutable state on
//!   the hot path (the position map's mutex is the single exception, with
//!   O(1) critical sections)
//! - **i64 fixed-point (10^8)** for every price, quantity and money value;
//!   floats only at adapter and config boundaries
//! - **Message-passing adapter boundary**: venues enqueue typed events,
//!   never call back into engine state
//!
//! ## Core modules
//! - `core`: fixed-point scalars, timestamps, orders, errors
//! - `queue`: lock-free SPSC rings
//! - `orderbook`: L2 book, L3 index, depth metrics, snapshots
//! - `risk`: pre-trade checks, position/PnL, kill switch
//! - `strategy`: the quoting contract (implementations live in
//!   krill-strategies)
//! - `exchange`: adapter trait, typed events, paper venue
//! - `engine`: worker orchestration and lifecycle
//! - `config`: JSON configuration surface

pub mod config;
pub mod core;
pub mod engine;
pub mod exchange;
pub mod orderbook;
pub mod perf;
pub mod queue;
pub mod risk;
pub mod strategy;
pub mod utils;

// Re-export the types most callers touch
pub use crate::core::{
    fixed_point, monotonic_ns, EngineError, ErrorKind, Order, OrderId, OrderStatus, OrderType,
    Side, Symbol, TimeInForce,
};
pub use config::Config;
pub use engine::{EngineConfig, EngineStats, TradingEngine};
pub use exchange::{AdapterRegistry, ExchangeAdapter, PaperAdapter};
pub use orderbook::{BookSnapshot, BookState, OrderBook};
pub use risk::{RiskDecision, RiskLimits, RiskManager, RiskReason};
pub use strategy::{MarketSignal, PositionView, QuoteDecision, QuoteGate, Quoter};

/// Prelude for binaries and tests
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{fixed_point, EngineError, Order, OrderId, Side, Symbol};
    pub use crate::engine::{EngineConfig, TradingEngine};
    pub use crate::exchange::{AdapterRegistry, ExchangeAdapter, PaperAdapter};
    pub use crate::orderbook::{BookSnapshot, OrderBook};
    pub use crate::risk::{RiskLimits, RiskManager};
    pub use crate::strategy::{QuoteDecision, Quoter};
    pub use crate::utils::init_logger;
}
