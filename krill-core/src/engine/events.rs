//! Messages exchanged between engine workers

use crate::core::time::Nanos;
use crate::core::types::{OrderId, Side, Symbol};
use crate::strategy::QuoteDecision;

/// Strategy worker output: one decision bound to its reference price
#[derive(Debug, Clone, Copy)]
pub struct QuoteCommand {
    pub symbol: Symbol,
    pub decision: QuoteDecision,
    /// Mid at decision time; the risk deviation check measures against it
    pub reference_price: i64,
    pub ts: Nanos,
}

/// Order-worker notifications routed back to the strategy
#[derive(Debug, Clone, Copy)]
pub enum ExecutionNote {
    Fill {
        side: Side,
        price: i64,
        qty: i64,
    },
    Cancelled {
        id: OrderId,
    },
}
