//! Core trading types
//!
//! Small, copyable, allocation-free: symbols are inline byte arrays,
//! enums are single bytes, order ids are u64. Everything here crosses
//! SPSC queues by value, so `Copy` is deliberate.

use crate::core::errors::{OrderStateError, SymbolTooLong};
use crate::core::time::Nanos;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum symbol length in bytes
pub const SYMBOL_MAX: usize = 16;

/// Instrument identifier, stored inline (no heap)
///
/// Primary key across the book, position and risk maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Symbol {
    len: u8,
    bytes: [u8; SYMBOL_MAX],
}

impl Symbol {
    /// Build from a string, rejecting anything over 16 bytes
    pub fn new(s: &str) -> Result<Self, SymbolTooLong> {
        if s.len() > SYMBOL_MAX {
            return Err(SymbolTooLong(s.to_string()));
        }
        let mut bytes = [0u8; SYMBOL_MAX];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self {
            len: s.len() as u8,
            bytes,
        })
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        // Construction only accepts &str, so the bytes are valid UTF-8
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = SymbolTooLong;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Client order id: `wall_secs << 32 | counter`
///
/// Unique within a session; the venue-assigned id is carried separately
/// on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct OrderId(pub u64);

static ORDER_COUNTER: AtomicU32 = AtomicU32::new(0);

impl OrderId {
    #[inline(always)]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generate the next session-unique id
    #[inline]
    pub fn next() -> Self {
        let secs = crate::core::time::wall_secs();
        let counter = ORDER_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self((secs << 32) | counter as u64)
    }

    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Sign of the position change a fill on this side produces
    #[inline(always)]
    pub const fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderType {
    Limit = 0,
    Market = 1,
    PostOnly = 2,
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good till cancelled
    Gtc = 0,
    /// Immediate or cancel
    Ioc = 1,
    /// Fill or kill
    Fok = 2,
}

/// Order status
///
/// `Filled`, `Cancelled`, `Rejected` and `Expired` are terminal: once
/// reached, the order is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrderStatus {
    Pending = 0,
    Open = 1,
    PartiallyFilled = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
    Expired = 6,
}

impl OrderStatus {
    #[inline(always)]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }
}

/// A working order as the engine tracks it
///
/// Invariants enforced by the mutators: `0 <= filled_qty <= quantity`,
/// `filled_qty` monotone, no transition out of a terminal status.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub client_id: OrderId,
    /// Venue-assigned id, once acknowledged
    pub exchange_id: Option<u64>,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub tif: TimeInForce,
    /// Fixed-point price (0 for market orders)
    pub price: i64,
    /// Fixed-point quantity
    pub quantity: i64,
    pub filled_qty: i64,
    pub status: OrderStatus,
    pub created_ts: Nanos,
    pub updated_ts: Nanos,
}

impl Order {
    pub fn new(
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        tif: TimeInForce,
        price: i64,
        quantity: i64,
        ts: Nanos,
    ) -> Self {
        Self {
            client_id: OrderId::next(),
            exchange_id: None,
            symbol,
            side,
            order_type,
            tif,
            price,
            quantity,
            filled_qty: 0,
            status: OrderStatus::Pending,
            created_ts: ts,
            updated_ts: ts,
        }
    }

    #[inline(always)]
    pub fn remaining_qty(&self) -> i64 {
        self.quantity - self.filled_qty
    }

    /// Record a fill of `qty` at time `ts`
    ///
    /// Moves the status to `PartiallyFilled` or `Filled`.
    pub fn apply_fill(&mut self, qty: i64, ts: Nanos) -> Result<(), OrderStateError> {
        if self.status.is_terminal() {
            return Err(OrderStateError::TerminalTransition);
        }
        if qty < 0 {
            return Err(OrderStateError::FillNotMonotonic);
        }
        if self.filled_qty + qty > self.quantity {
            return Err(OrderStateError::FillExceedsQuantity);
        }
        self.filled_qty += qty;
        self.status = if self.filled_qty == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_ts = ts;
        Ok(())
    }

    /// Transition to a new status (non-fill path: ack, cancel, reject)
    pub fn transition(&mut self, status: OrderStatus, ts: Nanos) -> Result<(), OrderStateError> {
        if self.status.is_terminal() {
            return Err(OrderStateError::TerminalTransition);
        }
        self.status = status;
        self.updated_ts = ts;
        Ok(())
    }
}
