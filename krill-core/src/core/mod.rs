//! Core types: fixed-point scalars, timestamps, orders, errors
//!
//! Everything in this module is allocation-free and `Copy` where possible;
//! these are the values that flow through the SPSC queues.

pub mod errors;
pub mod fixed_point;
pub mod time;
pub mod types;

pub use errors::{ConversionError, EngineError, ErrorKind, OrderStateError, SymbolTooLong};
pub use time::{monotonic_ns, wall_secs, Micros, Nanos};
pub use types::{Order, OrderId, OrderStatus, OrderType, Side, Symbol, TimeInForce};
