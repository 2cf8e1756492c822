//! Typed errors for the trading core
//!
//! The hot path never unwinds across worker boundaries: workers convert
//! failures into `ErrorKind`-counted events and keep running when the
//! condition is recoverable. `EngineError` carries the full taxonomy for
//! lifecycle code and logs.

use thiserror::Error;

/// Errors from fixed-point conversions at the boundaries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Value cannot be represented in i64 fixed-point
    #[error("value {value} is out of range for fixed-point representation")]
    OutOfRange { value: f64 },

    /// NaN is not a price
    #[error("cannot convert NaN to fixed-point")]
    NotANumber,

    /// Infinity is not a price
    #[error("cannot convert infinity to fixed-point (positive: {positive})")]
    Infinite { positive: bool },

    /// String did not parse as a decimal number
    #[error("cannot parse {input:?} as a decimal number")]
    Unparseable { input: String },
}

/// Symbol construction failure (symbols are inline, max 16 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("symbol {0:?} exceeds 16 bytes")]
pub struct SymbolTooLong(pub String);

/// Violations of the order state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderStateError {
    /// Terminal orders (filled/cancelled/rejected/expired) are immutable
    #[error("order is terminal and cannot transition")]
    TerminalTransition,

    /// `filled_qty` may only grow
    #[error("fill would decrease filled quantity")]
    FillNotMonotonic,

    /// `filled_qty` must stay within the order quantity
    #[error("fill exceeds order quantity")]
    FillExceedsQuantity,
}

/// Error taxonomy for the whole engine
///
/// One variant per class in the propagation policy: `Risk` and
/// `OrderReject` feed the kill-switch thresholds, `BookInconsistency`
/// triggers a resync, `Internal` is fatal.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad or missing configuration
    #[error("config error: {0}")]
    Config(String),

    /// Exchange connectivity failure
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected message from the adapter
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Pre-trade risk rejection
    #[error("risk rejection: {0}")]
    Risk(String),

    /// Venue rejected the order
    #[error("order rejected by venue: {0}")]
    OrderReject(String),

    /// Sequence gap or crossed book beyond the transient window
    #[error("book inconsistency: {0}")]
    BookInconsistency(String),

    /// Invariant violation or resource exhaustion; fatal
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Fatal errors force shutdown with a non-zero exit
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Internal(_))
    }

    /// Classify for the per-kind counters
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Config(_) => ErrorKind::Config,
            EngineError::Connection(_) => ErrorKind::Connection,
            EngineError::Protocol(_) => ErrorKind::Protocol,
            EngineError::Risk(_) => ErrorKind::Risk,
            EngineError::OrderReject(_) => ErrorKind::OrderReject,
            EngineError::BookInconsistency(_) => ErrorKind::BookInconsistency,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Dense error classification used for monitoring counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    Config = 0,
    Connection = 1,
    Protocol = 2,
    Risk = 3,
    OrderReject = 4,
    BookInconsistency = 5,
    Internal = 6,
}

impl ErrorKind {
    /// Number of kinds, for counter arrays
    pub const COUNT: usize = 7;

    /// Index into a counter array
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_is_fatal() {
        assert!(EngineError::Internal("pool exhausted".into()).is_fatal());
        assert!(!EngineError::Risk("position limit".into()).is_fatal());
        assert!(!EngineError::BookInconsistency("gap".into()).is_fatal());
    }

    #[test]
    fn kind_indices_are_dense() {
        let kinds = [
            ErrorKind::Config,
            ErrorKind::Connection,
            ErrorKind::Protocol,
            ErrorKind::Risk,
            ErrorKind::OrderReject,
            ErrorKind::BookInconsistency,
            ErrorKind::Internal,
        ];
        for (i, k) in kinds.iter().enumerate() {
            assert_eq!(k.index(), i);
        }
        assert_eq!(kinds.len(), ErrorKind::COUNT);
    }

    #[test]
    fn conversion_error_display() {
        let msg = ConversionError::OutOfRange { value: 1e20 }.to_string();
        assert!(msg.contains("out of range"));
    }
}
