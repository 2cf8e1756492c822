//! Monotonic timestamps and wall-clock helpers
//!
//! All pipeline timestamps are monotonic nanoseconds from a process-wide
//! epoch; they are strictly non-decreasing on any one worker and are used
//! for ordering, quote-life gating and staleness checks. Wall-clock time
//! only appears where the outside world needs it: the one-second rate
//! window and the daily PnL reset.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic nanoseconds since the process epoch
pub type Nanos = u64;

/// Microseconds, used for the quote gating config knobs
pub type Micros = u64;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Current monotonic time in nanoseconds
///
/// First call anchors the epoch; afterwards this is a single
/// `Instant::elapsed` read.
#[inline]
pub fn monotonic_ns() -> Nanos {
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Wall-clock seconds since the Unix epoch
///
/// A clock stepped before 1970 reads as 0 rather than panicking.
#[inline]
pub fn wall_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Start of the UTC day containing `secs`
#[inline]
pub const fn day_start(secs: u64) -> u64 {
    (secs / 86_400) * 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_never_decreases() {
        let mut last = monotonic_ns();
        for _ in 0..1_000 {
            let now = monotonic_ns();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn day_start_floors() {
        assert_eq!(day_start(0), 0);
        assert_eq!(day_start(86_399), 0);
        assert_eq!(day_start(86_400), 86_400);
        assert_eq!(day_start(2 * 86_400 + 123), 2 * 86_400);
    }
}
