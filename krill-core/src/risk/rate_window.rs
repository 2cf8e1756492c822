//! Rolling one-second order rate window
//!
//! One u64 packs the current wall-clock second (high 32 bits) and the
//! count of orders admitted in that second (low 32 bits). Crossing a
//! second boundary resets the count in the same CAS, so the whole check
//! is a short lock-free loop.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RateWindow {
    state: AtomicU64,
}

impl RateWindow {
    pub const fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
        }
    }

    /// Try to admit one order in the second `now_secs`
    ///
    /// Returns false once `limit` orders have been admitted in the
    /// current second; the counter resets on the next second boundary.
    #[inline]
    pub fn try_acquire(&self, now_secs: u64, limit: u32) -> bool {
        let second = (now_secs as u32) as u64;
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let (cur_second, count) = (current >> 32, (current & 0xffff_ffff) as u32);
            let proposed = if cur_second != second {
                // New second: reset and take the first slot
                (second << 32) | 1
            } else if count < limit {
                current + 1
            } else {
                return false;
            };

            match self.state.compare_exchange_weak(
                current,
                proposed,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Orders admitted in the given second so far
    pub fn count_in(&self, now_secs: u64) -> u32 {
        let state = self.state.load(Ordering::Acquire);
        if state >> 32 == (now_secs as u32) as u64 {
            (state & 0xffff_ffff) as u32
        } else {
            0
        }
    }
}
