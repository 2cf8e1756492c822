//! All-stop kill switch
//!
//! One atomic flag checked first by every pre-trade validation. Automatic
//! activation comes from the risk manager (consecutive errors, venue
//! rejects, loss/drawdown breach); deactivation is manual only. The
//! registered callback runs exactly once, on whichever caller wins the
//! activation race.

use crate::core::time::{monotonic_ns, Nanos};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

type Callback = Box<dyn FnOnce(&str) + Send>;

struct Inner {
    active: AtomicBool,
    reason: Mutex<Option<String>>,
    activated_at: Mutex<Option<Nanos>>,
    callback: Mutex<Option<Callback>>,
}

/// Shared kill switch handle
#[derive(Clone)]
pub struct KillSwitch {
    inner: Arc<Inner>,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                active: AtomicBool::new(false),
                reason: Mutex::new(None),
                activated_at: Mutex::new(None),
                callback: Mutex::new(None),
            }),
        }
    }

    /// Register the notification callback (replaces any previous one)
    pub fn set_callback(&self, f: impl FnOnce(&str) + Send + 'static) {
        *self.inner.callback.lock() = Some(Box::new(f));
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Trip the switch; idempotent, callback fires exactly once
    ///
    /// Returns true for the caller that actually flipped the flag.
    pub fn activate(&self, reason: &str) -> bool {
        if self.inner.active.swap(true, Ordering::AcqRel) {
            return false; // already active
        }

        error!(reason, "kill switch activated - all order flow halted");
        *self.inner.reason.lock() = Some(reason.to_string());
        *self.inner.activated_at.lock() = Some(monotonic_ns());

        if let Some(cb) = self.inner.callback.lock().take() {
            cb(reason);
        }
        true
    }

    /// Manual reset; clears the flag but keeps the last reason for logs
    pub fn deactivate(&self) {
        self.inner.active.store(false, Ordering::Release);
    }

    pub fn reason(&self) -> Option<String> {
        self.inner.reason.lock().clone()
    }

    pub fn activated_at(&self) -> Option<Nanos> {
        *self.inner.activated_at.lock()
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}
