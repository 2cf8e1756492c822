//! Worker placement: CPU pinning and scheduling priority
//!
//! Each engine worker can be pinned to a dedicated core to avoid
//! migrations and the cache evictions they bring. Real-time priority is
//! Linux-only and needs CAP_SYS_NICE; failures are reported, not fatal.

use anyhow::Result;
use core_affinity::CoreId;

/// Pin the current thread to one CPU core
pub fn pin_to_core(core: usize) -> Result<()> {
    if core_affinity::set_for_current(CoreId { id: core }) {
        tracing::info!(core, "worker pinned");
        Ok(())
    } else {
        anyhow::bail!("failed to pin thread to core {}", core)
    }
}

/// Number of cores visible to the process
pub fn num_cores() -> usize {
    core_affinity::get_core_ids().map(|ids| ids.len()).unwrap_or(1)
}

/// SCHED_FIFO with the given priority (Linux)
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    let param = sched_param {
        sched_priority: priority,
    };
    // SAFETY: sched_setscheduler only reads the param struct
    let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc == 0 {
        tracing::info!(priority, "SCHED_FIFO set");
        Ok(())
    } else {
        anyhow::bail!("sched_setscheduler failed (needs CAP_SYS_NICE or root)")
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("real-time priority not supported on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_at_least_one_core() {
        assert!(num_cores() >= 1);
    }

    #[test]
    fn pinning_does_not_panic() {
        // May fail without permissions; must not panic either way
        let _ = pin_to_core(0);
    }
}
