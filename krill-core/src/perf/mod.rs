//! Performance utilities: object pooling and worker placement

pub mod cpu;
pub mod pool;

pub use cpu::{num_cores, pin_to_core, set_realtime_priority};
pub use pool::OrderPool;
