//! Lock-free message passing between workers

pub mod spsc;

pub use spsc::{channel, Consumer, Producer, QueueStats};
