use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the process-wide tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set. Safe to call more
/// than once; later calls are no-ops (tests initialize repeatedly).
pub fn init_logger(log_level: &str, json_logs: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let result = if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
    };
    // Already initialized is fine
    let _ = result;
}
