// Logging setup
use env_logger::{Builder, Env};

/// Initialize env_logger with `default_level` unless RUST_LOG overrides it.
/// Safe to call more than once.
pub fn init(default_level: &str) {
    let _ = Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
}
