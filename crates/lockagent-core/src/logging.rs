//! Logging bootstrap shared by lockagent binaries.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialise the global logger with `default_level` unless `RUST_LOG` is set.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level),
        )
        .format_timestamp_secs()
        .init();
    });
}
