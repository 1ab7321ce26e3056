//! Logging bootstrap
//!
//! The library only emits through the `log` facade; binaries and tests pick
//! the backend.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with `level` as the default filter.
///
/// `RUST_LOG` still overrides the default when set. Calling this more than
/// once is harmless, which keeps it usable from test harnesses.
pub fn init_with_level(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
}
