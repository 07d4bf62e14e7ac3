//! Logging setup for renderer tools and tests

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize logging at `level`, letting `RUST_LOG` override it
///
/// Panics if a logger was already installed.
pub fn init(level: LevelFilter) {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Initialize test logging, ignoring an already installed logger
///
/// Returns `true` if this call installed the logger.
pub fn try_init() -> bool {
    env_logger::builder().is_test(true).try_init().is_ok()
}
