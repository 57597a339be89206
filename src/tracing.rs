//! Tracing utilities for the library

// Re-export the external tracing crate
pub use ::tracing::*;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "db_txnmgr=debug,info";

/// Install a formatting subscriber when `RUST_ENV` is set to "DEBUG".
///
/// `RUST_LOG` overrides the default filter. Calling this more than once, or
/// after another subscriber was installed, does nothing.
pub fn init_tracing() {
    if std::env::var("RUST_ENV").map(|env| env == "DEBUG").unwrap_or(false) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = ::tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}
