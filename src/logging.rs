//! Logging setup for binaries and tests that drive the engine.
//!
//! The engine itself only emits `tracing` events and spans: one span per
//! reconcile call (`reconcile.create`, `reconcile.read`, ...) and one for the
//! adopt-or-create sequence, with events at every phase transition. These
//! helpers install a subscriber that writes them to **stderr**, since
//! providers reserve stdout for their host protocol.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `hemmer_reconcile=debug`)
//!
//! ```bash
//! # Show every lookup, relist and merge
//! RUST_LOG=hemmer_reconcile=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level used when `RUST_LOG` is
/// not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Useful in tests, where several cases may race to install a subscriber.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_reconcile=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_reconcile::orchestrator=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        // The first call may lose to another test; the second never succeeds.
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
