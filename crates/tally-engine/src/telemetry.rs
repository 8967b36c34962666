//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Initializes the global tracing subscriber.
///
/// ## Log Levels
/// - ERROR: Failed stock compensation
/// - WARN: Restock skipped during cancellation
/// - INFO: Order created / status changed / product changes
/// - DEBUG: Store calls
///
/// Respects `RUST_LOG`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init: a subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("tracing initialized");
    }
}
