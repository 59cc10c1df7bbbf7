//! Tracing setup for binaries.

use tracing_subscriber::EnvFilter;

/// Filter used when neither an override nor `RUST_LOG` is given.
pub const DEFAULT_LOG_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `filter_override` (from `TALLY_LOG`) wins when present and parseable
/// - then `RUST_LOG`
/// - then [`DEFAULT_LOG_FILTER`]
///
/// Logs go to stderr so stdout stays clean for JSON output. Calling this
/// twice is harmless; the second call is ignored.
pub fn init_tracing(filter_override: Option<&str>) {
    let filter = filter_override
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
