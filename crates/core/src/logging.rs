//! Logging setup for Keystone binaries and tests.
//!
//! Library crates only emit `tracing` events. Whoever owns the process
//! installs a subscriber once, with one of the functions below; later calls
//! are ignored.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    /// One JSON object per event, for log shippers
    Json,
}

/// Installs a subscriber with the given format.
///
/// The filter comes from `RUST_LOG`, then `default_filter`, then `info`.
/// Returns `false` if a global subscriber was already set.
pub fn init_with(format: LogFormat, default_filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_FILTER)));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Plain => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
    };
    installed.is_ok()
}

/// Human-readable output.
///
/// ```no_run
/// keystone_core::logging::init();
/// tracing::info!("store opened");
/// ```
pub fn init() {
    init_with(LogFormat::Plain, None);
}

/// JSON output.
///
/// ```no_run
/// keystone_core::logging::init_json();
/// tracing::info!(scheme = "file", "store opened");
/// ```
pub fn init_json() {
    init_with(LogFormat::Json, None);
}
