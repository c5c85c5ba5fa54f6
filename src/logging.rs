//! Logging initialization and configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "exec_bridge=info";

/// Try to initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `exec_bridge=info`. Logs go to stderr so captured command
/// output on stdout stays clean.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    try_init_with(filter)
}

/// Initialize logging with an explicit filter, such as a level from the
/// config file (`"debug"`) or a full directive (`"exec_bridge=trace"`).
///
/// A bare level applies to this crate only. Invalid directives fall back to
/// the default filter.
pub fn init_with_filter(directive: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    try_init_with(filter_for(directive))
}

fn filter_for(directive: &str) -> EnvFilter {
    let directive = match directive {
        "error" | "warn" | "info" | "debug" | "trace" => format!("exec_bridge={}", directive),
        other => other.to_string(),
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn try_init_with(filter: EnvFilter) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
