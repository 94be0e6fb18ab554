//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::error::ConfigWarning;

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug,sqlx=info"
    } else {
        "info,sqlx=warn"
    }
}

/// Install the global subscriber.
///
/// Logs go to stderr, leaving stdout to command output. They are JSON when
/// `JSON_LOGS` is set and human-readable otherwise. Returns `false` if a
/// subscriber was already installed.
pub fn init_tracing(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(settings.debug())));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.json_logs() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.is_ok()
}

/// Log warnings collected while resolving settings.
pub fn log_config_warnings(warnings: &[ConfigWarning]) {
    for warning in warnings {
        tracing::warn!(warning = %warning, "Configuration warning");
    }
}
