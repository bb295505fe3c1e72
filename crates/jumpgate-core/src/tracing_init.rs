//! Shared tracing/logging initialization.
//!
//! Every `Jumpgate` binary sets up `tracing_subscriber` the same way: an
//! env-filter with a per-binary default and an optional JSON formatter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- `RUST_LOG` fallback when the env-var is unset
///   (e.g. `"jumpgate_terminal=info"`).
/// * `log_json` -- emit structured JSON lines instead of the human-readable
///   format.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt)
            .init();
    }
}
