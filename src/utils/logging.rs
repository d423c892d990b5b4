//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Safe to call more than once;
/// later calls are no-ops.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_ok() {
        tracing::debug!(level, json, "Logging initialized");
    }
}
