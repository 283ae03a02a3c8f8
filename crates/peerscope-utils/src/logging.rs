//! Logging and tracing utilities

use crate::config::{LogConfig, LogFormat};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    init_tracing_with(&LogConfig::default());
}

/// Initialize tracing subscriber from a [`LogConfig`]
///
/// `RUST_LOG` takes precedence over `config.default_filter`. Logs go to
/// stderr so that tables printed on stdout stay machine readable. A second
/// call leaves the installed subscriber in place.
pub fn init_tracing_with(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let directives = filter.to_string();

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    match installed {
        Ok(()) => debug!(filter = %directives, format = ?config.format, "Tracing initialized"),
        Err(e) => debug!("Tracing already initialized: {}", e),
    }
}
