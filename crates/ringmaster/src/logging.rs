//! Logging setup for processes that host a tournament.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Output is JSON when
/// either `json_format` here or in the settings asks for it.
///
/// # Errors
/// Fails if a global subscriber was already installed.
pub fn setup_logging(settings: &LoggingSettings, json_format: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || settings.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false).with_target(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_file(false).with_line_number(false))
            .try_init()?;
    }

    tracing::info!(level = %settings.level, "logging initialized");
    Ok(())
}
