//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogFormat;
use crate::error::BotError;

const DEBUG_DIRECTIVES: &str =
    "info,structurebot=debug,structure_core=debug,structure_esi=debug,structure_notify=debug";

/// Default filter directives; `RUST_LOG` overrides them.
#[must_use]
pub const fn default_directives(debug: bool) -> &'static str {
    if debug { DEBUG_DIRECTIVES } else { "warn" }
}

/// Builds the filter from `RUST_LOG`, falling back to the defaults.
#[must_use]
pub fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init(debug: bool, format: LogFormat) -> Result<(), BotError> {
    let registry = tracing_subscriber::registry().with(env_filter(debug));
    let result = match format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| BotError::Config(format!("failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(default_directives(false), "warn");
    }

    #[test]
    fn debug_raises_workspace_crates() {
        let directives = default_directives(true);
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("structure_esi=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
