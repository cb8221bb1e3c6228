//! Binary error types.

use thiserror::Error;

/// Errors surfaced by the `structurebot` commands.
#[derive(Debug, Error)]
pub enum BotError {
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Alert model failure.
    #[error(transparent)]
    Core(#[from] structure_core::CoreError),

    /// ESI or Neucore failure.
    #[error(transparent)]
    Esi(#[from] structure_esi::EsiError),

    /// Webhook delivery failure.
    #[error(transparent)]
    Notify(#[from] structure_notify::NotifyError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_error_display_config() {
        let err = BotError::Config("CORPORATION_NAME is required".into());
        assert_eq!(err.to_string(), "configuration error: CORPORATION_NAME is required");
    }

    #[test]
    fn bot_error_is_transparent_for_esi() {
        let err = BotError::from(structure_esi::EsiError::Forbidden {
            path: "/corporations/1/assets/".into(),
        });
        assert_eq!(
            err.to_string(),
            structure_esi::EsiError::Forbidden {
                path: "/corporations/1/assets/".into()
            }
            .to_string()
        );
    }

    #[test]
    fn bot_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = BotError::from(io_err);
        assert!(matches!(err, BotError::Io(_)));
    }
}
