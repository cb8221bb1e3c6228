//! Error types for the structure-esi crate.

use thiserror::Error;

/// Errors that can occur while talking to ESI or Neucore.
#[derive(Debug, Error)]
pub enum EsiError {
    /// Client configuration is unusable.
    #[error("invalid ESI configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The API refused access to the resource.
    #[error("access denied: {path}")]
    Forbidden {
        /// The ESI path requested.
        path: String,
    },

    /// The resource does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The ESI path requested.
        path: String,
    },

    /// Any other non-success status.
    #[error("{path} returned status {status}: {body}")]
    Status {
        /// The ESI path requested.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A name did not resolve to an id.
    #[error("no {category} named {name}")]
    NameNotFound {
        /// The name looked up.
        name: String,
        /// The expected category, e.g. `corporations`.
        category: String,
    },

    /// Data from the API could not be turned into the domain model.
    #[error("domain error: {0}")]
    Core(#[from] structure_core::CoreError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl EsiError {
    /// True for errors worth retrying: transport failures and server errors.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for EsiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for ESI operations.
pub type Result<T> = std::result::Result<T, EsiError>;
