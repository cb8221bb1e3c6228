//! Error types for the structure-core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while deriving fittings, fuel rates and alerts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced item type is not present in the catalog.
    #[error("unknown item type: {type_id}")]
    UnknownType {
        /// The type id that could not be resolved.
        type_id: i32,
    },

    /// A service module type has no hourly fuel attribute.
    #[error("service module {name} ({type_id}) has no fuel consumption attribute")]
    MissingFuelAttribute {
        /// The module type id.
        type_id: i32,
        /// The module type name.
        name: String,
    },

    /// A fuel bonus table entry is unusable.
    #[error("invalid fuel bonus: {reason}")]
    InvalidFuelBonus {
        /// The reason the entry is invalid.
        reason: String,
    },

    /// A tower fuel table entry is unusable.
    #[error("invalid tower fuel rate: {reason}")]
    InvalidTowerFuel {
        /// The reason the entry is invalid.
        reason: String,
    },

    /// A structure record failed validation.
    #[error("invalid structure: {reason}")]
    InvalidStructure {
        /// The reason the structure is invalid.
        reason: String,
    },

    /// Reading a data file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
