//! Error types for discovery synthesis

use comarmor_profile::{ProfileError, StructureError};
use thiserror::Error;

/// Discovery errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Malformed snapshot or profile error
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Endpoint whose namespace prefix names no known object kind
    #[error("Unknown namespace prefix '{prefix}' on topic '{topic}'")]
    UnknownPrefix {
        /// Two-character prefix as found
        prefix: String,
        /// Topic name of the record
        topic: String,
    },
}

impl From<StructureError> for DiscoveryError {
    fn from(err: StructureError) -> Self {
        DiscoveryError::Profile(err.into())
    }
}

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
