use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error carried by store and config failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the slug pipeline.
pub type Result<T> = std::result::Result<T, SlugError>;

/// Fatal conditions raised while resolving a slug.
///
/// Every field-level variant names the record type and field so a failure
/// can be traced back to the declaration that produced it.
#[derive(Debug, Error)]
pub enum SlugError {
    /// `method` names a function that was never registered on the service
    #[error("{record_type}.{field}: slug method `{method}` is not registered")]
    UnknownMethod {
        record_type: String,
        field: String,
        method: String,
    },

    /// `reserved` resolved to something other than a list of strings
    #[error("{record_type}.{field}: reserved words must resolve to a list of strings, got {found}")]
    InvalidReserved {
        record_type: String,
        field: String,
        found: String,
    },

    /// Every suffix up to the scan limit is already taken
    #[error("{record_type}.{field}: no free suffix for `{slug}` up to {limit}")]
    SuffixExhausted {
        record_type: String,
        field: String,
        slug: String,
        limit: u32,
    },

    /// The repository or history collaborator failed
    #[error("{record_type}.{field}: slug lookup failed")]
    Store {
        record_type: String,
        field: String,
        #[source]
        source: BoxError,
    },

    /// Default configuration could not be loaded
    #[error("failed to load slug defaults from {}", path.display())]
    Defaults {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl SlugError {
    /// Record type the failure belongs to, if any.
    pub fn record_type(&self) -> Option<&str> {
        match self {
            SlugError::UnknownMethod { record_type, .. }
            | SlugError::InvalidReserved { record_type, .. }
            | SlugError::SuffixExhausted { record_type, .. }
            | SlugError::Store { record_type, .. } => Some(record_type),
            SlugError::Defaults { .. } => None,
        }
    }

    /// Field the failure belongs to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            SlugError::UnknownMethod { field, .. }
            | SlugError::InvalidReserved { field, .. }
            | SlugError::SuffixExhausted { field, .. }
            | SlugError::Store { field, .. } => Some(field),
            SlugError::Defaults { .. } => None,
        }
    }
}
