//! Error taxonomy for catalog construction and lookup.
//!
//! Only [`CatalogError::SchemaViolation`] is fatal to an aggregation run.
//! Source and record errors are recovered where they occur and surface as
//! warnings; [`CatalogError::NotFound`] is an ordinary lookup outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A source or remote signal could not be reached.
    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// A raw record did not match the expected shape.
    #[error("malformed record '{record}': {reason}")]
    MalformedRecord { record: String, reason: String },

    #[error("server not found: {0}")]
    NotFound(String),

    /// The assembled catalog breaks its structural invariants.
    #[error("catalog schema violation: {0}")]
    SchemaViolation(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CatalogError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(record: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            record: record.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error must abort the run instead of degrading it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SchemaViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
