//! Error types for the master-data core
//!
//! One `thiserror` enum covers the whole taxonomy. Display strings are
//! written to be shown to end users as-is; [`ErrorKind`] gives callers the
//! programmatic side of the same information for the response envelope.
//!
//! `AuditWrite` is special: it is always non-fatal and is consumed by the
//! audit outbox, never surfaced to mutation callers. `VersionMismatch` is
//! storage-internal and consumed by the CAS retry loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for master-data operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the master-data core
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing or invalid field value
    #[error("{message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Display-ready message, e.g. "End Number must not be less than Current Number"
        message: String,
    },

    /// No record for this tenant and id
    #[error("{collection} record not found: {id}")]
    NotFound {
        /// Collection searched
        collection: String,
        /// Id that was looked up
        id: String,
    },

    /// Duplicate natural key, or a lost race on a unique insert
    #[error("{0}")]
    Conflict(String),

    /// Privileged-field mutation without authorization
    #[error("not authorized to modify field '{field}'")]
    Permission {
        /// The privileged field that was touched
        field: String,
    },

    /// Counter cannot advance past its end number
    #[error("series '{name}' is exhausted: end number {end_number} reached")]
    SeriesExhausted {
        /// Series natural key
        name: String,
        /// The configured bound
        end_number: i64,
    },

    /// Series is administratively disabled
    #[error("series '{name}' is inactive")]
    SeriesInactive {
        /// Series natural key
        name: String,
    },

    /// Audit trail write failed (always non-fatal, consumed by the outbox)
    #[error("audit write failed: {0}")]
    AuditWrite(String),

    /// CAS conflict (storage-internal, consumed by the retry loop)
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected row version
        expected: u64,
        /// Actual row version found
        actual: u64,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Programmatic classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or invalid field
    Validation,
    /// No record for tenant + id
    NotFound,
    /// Duplicate natural key or lost unique-insert race
    Conflict,
    /// Unauthorized privileged-field mutation
    Permission,
    /// Counter at its end number
    SeriesExhausted,
    /// Series administratively disabled
    SeriesInactive,
    /// Audit trail write failure
    AuditWrite,
    /// CAS conflict
    VersionMismatch,
    /// Serialization failure
    Serialization,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Permission { .. } => ErrorKind::Permission,
            Error::SeriesExhausted { .. } => ErrorKind::SeriesExhausted,
            Error::SeriesInactive { .. } => ErrorKind::SeriesInactive,
            Error::AuditWrite(_) => ErrorKind::AuditWrite,
            Error::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Convenience constructor for validation failures
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for missing records
    pub fn not_found(collection: impl Into<String>, id: impl ToString) -> Self {
        Error::NotFound {
            collection: collection.into(),
            id: id.to_string(),
        }
    }
}
