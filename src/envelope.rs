//! Response envelope for the presentation layer
//!
//! Mutations and queries cross into the (excluded) UI layer as a
//! `{ success, data?, error? }` shape: `error` is the display-ready string,
//! `kind` the programmatic taxonomy for handlers that branch on it.

use masterdata_core::{Error, ErrorKind, Result};
use serde::Serialize;

/// Wire-shaped result of a core operation
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Display-ready message on failure
    pub error: Option<String>,
    /// Programmatic classification on failure
    pub kind: Option<ErrorKind>,
}

impl<T> Envelope<T> {
    /// Successful envelope
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    /// Failed envelope
    pub fn err(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::err(&e),
        }
    }
}
