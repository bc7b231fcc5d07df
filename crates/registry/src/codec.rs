//! Row payload codec
//!
//! Records and audit entries are persisted as JSON strings inside
//! `Value::String` rows. Keeping the payload human-readable makes store
//! dumps debuggable and keeps the storage layer ignorant of domain shapes.

use masterdata_core::error::{Error, Result};
use masterdata_core::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize a domain struct into a storable row payload
pub(crate) fn to_stored_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_string(v)
        .map(Value::String)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Deserialize a row payload back into a domain struct
pub(crate) fn from_stored_value<T: DeserializeOwned>(v: &Value) -> Result<T> {
    match v {
        Value::String(s) => {
            serde_json::from_str(s).map_err(|e| Error::Serialization(e.to_string()))
        }
        other => Err(Error::Serialization(format!(
            "expected string row payload, got {}",
            other.type_name()
        ))),
    }
}
