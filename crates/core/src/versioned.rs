//! Versioned row wrapper
//!
//! Every read from the store returns the value together with its row
//! version; every conditional write names the version it read. The version
//! is what makes the numbering engine's read-modify-write loop safe: a
//! concurrent writer bumps it, the conditional write fails, and the caller
//! retries against fresh state.

use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored value with its row version
///
/// Versions start at 1 on insert and increment by 1 on every successful
/// write. The timestamp records when this version was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// The stored value
    pub value: Value,
    /// Row version (monotonically increasing, starts at 1)
    pub version: u64,
    /// When this version was written
    pub timestamp: DateTime<Utc>,
}

impl VersionedValue {
    /// Wrap a value at a given version, stamped now
    pub fn new(value: Value, version: u64) -> Self {
        Self {
            value,
            version,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_value_wraps() {
        let vv = VersionedValue::new(Value::Int(5), 1);
        assert_eq!(vv.value, Value::Int(5));
        assert_eq!(vv.version, 1);
    }

    #[test]
    fn test_versioned_value_roundtrip() {
        let vv = VersionedValue::new(Value::String("row".into()), 3);
        let json = serde_json::to_string(&vv).unwrap();
        let restored: VersionedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(vv, restored);
    }
}
