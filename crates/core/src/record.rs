//! Master record types
//!
//! A `MasterRecord` is one row of a master-data module (a chemical, a
//! department, a numbering series, ...): a tenant-stamped, named bag of
//! typed attributes with creation/update metadata. The natural key is the
//! human-meaningful unique name of the record within its tenant and is
//! immutable after creation.

use crate::tenant::TenantKey;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a master record
///
/// Wrapper around a UUID v4. Assigned by the registry at creation and never
/// reused; audit entries reference records by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random RecordId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RecordId from its string representation
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this RecordId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One master-data record
///
/// Attributes are kept in a `BTreeMap` so iteration (and therefore audit
/// diff ordering) is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRecord {
    /// Record identifier, unique across all tenants
    pub id: RecordId,
    /// Owning tenant, stamped on the row itself
    pub tenant: TenantKey,
    /// Human-meaningful unique name, case-insensitively unique per tenant.
    /// Immutable after creation.
    pub natural_key: String,
    /// Module-specific attributes
    pub attributes: BTreeMap<String, Value>,
    /// Actor that created the record
    pub created_by: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl MasterRecord {
    /// Create a fresh record with both timestamps set to now
    pub fn new(
        tenant: TenantKey,
        natural_key: impl Into<String>,
        attributes: BTreeMap<String, Value>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            tenant,
            natural_key: natural_key.into(),
            attributes,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a single attribute
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// The natural key lowercased, as used by the uniqueness index
    pub fn natural_key_folded(&self) -> String {
        self.natural_key.to_lowercase()
    }
}
