//! Audit trail types
//!
//! ## Design Principles
//!
//! 1. **Append-Only**: Entries are immutable once written. No update or
//!    delete operations exist anywhere in the system.
//! 2. **Back-Reference Only**: An entry points at its record through
//!    [`EntityRef`]; it never owns the record. Deleting a record leaves its
//!    history intact.
//! 3. **Field-Level Diffs**: Every mutation records exactly the fields that
//!    changed, as `{field, old, new}` triples.
//!
//! The human-readable name of the referenced entity is snapshotted into
//! `entity_name` at write time, so history stays searchable after the record
//! is gone.

use crate::record::RecordId;
use crate::tenant::TenantKey;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel written as the `new_value` of every field in a DELETE entry
pub const DELETION_SENTINEL: &str = "__deleted__";

/// What a mutation (or audited read) did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// Record created; diffs cover the whole record with Null old values
    Create,
    /// Record read; only emitted by modules that audit reads
    Read,
    /// Record updated; diffs cover only the fields that actually changed
    Update,
    /// Record hard-deleted; diffs capture the full prior record
    Delete,
}

impl AuditAction {
    /// Stable uppercase name, as shown in audit screens
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Read => "READ",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

/// Back-reference from an audit entry to the record it describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Collection (module) the record belongs to
    pub collection: String,
    /// The record id
    pub record_id: RecordId,
}

impl EntityRef {
    /// Create a reference
    pub fn new(collection: impl Into<String>, record_id: RecordId) -> Self {
        Self {
            collection: collection.into(),
            record_id,
        }
    }
}

/// One changed field inside an audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Field name
    pub field: String,
    /// Value before the mutation (Null for CREATE)
    pub old_value: Value,
    /// Value after the mutation (deletion sentinel for DELETE)
    pub new_value: Value,
}

impl FieldDiff {
    /// Create a diff triple
    pub fn new(field: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }
}

/// One immutable audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier
    pub id: RecordId,
    /// Owning tenant (same tenant as the referenced record)
    pub tenant: TenantKey,
    /// Actor that performed the operation
    pub actor_id: String,
    /// What happened
    pub action: AuditAction,
    /// Which record it happened to
    pub entity: EntityRef,
    /// Natural key of the record at write time
    pub entity_name: String,
    /// Changed fields; empty for READ entries
    pub field_diffs: Vec<FieldDiff>,
    /// Per-tenant sequence, assigned by the log on append
    pub sequence: u64,
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry ready for append (sequence is assigned by the log)
    pub fn new(
        tenant: TenantKey,
        actor_id: impl Into<String>,
        action: AuditAction,
        entity: EntityRef,
        entity_name: impl Into<String>,
        field_diffs: Vec<FieldDiff>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            tenant,
            actor_id: actor_id.into(),
            action,
            entity,
            entity_name: entity_name.into(),
            field_diffs,
            sequence: 0,
            timestamp: Utc::now(),
        }
    }
}
