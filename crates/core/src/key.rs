//! Composite storage keys
//!
//! The whole core persists into one ordered keyspace. A `Key` combines the
//! owning tenant, a kind tag, and kind-specific key bytes; ordering is
//! `tenant → kind → user_key` so that every prefix scan a component needs
//! (records of one collection, audit entries in sequence order) is a
//! contiguous range.
//!
//! ## Kind tags
//!
//! - Record = 0x01 — one master record, key `{collection}/{record_id}`
//! - NameIndex = 0x02 — uniqueness index row, key `{collection}\0{folded name}`
//! - Audit = 0x03 — audit entry, key = big-endian sequence bytes
//! - AuditMeta = 0x04 — per-tenant audit sequence metadata, key `__meta__`

use crate::record::RecordId;
use crate::tenant::TenantKey;
use serde::{Deserialize, Serialize};

/// Kind discriminator for the unified keyspace
///
/// Declaration order defines sort order within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum RecordKind {
    /// Master record rows
    Record = 0x01,
    /// Case-insensitive natural-key uniqueness index rows
    NameIndex = 0x02,
    /// Append-only audit entries
    Audit = 0x03,
    /// Audit sequence metadata
    AuditMeta = 0x04,
}

impl RecordKind {
    /// Convert to byte representation
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }
}

/// Unified key for all stored rows
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Owning tenant
    pub tenant: TenantKey,
    /// Kind discriminator
    pub kind: RecordKind,
    /// Kind-specific key bytes
    pub user_key: Vec<u8>,
}

impl Key {
    /// Create a key with explicit parts
    pub fn new(tenant: TenantKey, kind: RecordKind, user_key: Vec<u8>) -> Self {
        Self {
            tenant,
            kind,
            user_key,
        }
    }

    /// Key of one master record: `{collection}/{record_id}`
    pub fn new_record(tenant: TenantKey, collection: &str, id: &RecordId) -> Self {
        let user_key = format!("{}/{}", collection, id);
        Self::new(tenant, RecordKind::Record, user_key.into_bytes())
    }

    /// Prefix matching every record of a collection
    pub fn record_prefix(tenant: TenantKey, collection: &str) -> Self {
        let user_key = format!("{}/", collection);
        Self::new(tenant, RecordKind::Record, user_key.into_bytes())
    }

    /// Uniqueness index row for a natural key
    ///
    /// The name is folded to lowercase by the caller; the null byte keeps
    /// collections from bleeding into each other under prefix scans.
    pub fn new_name_index(tenant: TenantKey, collection: &str, folded_name: &str) -> Self {
        let mut user_key = Vec::with_capacity(collection.len() + 1 + folded_name.len());
        user_key.extend_from_slice(collection.as_bytes());
        user_key.push(0); // null separator
        user_key.extend_from_slice(folded_name.as_bytes());
        Self::new(tenant, RecordKind::NameIndex, user_key)
    }

    /// Audit entry key with big-endian sequence bytes
    ///
    /// Big-endian encoding makes lexicographic order equal sequence order.
    pub fn new_audit(tenant: TenantKey, sequence: u64) -> Self {
        Self::new(tenant, RecordKind::Audit, sequence.to_be_bytes().to_vec())
    }

    /// Prefix matching every audit entry of a tenant
    pub fn audit_prefix(tenant: TenantKey) -> Self {
        Self::new(tenant, RecordKind::Audit, vec![])
    }

    /// Per-tenant audit sequence metadata key
    pub fn new_audit_meta(tenant: TenantKey) -> Self {
        Self::new(tenant, RecordKind::AuditMeta, b"__meta__".to_vec())
    }

    /// Extract user key as string (if valid UTF-8)
    pub fn user_key_string(&self) -> Option<String> {
        String::from_utf8(self.user_key.clone()).ok()
    }

    /// Check if this key starts with the given prefix
    ///
    /// Tenant and kind must be equal; user_key must start with the prefix
    /// bytes. This is what makes range scans collection-safe.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.tenant == prefix.tenant
            && self.kind == prefix.kind
            && self.user_key.starts_with(&prefix.user_key)
    }
}

// Ordering: tenant → kind → user_key, required for contiguous prefix ranges
impl Ord for Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tenant
            .cmp(&other.tenant)
            .then(self.kind.cmp(&other.kind))
            .then(self.user_key.cmp(&other.user_key))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantKey {
        TenantKey::new("acme", "lab-1")
    }

    #[test]
    fn test_kind_byte_values() {
        assert_eq!(RecordKind::Record.as_byte(), 0x01);
        assert_eq!(RecordKind::NameIndex.as_byte(), 0x02);
        assert_eq!(RecordKind::Audit.as_byte(), 0x03);
        assert_eq!(RecordKind::AuditMeta.as_byte(), 0x04);
    }

    #[test]
    fn test_kind_ordering_matches_bytes() {
        assert!(RecordKind::Record < RecordKind::NameIndex);
        assert!(RecordKind::NameIndex < RecordKind::Audit);
        assert!(RecordKind::Audit < RecordKind::AuditMeta);
    }

    #[test]
    fn test_record_key_format() {
        let id = RecordId::new();
        let key = Key::new_record(tenant(), "chemicals", &id);
        assert_eq!(key.kind, RecordKind::Record);
        assert_eq!(key.user_key_string().unwrap(), format!("chemicals/{}", id));
    }

    #[test]
    fn test_record_prefix_matches_own_collection_only() {
        let id = RecordId::new();
        let prefix = Key::record_prefix(tenant(), "chemicals");
        let chem = Key::new_record(tenant(), "chemicals", &id);
        let dept = Key::new_record(tenant(), "departments", &id);

        assert!(chem.starts_with(&prefix));
        assert!(!dept.starts_with(&prefix));
    }

    #[test]
    fn test_name_index_null_separator_prevents_bleed() {
        // "serie" + "sx" must not collide with "series" + "x"
        let a = Key::new_name_index(tenant(), "serie", "sx");
        let b = Key::new_name_index(tenant(), "series", "x");
        assert_ne!(a, b);
    }

    #[test]
    fn test_audit_keys_sort_by_sequence() {
        let k1 = Key::new_audit(tenant(), 1);
        let k10 = Key::new_audit(tenant(), 10);
        let k100 = Key::new_audit(tenant(), 100);
        // Big-endian encoding: lexicographic sort equals numeric sort
        assert!(k1 < k10);
        assert!(k10 < k100);
    }

    #[test]
    fn test_audit_prefix_excludes_meta() {
        let prefix = Key::audit_prefix(tenant());
        let entry = Key::new_audit(tenant(), 7);
        let meta = Key::new_audit_meta(tenant());

        assert!(entry.starts_with(&prefix));
        assert!(!meta.starts_with(&prefix), "meta lives under its own kind");
    }

    #[test]
    fn test_keys_never_match_across_tenants() {
        let other = TenantKey::new("acme", "lab-2");
        let prefix = Key::record_prefix(tenant(), "chemicals");
        let key = Key::new_record(other, "chemicals", &RecordId::new());
        assert!(!key.starts_with(&prefix));
    }

    #[test]
    fn test_key_btree_ordering() {
        use std::collections::BTreeMap;

        let id = RecordId::new();
        let k_record = Key::new_record(tenant(), "chemicals", &id);
        let k_index = Key::new_name_index(tenant(), "chemicals", "acetone");
        let k_audit = Key::new_audit(tenant(), 0);

        let mut map = BTreeMap::new();
        map.insert(k_audit.clone(), 3);
        map.insert(k_index.clone(), 2);
        map.insert(k_record.clone(), 1);

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![k_record, k_index, k_audit]);
    }

    #[test]
    fn test_key_serialization_roundtrip() {
        let key = Key::new_audit(tenant(), 42);
        let json = serde_json::to_string(&key).unwrap();
        let restored: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(key, restored);
    }
}
