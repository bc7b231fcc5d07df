//! In-memory tenant-sharded store
//!
//! # Design
//!
//! - DashMap keyed by TenantKey: each tenant gets its own shard, so
//!   different tenants never contend on a lock — the tenant is the
//!   concurrency domain.
//! - Inside a shard, an ordered BTreeMap under a parking_lot RwLock: ordered
//!   keys make every prefix scan (records of one collection, audit entries
//!   in sequence order) a contiguous range.
//! - Per-row versions: insert starts at 1, every write increments. The
//!   conditional write (`compare_and_swap`) is the only mutual-exclusion
//!   primitive the components need.

use dashmap::DashMap;
use masterdata_core::error::{Error, Result};
use masterdata_core::key::Key;
use masterdata_core::tenant::TenantKey;
use masterdata_core::traits::RecordStore;
use masterdata_core::value::Value;
use masterdata_core::versioned::VersionedValue;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type Shard = Arc<RwLock<BTreeMap<Key, VersionedValue>>>;

/// In-memory implementation of [`RecordStore`]
///
/// Cheap to clone (`Arc` inside); safe to share across threads.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shards: Arc<DashMap<TenantKey, Shard>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, tenant: &TenantKey) -> Shard {
        self.shards
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())))
            .clone()
    }

    /// Number of rows stored for a tenant (all kinds)
    pub fn tenant_row_count(&self, tenant: &TenantKey) -> usize {
        self.shard(tenant).read().len()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &Key) -> Option<VersionedValue> {
        self.shard(&key.tenant).read().get(key).cloned()
    }

    fn insert_new(&self, key: Key, value: Value) -> Result<u64> {
        let shard = self.shard(&key.tenant);
        let mut rows = shard.write();
        if rows.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "row already exists: {}",
                key.user_key_string().unwrap_or_default()
            )));
        }
        rows.insert(key, VersionedValue::new(value, 1));
        Ok(1)
    }

    fn compare_and_swap(&self, key: Key, expected_version: u64, value: Value) -> Result<u64> {
        let shard = self.shard(&key.tenant);
        let mut rows = shard.write();
        let current = rows.get(&key).ok_or_else(|| {
            Error::Conflict(format!(
                "row vanished during conditional write: {}",
                key.user_key_string().unwrap_or_default()
            ))
        })?;
        if current.version != expected_version {
            return Err(Error::VersionMismatch {
                expected: expected_version,
                actual: current.version,
            });
        }
        let new_version = expected_version + 1;
        rows.insert(key, VersionedValue::new(value, new_version));
        Ok(new_version)
    }

    fn put(&self, key: Key, value: Value) -> u64 {
        let shard = self.shard(&key.tenant);
        let mut rows = shard.write();
        let new_version = rows.get(&key).map(|vv| vv.version + 1).unwrap_or(1);
        rows.insert(key, VersionedValue::new(value, new_version));
        new_version
    }

    fn remove(&self, key: &Key) -> Option<VersionedValue> {
        self.shard(&key.tenant).write().remove(key)
    }

    fn scan_prefix(&self, prefix: &Key) -> Vec<(Key, VersionedValue)> {
        let shard = self.shard(&prefix.tenant);
        let rows = shard.read();
        rows.range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
