//! Append-only audit log
//!
//! ## Design Principles
//!
//! 1. **Single-Writer-Ordered**: appends serialize through a conditional
//!    write on a per-tenant metadata row that owns the next sequence
//!    number. Concurrent appends retry; sequences are dense and unique.
//! 2. **Append-Only**: no update or delete exists. Entries outlive the
//!    records they describe.
//! 3. **Day-Granularity Date Filter**: the `on_date` predicate compares
//!    calendar dates, ignoring time-of-day. This is the semantics the audit
//!    screens were built on and is preserved exactly — it is not a
//!    half-open time-range query.

use crate::codec::{from_stored_value, to_stored_value};
use chrono::NaiveDate;
use masterdata_core::audit::{AuditAction, AuditEntry, EntityRef};
use masterdata_core::error::{Error, Result};
use masterdata_core::key::Key;
use masterdata_core::tenant::TenantKey;
use masterdata_core::traits::RecordStore;
use masterdata_storage::{with_cas_retry, RetryConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-tenant sequence metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AuditMeta {
    next_sequence: u64,
}

/// Filter for [`AuditLog::query`]; all present predicates are ANDed
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only entries referencing this entity
    pub entity: Option<EntityRef>,
    /// Only entries with this action
    pub action: Option<AuditAction>,
    /// Case-insensitive substring over field names, stringified old/new
    /// values, actor id, and entity name
    pub search_text: Option<String>,
    /// Only entries whose timestamp falls on this calendar date
    pub on_date: Option<NaiveDate>,
}

/// Append-only store of audit entries
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn RecordStore>,
    retry: RetryConfig,
}

impl AuditLog {
    /// Create a log over a store
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
        }
    }

    /// Append an entry, assigning its per-tenant sequence
    ///
    /// Returns the assigned sequence. The sequence claim goes through a
    /// conditional write on the tenant's metadata row, so two concurrent
    /// appends can never share a sequence; the loser retries.
    pub fn append(&self, entry: AuditEntry) -> Result<u64> {
        with_cas_retry(&self.retry, || {
            let meta_key = Key::new_audit_meta(entry.tenant.clone());
            let sequence = match self.store.get(&meta_key) {
                Some(row) => {
                    let meta: AuditMeta = from_stored_value(&row.value)?;
                    let claimed = meta.next_sequence;
                    self.store.compare_and_swap(
                        meta_key,
                        row.version,
                        to_stored_value(&AuditMeta {
                            next_sequence: claimed + 1,
                        })?,
                    )?;
                    claimed
                }
                None => {
                    // First entry for this tenant; losing the init race is
                    // reported as a version mismatch so the retry loop runs.
                    self.store
                        .insert_new(meta_key, to_stored_value(&AuditMeta { next_sequence: 1 })?)
                        .map_err(|_| Error::VersionMismatch {
                            expected: 0,
                            actual: 1,
                        })?;
                    0
                }
            };

            let mut stamped = entry.clone();
            stamped.sequence = sequence;
            self.store.insert_new(
                Key::new_audit(entry.tenant.clone(), sequence),
                to_stored_value(&stamped)?,
            )?;
            tracing::trace!(sequence, action = stamped.action.as_str(), "audit entry appended");
            Ok(sequence)
        })
    }

    /// All entries matching the query, in sequence order
    pub fn query(&self, tenant: &TenantKey, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let rows = self.store.scan_prefix(&Key::audit_prefix(tenant.clone()));
        let mut entries = Vec::with_capacity(rows.len());
        for (key, row) in rows {
            let entry: AuditEntry = match from_stored_value(&row.value) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, key = ?key, "skipping undecodable audit row");
                    continue;
                }
            };
            if matches(&entry, query) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn matches(entry: &AuditEntry, query: &AuditQuery) -> bool {
    if let Some(entity) = &query.entity {
        if entry.entity != *entity {
            return false;
        }
    }
    if let Some(action) = query.action {
        if entry.action != action {
            return false;
        }
    }
    if let Some(on_date) = query.on_date {
        // Calendar-date match: time-of-day is ignored
        if entry.timestamp.date_naive() != on_date {
            return false;
        }
    }
    if let Some(needle) = &query.search_text {
        if !matches_search(entry, needle) {
            return false;
        }
    }
    true
}

fn matches_search(entry: &AuditEntry, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if entry.actor_id.to_lowercase().contains(&needle)
        || entry.entity_name.to_lowercase().contains(&needle)
    {
        return true;
    }
    entry.field_diffs.iter().any(|diff| {
        diff.field.to_lowercase().contains(&needle)
            || diff.old_value.display_string().to_lowercase().contains(&needle)
            || diff.new_value.display_string().to_lowercase().contains(&needle)
    })
}
