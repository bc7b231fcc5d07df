//! Generic master-data registry
//!
//! One `Registry` instance serves one module (chemicals, departments,
//! series, ...). It is a stateless facade over the store: no caches, no
//! notion of a "currently selected" record — every operation takes the
//! tenant and the actor explicitly.
//!
//! ## Uniqueness
//!
//! The natural key is unique case-insensitively within a tenant. The claim
//! is an atomic insert of a lowercased index row, so two concurrent creates
//! with the same name race down to one winner and one `Conflict` — never
//! two records.
//!
//! ## Audit emission
//!
//! Every mutation hands one entry to the outbox after its own write has
//! succeeded. Audit failure never fails the mutation.

use crate::codec::{from_stored_value, to_stored_value};
use crate::outbox::AuditOutbox;
use crate::schema::RecordSchema;
use chrono::Utc;
use masterdata_core::audit::{AuditAction, AuditEntry, EntityRef, FieldDiff, DELETION_SENTINEL};
use masterdata_core::error::{Error, Result};
use masterdata_core::key::Key;
use masterdata_core::record::{MasterRecord, RecordId};
use masterdata_core::tenant::TenantKey;
use masterdata_core::traits::RecordStore;
use masterdata_core::value::Value;
use masterdata_storage::{with_cas_retry, RetryConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caller-supplied authorization context
///
/// Authorization decisions are made outside the core; this carries their
/// result. A privileged field may be written by an elevated actor, or by
/// the actor that created the record.
#[derive(Debug, Clone)]
pub struct ActorContext {
    /// Stable actor identifier, recorded on rows and audit entries
    pub actor_id: String,
    /// Whether the caller holds the elevated role
    pub elevated: bool,
}

impl ActorContext {
    /// A regular actor
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            elevated: false,
        }
    }

    /// An elevated actor
    pub fn elevated(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            elevated: true,
        }
    }
}

/// Optional list filter
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Case-insensitive substring match on the natural key
    pub name_contains: Option<String>,
}

/// Result of a list call
///
/// `dropped` counts rows that were skipped defensively (undecodable
/// payload, blank natural key, foreign tenant stamped on the row) so the
/// caller can surface a data-quality warning instead of silently showing a
/// short list.
#[derive(Debug, Clone)]
pub struct ListOutcome {
    /// Valid records, sorted by natural key ascending, case-insensitive
    pub records: Vec<MasterRecord>,
    /// How many rows were dropped
    pub dropped: usize,
}

/// Tenant-scoped CRUD store for one master-data module
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn RecordStore>,
    outbox: Arc<AuditOutbox>,
    schema: RecordSchema,
    retry: RetryConfig,
}

impl Registry {
    /// Create a registry for a module
    pub fn new(store: Arc<dyn RecordStore>, outbox: Arc<AuditOutbox>, schema: RecordSchema) -> Self {
        Self {
            store,
            outbox,
            schema,
            retry: RetryConfig::default(),
        }
    }

    /// The module schema
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn record_key(&self, tenant: &TenantKey, id: &RecordId) -> Key {
        Key::new_record(tenant.clone(), &self.schema.collection, id)
    }

    fn name_index_key(&self, tenant: &TenantKey, folded_name: &str) -> Key {
        Key::new_name_index(tenant.clone(), &self.schema.collection, folded_name)
    }

    fn load(&self, tenant: &TenantKey, id: &RecordId) -> Result<(MasterRecord, u64)> {
        let row = self
            .store
            .get(&self.record_key(tenant, id))
            .ok_or_else(|| Error::not_found(self.schema.collection.as_str(), id))?;
        let record: MasterRecord = from_stored_value(&row.value)?;
        Ok((record, row.version))
    }

    // ========== Create ==========

    /// Create a record
    ///
    /// Validates the payload against the schema, claims the natural-key
    /// index row atomically, persists, and emits one CREATE entry whose
    /// diffs cover the whole record with `Null` old values.
    pub fn create(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        natural_key: &str,
        attributes: BTreeMap<String, Value>,
    ) -> Result<MasterRecord> {
        if natural_key.trim().is_empty() {
            return Err(Error::validation("name", "Name is required"));
        }
        self.schema.validate_full(&attributes)?;

        let record = MasterRecord::new(tenant.clone(), natural_key, attributes, actor.actor_id.as_str());
        let payload = to_stored_value(&record)?;

        let index_key = self.name_index_key(tenant, &record.natural_key_folded());
        self.store
            .insert_new(index_key.clone(), Value::String(record.id.to_string()))
            .map_err(|_| {
                Error::Conflict(format!(
                    "{} '{}' already exists",
                    self.schema.collection, record.natural_key
                ))
            })?;

        if let Err(e) = self
            .store
            .insert_new(self.record_key(tenant, &record.id), payload)
        {
            // Roll the claim back so the name is not orphaned
            self.store.remove(&index_key);
            return Err(e);
        }

        let mut diffs = vec![FieldDiff::new(
            "name",
            Value::Null,
            Value::String(record.natural_key.clone()),
        )];
        for (field, value) in &record.attributes {
            diffs.push(FieldDiff::new(field.clone(), Value::Null, value.clone()));
        }
        self.outbox.record(AuditEntry::new(
            tenant.clone(),
            actor.actor_id.as_str(),
            AuditAction::Create,
            EntityRef::new(self.schema.collection.as_str(), record.id),
            record.natural_key.as_str(),
            diffs,
        ));
        tracing::debug!(
            collection = %self.schema.collection,
            id = %record.id,
            "record created"
        );
        Ok(record)
    }

    // ========== Update ==========

    /// Update a record with a field patch
    ///
    /// The natural key and engine-managed fields are silently stripped from
    /// the patch — the persisted values are always the pre-existing ones.
    /// The UPDATE entry carries only the fields that actually changed; a
    /// patch that changes nothing writes nothing and emits nothing.
    pub fn update(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        patch: BTreeMap<String, Value>,
    ) -> Result<MasterRecord> {
        self.update_with(tenant, actor, id, patch, &|_| Ok(()))
    }

    /// Update with an additional cross-field check
    ///
    /// `check` runs against the merged record inside the retry loop, before
    /// the conditional write, so invariants that span fields (the series
    /// bound, for one) hold atomically.
    pub fn update_with(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        patch: BTreeMap<String, Value>,
        check: &dyn Fn(&MasterRecord) -> Result<()>,
    ) -> Result<MasterRecord> {
        with_cas_retry(&self.retry, || {
            self.try_update(tenant, actor, id, &patch, check)
        })
    }

    fn try_update(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        patch: &BTreeMap<String, Value>,
        check: &dyn Fn(&MasterRecord) -> Result<()>,
    ) -> Result<MasterRecord> {
        let (record, version) = self.load(tenant, &id)?;

        // Immutable and engine-managed fields never reach the merge
        let mut effective: BTreeMap<String, Value> = BTreeMap::new();
        for (field, value) in patch {
            if field == "name" || field == "natural_key" {
                continue;
            }
            if let Some(spec) = self.schema.field(field) {
                if spec.engine_managed {
                    continue;
                }
            }
            effective.insert(field.clone(), value.clone());
        }
        self.schema.validate_patch(&effective)?;

        for (field, value) in &effective {
            let privileged = self
                .schema
                .field(field)
                .map(|spec| spec.privileged)
                .unwrap_or(false);
            let changes = record.attributes.get(field) != Some(value);
            if privileged && changes && !actor.elevated && record.created_by != actor.actor_id {
                return Err(Error::Permission {
                    field: field.clone(),
                });
            }
        }

        let mut updated = record.clone();
        let mut diffs = Vec::new();
        for (field, new_value) in effective {
            let old_value = updated
                .attributes
                .get(&field)
                .cloned()
                .unwrap_or(Value::Null);
            if old_value != new_value {
                diffs.push(FieldDiff::new(field.clone(), old_value, new_value.clone()));
                updated.attributes.insert(field, new_value);
            }
        }
        if diffs.is_empty() {
            return Ok(record);
        }

        self.schema.validate_full(&updated.attributes)?;
        check(&updated)?;
        updated.updated_at = Utc::now();

        self.store.compare_and_swap(
            self.record_key(tenant, &id),
            version,
            to_stored_value(&updated)?,
        )?;

        self.outbox.record(AuditEntry::new(
            tenant.clone(),
            actor.actor_id.as_str(),
            AuditAction::Update,
            EntityRef::new(self.schema.collection.as_str(), id),
            updated.natural_key.as_str(),
            diffs,
        ));
        tracing::debug!(
            collection = %self.schema.collection,
            id = %id,
            "record updated"
        );
        Ok(updated)
    }

    // ========== Delete ==========

    /// Hard-delete a record
    ///
    /// The DELETE entry captures the full prior record with the deletion
    /// sentinel as every new value. History is not touched.
    pub fn delete(&self, tenant: &TenantKey, actor: &ActorContext, id: RecordId) -> Result<()> {
        let (record, _) = self.load(tenant, &id)?;

        self.store.remove(&self.record_key(tenant, &id));
        self.store
            .remove(&self.name_index_key(tenant, &record.natural_key_folded()));

        let sentinel = Value::String(DELETION_SENTINEL.to_string());
        let mut diffs = vec![FieldDiff::new(
            "name",
            Value::String(record.natural_key.clone()),
            sentinel.clone(),
        )];
        for (field, value) in &record.attributes {
            diffs.push(FieldDiff::new(field.clone(), value.clone(), sentinel.clone()));
        }
        self.outbox.record(AuditEntry::new(
            tenant.clone(),
            actor.actor_id.as_str(),
            AuditAction::Delete,
            EntityRef::new(self.schema.collection.as_str(), id),
            record.natural_key.as_str(),
            diffs,
        ));
        tracing::debug!(
            collection = %self.schema.collection,
            id = %id,
            "record deleted"
        );
        Ok(())
    }

    // ========== Read ==========

    /// Fetch a record by id
    ///
    /// Emits a READ entry when the module's schema asks for it.
    pub fn get(&self, tenant: &TenantKey, actor: &ActorContext, id: RecordId) -> Result<MasterRecord> {
        let (record, _) = self.load(tenant, &id)?;
        if self.schema.audit_reads {
            self.outbox.record(AuditEntry::new(
                tenant.clone(),
                actor.actor_id.as_str(),
                AuditAction::Read,
                EntityRef::new(self.schema.collection.as_str(), id),
                record.natural_key.as_str(),
                vec![],
            ));
        }
        Ok(record)
    }

    /// List records in this tenant
    ///
    /// Malformed rows are dropped and counted, never thrown: a single bad
    /// row must not take the whole screen down.
    pub fn list(&self, tenant: &TenantKey, filter: Option<&ListFilter>) -> Result<ListOutcome> {
        let prefix = Key::record_prefix(tenant.clone(), &self.schema.collection);
        let rows = self.store.scan_prefix(&prefix);

        let mut records = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;
        for (key, row) in rows {
            let record: MasterRecord = match from_stored_value(&row.value) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, key = ?key, "dropping undecodable record row");
                    dropped += 1;
                    continue;
                }
            };
            if record.natural_key.trim().is_empty() {
                tracing::warn!(id = %record.id, "dropping record with blank natural key");
                dropped += 1;
                continue;
            }
            if record.tenant != *tenant {
                tracing::warn!(
                    id = %record.id,
                    stamped = %record.tenant,
                    "dropping record stamped with a foreign tenant"
                );
                dropped += 1;
                continue;
            }
            if let Some(filter) = filter {
                if let Some(needle) = &filter.name_contains {
                    if !record
                        .natural_key
                        .to_lowercase()
                        .contains(&needle.to_lowercase())
                    {
                        continue;
                    }
                }
            }
            records.push(record);
        }
        records.sort_by_key(|r| r.natural_key_folded());
        Ok(ListOutcome { records, dropped })
    }
}
