//! Series numbering engine
//!
//! ## Design Principles
//!
//! 1. **Counter Through One Door**: `current_number` only moves through
//!    [`SeriesEngine::increment`] and [`SeriesEngine::reset_counter`]. The
//!    generic update path strips the field (it is engine-managed in the
//!    schema), so the uniqueness invariant is structural, not conventional.
//! 2. **CAS Issuance**: an increment is read-compute-conditional-write,
//!    retried on version conflict. Two simultaneous callers can never be
//!    handed the same number.
//! 3. **Reset Before Bound Check**: when a daily/monthly/yearly series has
//!    crossed into a new period, the counter rebases so the call in flight
//!    issues 1, then the bound is checked.
//!
//! The formatted code `prefix + zero-padded number + suffix` is the one
//! externally contractual string in the system.

use crate::codec::{from_stored_value, to_stored_value};
use crate::outbox::AuditOutbox;
use crate::registry::{ActorContext, ListFilter, Registry};
use crate::schema::{FieldSpec, RecordSchema};
use chrono::{DateTime, Datelike, Utc};
use masterdata_core::audit::{AuditAction, AuditEntry, EntityRef, FieldDiff};
use masterdata_core::error::{Error, Result};
use masterdata_core::key::Key;
use masterdata_core::record::{MasterRecord, RecordId};
use masterdata_core::tenant::TenantKey;
use masterdata_core::traits::RecordStore;
use masterdata_core::value::Value;
use masterdata_storage::{with_cas_retry, RetryConfig};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collection name of the series module
pub const SERIES_COLLECTION: &str = "series";

/// How often a series rolls back to its start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetFrequency {
    /// Never resets
    None,
    /// Resets on the first issue of a new calendar day
    Daily,
    /// Resets on the first issue of a new calendar month
    Monthly,
    /// Resets on the first issue of a new calendar year
    Yearly,
}

impl ResetFrequency {
    /// Stable lowercase name, as stored in attributes
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetFrequency::None => "none",
            ResetFrequency::Daily => "daily",
            ResetFrequency::Monthly => "monthly",
            ResetFrequency::Yearly => "yearly",
        }
    }

    /// Parse from the stored attribute string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ResetFrequency::None),
            "daily" => Some(ResetFrequency::Daily),
            "monthly" => Some(ResetFrequency::Monthly),
            "yearly" => Some(ResetFrequency::Yearly),
            _ => None,
        }
    }
}

/// Lifecycle state of a series
///
/// Inactive is an administrative flag and wins over exhaustion for
/// reporting; `increment` checks both independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    /// Numbers available
    Active,
    /// Administratively disabled
    Inactive,
    /// Counter at its end number; recoverable by raising the bound or
    /// resetting the counter
    Exhausted,
}

/// Typed view over a series record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Record id
    pub id: RecordId,
    /// Natural key (immutable)
    pub name: String,
    /// Code prefix, non-empty
    pub prefix: String,
    /// Code suffix, possibly empty
    pub suffix: String,
    /// Last issued number
    pub current_number: i64,
    /// Inclusive upper bound
    pub end_number: i64,
    /// Zero-pad width for the numeric part
    pub padding: i64,
    /// Periodic reset behavior
    pub reset_frequency: ResetFrequency,
    /// Administrative on/off switch
    pub is_active: bool,
    /// When the counter last rebased
    pub last_reset_at: DateTime<Utc>,
}

impl Series {
    /// Project the typed view out of a stored record
    pub fn from_record(record: &MasterRecord) -> Result<Self> {
        let str_field = |name: &str| -> Result<String> {
            record
                .attribute(name)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| malformed(name))
        };
        let int_field = |name: &str| -> Result<i64> {
            record
                .attribute(name)
                .and_then(|v| v.as_int())
                .ok_or_else(|| malformed(name))
        };
        let bool_field = |name: &str| -> Result<bool> {
            record
                .attribute(name)
                .and_then(|v| v.as_bool())
                .ok_or_else(|| malformed(name))
        };

        let reset_frequency = ResetFrequency::parse(&str_field("reset_frequency")?)
            .ok_or_else(|| malformed("reset_frequency"))?;
        let last_reset_at = DateTime::parse_from_rfc3339(&str_field("last_reset_at")?)
            .map_err(|_| malformed("last_reset_at"))?
            .with_timezone(&Utc);

        Ok(Series {
            id: record.id,
            name: record.natural_key.clone(),
            prefix: str_field("prefix")?,
            suffix: str_field("suffix")?,
            current_number: int_field("current_number")?,
            end_number: int_field("end_number")?,
            padding: int_field("padding")?,
            reset_frequency,
            is_active: bool_field("is_active")?,
            last_reset_at,
        })
    }

    /// Current lifecycle state
    pub fn status(&self) -> SeriesStatus {
        if !self.is_active {
            SeriesStatus::Inactive
        } else if self.current_number >= self.end_number {
            SeriesStatus::Exhausted
        } else {
            SeriesStatus::Active
        }
    }
}

fn malformed(field: &str) -> Error {
    Error::Serialization(format!("series row malformed: bad or missing '{field}'"))
}

/// Payload for creating a series
#[derive(Debug, Clone)]
pub struct SeriesDraft {
    /// Natural key
    pub name: String,
    /// Code prefix, non-empty
    pub prefix: String,
    /// Code suffix
    pub suffix: String,
    /// Starting counter value
    pub current_number: i64,
    /// Inclusive upper bound
    pub end_number: i64,
    /// Zero-pad width, at least 1
    pub padding: i64,
    /// Periodic reset behavior
    pub reset_frequency: ResetFrequency,
    /// Start enabled or disabled
    pub is_active: bool,
}

impl SeriesDraft {
    fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::validation("prefix", "Prefix is required"));
        }
        if self.padding < 1 {
            return Err(Error::validation("padding", "Padding must be at least 1"));
        }
        if self.current_number < 0 {
            return Err(Error::validation(
                "current_number",
                "Current Number must not be negative",
            ));
        }
        if self.end_number < self.current_number {
            return Err(Error::validation(
                "end_number",
                "End Number must not be less than Current Number",
            ));
        }
        Ok(())
    }

    fn to_attributes(&self, now: DateTime<Utc>) -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert("prefix".to_string(), Value::String(self.prefix.clone()));
        attrs.insert("suffix".to_string(), Value::String(self.suffix.clone()));
        attrs.insert("current_number".to_string(), Value::Int(self.current_number));
        attrs.insert("end_number".to_string(), Value::Int(self.end_number));
        attrs.insert("padding".to_string(), Value::Int(self.padding));
        attrs.insert(
            "reset_frequency".to_string(),
            Value::String(self.reset_frequency.as_str().to_string()),
        );
        attrs.insert("is_active".to_string(), Value::Bool(self.is_active));
        attrs.insert(
            "last_reset_at".to_string(),
            Value::String(now.to_rfc3339()),
        );
        attrs
    }
}

/// Administrative patch for a series
///
/// The counter itself is deliberately absent; see [`SeriesEngine::reset_counter`].
#[derive(Debug, Clone, Default)]
pub struct SeriesPatch {
    /// New prefix
    pub prefix: Option<String>,
    /// New suffix
    pub suffix: Option<String>,
    /// New upper bound
    pub end_number: Option<i64>,
    /// New pad width
    pub padding: Option<i64>,
    /// New reset behavior
    pub reset_frequency: Option<ResetFrequency>,
    /// Enable/disable
    pub is_active: Option<bool>,
}

impl SeriesPatch {
    fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.prefix {
            if prefix.is_empty() {
                return Err(Error::validation("prefix", "Prefix is required"));
            }
        }
        if let Some(padding) = self.padding {
            if padding < 1 {
                return Err(Error::validation("padding", "Padding must be at least 1"));
            }
        }
        Ok(())
    }

    fn to_patch_map(&self) -> BTreeMap<String, Value> {
        let mut patch = BTreeMap::new();
        if let Some(prefix) = &self.prefix {
            patch.insert("prefix".to_string(), Value::String(prefix.clone()));
        }
        if let Some(suffix) = &self.suffix {
            patch.insert("suffix".to_string(), Value::String(suffix.clone()));
        }
        if let Some(end_number) = self.end_number {
            patch.insert("end_number".to_string(), Value::Int(end_number));
        }
        if let Some(padding) = self.padding {
            patch.insert("padding".to_string(), Value::Int(padding));
        }
        if let Some(freq) = self.reset_frequency {
            patch.insert(
                "reset_frequency".to_string(),
                Value::String(freq.as_str().to_string()),
            );
        }
        if let Some(is_active) = self.is_active {
            patch.insert("is_active".to_string(), Value::Bool(is_active));
        }
        patch
    }
}

/// One issued number with its formatted code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedNumber {
    /// The counter value this call produced
    pub current_number: i64,
    /// `prefix + zero-padded number + suffix`
    pub formatted_code: String,
}

static SERIES_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(SERIES_COLLECTION)
        .with_audit_reads(true)
        .with_field(FieldSpec::string("prefix").required())
        .with_field(FieldSpec::string("suffix").required())
        .with_field(FieldSpec::int("current_number").required().engine_managed())
        .with_field(FieldSpec::int("end_number").required())
        .with_field(FieldSpec::int("padding").required())
        .with_field(
            FieldSpec::enumerated("reset_frequency", &["none", "daily", "monthly", "yearly"])
                .required(),
        )
        .with_field(FieldSpec::boolean("is_active").required())
        .with_field(FieldSpec::timestamp("last_reset_at").required().engine_managed())
});

/// Bounded, resettable, atomically-incrementing numbering engine
pub struct SeriesEngine {
    registry: Registry,
    store: Arc<dyn RecordStore>,
    outbox: Arc<AuditOutbox>,
    retry: RetryConfig,
}

impl SeriesEngine {
    /// Create the engine over a store and outbox
    pub fn new(store: Arc<dyn RecordStore>, outbox: Arc<AuditOutbox>) -> Self {
        let registry = Registry::new(store.clone(), outbox.clone(), SERIES_SCHEMA.clone());
        Self {
            registry,
            store,
            outbox,
            retry: RetryConfig::default(),
        }
    }

    /// The underlying registry (shares this engine's schema)
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========== CRUD ==========

    /// Create a series
    pub fn create(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        draft: &SeriesDraft,
    ) -> Result<Series> {
        draft.validate()?;
        let record =
            self.registry
                .create(tenant, actor, &draft.name, draft.to_attributes(Utc::now()))?;
        Series::from_record(&record)
    }

    /// Fetch a series (emits a READ audit entry; this module audits reads)
    pub fn get(&self, tenant: &TenantKey, actor: &ActorContext, id: RecordId) -> Result<Series> {
        let record = self.registry.get(tenant, actor, id)?;
        Series::from_record(&record)
    }

    /// List series in a tenant
    ///
    /// Rows that fail the typed projection are dropped and counted along
    /// with the registry's own defensive drops.
    pub fn list(
        &self,
        tenant: &TenantKey,
        filter: Option<&ListFilter>,
    ) -> Result<(Vec<Series>, usize)> {
        let outcome = self.registry.list(tenant, filter)?;
        let mut series = Vec::with_capacity(outcome.records.len());
        let mut dropped = outcome.dropped;
        for record in &outcome.records {
            match Series::from_record(record) {
                Ok(s) => series.push(s),
                Err(e) => {
                    tracing::warn!(error = %e, id = %record.id, "dropping malformed series row");
                    dropped += 1;
                }
            }
        }
        Ok((series, dropped))
    }

    /// Update administrative fields
    ///
    /// Validates the bound against the live counter inside the write's
    /// retry loop; raising `end_number` on an exhausted series returns it
    /// to Active.
    pub fn update(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        patch: &SeriesPatch,
    ) -> Result<Series> {
        patch.validate()?;
        let record = self.registry.update_with(
            tenant,
            actor,
            id,
            patch.to_patch_map(),
            &|merged: &MasterRecord| {
                let series = Series::from_record(merged)?;
                if series.end_number < series.current_number {
                    return Err(Error::validation(
                        "end_number",
                        "End Number must not be less than Current Number",
                    ));
                }
                Ok(())
            },
        )?;
        Series::from_record(&record)
    }

    /// Hard-delete a series
    pub fn delete(&self, tenant: &TenantKey, actor: &ActorContext, id: RecordId) -> Result<()> {
        self.registry.delete(tenant, actor, id)
    }

    // ========== Issuance ==========

    /// Issue the next number
    ///
    /// The only legal way to advance a counter. Behaves as if globally
    /// serialized per `(tenant, series)`: the read-compute-write runs under
    /// a conditional write and the whole step retries on conflict.
    pub fn increment(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
    ) -> Result<IssuedNumber> {
        self.increment_at(tenant, actor, id, Utc::now())
    }

    /// Clock-explicit variant of [`Self::increment`]
    ///
    /// `now` decides whether a periodic reset is due. Exists for tests and
    /// backfills; production callers use `increment`.
    pub fn increment_at(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<IssuedNumber> {
        with_cas_retry(&self.retry, || {
            let key = Key::new_record(tenant.clone(), SERIES_COLLECTION, &id);
            let row = self
                .store
                .get(&key)
                .ok_or_else(|| Error::not_found(SERIES_COLLECTION, id))?;
            let record: MasterRecord = from_stored_value(&row.value)?;
            let series = Series::from_record(&record)?;

            if !series.is_active {
                return Err(Error::SeriesInactive {
                    name: series.name.clone(),
                });
            }

            // A due reset rebases the counter so this call issues 1
            let reset_due = reset_due(series.reset_frequency, series.last_reset_at, now);
            let base = if reset_due { 0 } else { series.current_number };
            let next = base + 1;
            if next > series.end_number {
                return Err(Error::SeriesExhausted {
                    name: series.name.clone(),
                    end_number: series.end_number,
                });
            }

            let mut updated = record.clone();
            updated
                .attributes
                .insert("current_number".to_string(), Value::Int(next));
            if reset_due {
                updated.attributes.insert(
                    "last_reset_at".to_string(),
                    Value::String(now.to_rfc3339()),
                );
            }
            updated.updated_at = now;
            self.store
                .compare_and_swap(key, row.version, to_stored_value(&updated)?)?;

            self.outbox.record(AuditEntry::new(
                tenant.clone(),
                actor.actor_id.as_str(),
                AuditAction::Update,
                EntityRef::new(SERIES_COLLECTION, id),
                series.name.as_str(),
                vec![FieldDiff::new(
                    "current_number",
                    Value::Int(series.current_number),
                    Value::Int(next),
                )],
            ));
            tracing::debug!(series = %series.name, number = next, "number issued");

            Ok(IssuedNumber {
                current_number: next,
                formatted_code: format_code(
                    &series.prefix,
                    next,
                    series.padding.max(1) as usize,
                    &series.suffix,
                ),
            })
        })
    }

    /// Rebase the counter to an explicit value
    ///
    /// The authorized escape hatch for exhausted series. Never available
    /// through the generic update path.
    pub fn reset_counter(
        &self,
        tenant: &TenantKey,
        actor: &ActorContext,
        id: RecordId,
        new_current: i64,
    ) -> Result<Series> {
        with_cas_retry(&self.retry, || {
            let key = Key::new_record(tenant.clone(), SERIES_COLLECTION, &id);
            let row = self
                .store
                .get(&key)
                .ok_or_else(|| Error::not_found(SERIES_COLLECTION, id))?;
            let record: MasterRecord = from_stored_value(&row.value)?;
            let series = Series::from_record(&record)?;

            if new_current < 0 {
                return Err(Error::validation(
                    "current_number",
                    "Current Number must not be negative",
                ));
            }
            if new_current > series.end_number {
                return Err(Error::validation(
                    "current_number",
                    "Current Number must not exceed End Number",
                ));
            }
            if new_current == series.current_number {
                return Ok(series);
            }

            let mut updated = record.clone();
            updated
                .attributes
                .insert("current_number".to_string(), Value::Int(new_current));
            updated.updated_at = Utc::now();
            self.store
                .compare_and_swap(key, row.version, to_stored_value(&updated)?)?;

            self.outbox.record(AuditEntry::new(
                tenant.clone(),
                actor.actor_id.as_str(),
                AuditAction::Update,
                EntityRef::new(SERIES_COLLECTION, id),
                series.name.as_str(),
                vec![FieldDiff::new(
                    "current_number",
                    Value::Int(series.current_number),
                    Value::Int(new_current),
                )],
            ));
            Series::from_record(&updated)
        })
    }
}

// ========== Pure functions ==========

/// Left-pad the decimal rendering of `n` with zeros to `width` characters
///
/// Never truncates: a number wider than `width` renders in full.
pub fn pad(n: i64, width: usize) -> String {
    let digits = n.to_string();
    if digits.len() >= width {
        digits
    } else {
        let mut out = String::with_capacity(width);
        for _ in 0..width - digits.len() {
            out.push('0');
        }
        out.push_str(&digits);
        out
    }
}

/// Assemble a formatted code: `prefix + pad(n, width) + suffix`
pub fn format_code(prefix: &str, n: i64, width: usize, suffix: &str) -> String {
    format!("{}{}{}", prefix, pad(n, width), suffix)
}

/// Whether `now` falls in a later period than `last_reset`
///
/// Calendar semantics: daily compares calendar days, monthly calendar
/// months, yearly calendar years. Time-of-day never matters.
pub fn reset_due(
    frequency: ResetFrequency,
    last_reset: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    match frequency {
        ResetFrequency::None => false,
        ResetFrequency::Daily => now.date_naive() > last_reset.date_naive(),
        ResetFrequency::Monthly => {
            (now.year(), now.month()) > (last_reset.year(), last_reset.month())
        }
        ResetFrequency::Yearly => now.year() > last_reset.year(),
    }
}
