//! Masterdata - multi-tenant master-data core
//!
//! The shared backbone of a laboratory administration panel's master-data
//! screens: tenant-scoped registries of named records, an append-only
//! field-level audit trail, and a bounded, resettable, atomically
//! incrementing numbering engine for minting document identifiers.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use masterdata::{
//!     ActorContext, AuditLog, AuditOutbox, MemoryStore, ResetFrequency, SeriesDraft,
//!     SeriesEngine, TenantKey,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let outbox = Arc::new(AuditOutbox::new(AuditLog::new(store.clone())));
//! let engine = SeriesEngine::new(store, outbox);
//!
//! let tenant = TenantKey::new("acme", "lab-1");
//! let actor = ActorContext::new("alice");
//! let series = engine
//!     .create(
//!         &tenant,
//!         &actor,
//!         &SeriesDraft {
//!             name: "Invoice".into(),
//!             prefix: "INV-".into(),
//!             suffix: "".into(),
//!             current_number: 0,
//!             end_number: 9999,
//!             padding: 4,
//!             reset_frequency: ResetFrequency::Yearly,
//!             is_active: true,
//!         },
//!     )
//!     .unwrap();
//!
//! let issued = engine.increment(&tenant, &actor, series.id).unwrap();
//! assert_eq!(issued.formatted_code, "INV-0001");
//! ```
//!
//! # Architecture
//!
//! - `masterdata-core`: tenant keys, records, audit types, errors, the
//!   storage seam
//! - `masterdata-storage`: in-memory tenant-sharded versioned store with
//!   conditional writes
//! - `masterdata-registry`: the registry, audit log + outbox, and series
//!   engine facades
//!
//! Every call takes an explicit [`TenantKey`] and [`ActorContext`]; the
//! core holds no session state and no "current record".

pub mod envelope;

pub use envelope::Envelope;

pub use masterdata_core::{
    AuditAction, AuditEntry, EntityRef, Error, ErrorKind, FieldDiff, Key, MasterRecord, RecordId,
    RecordKind, RecordStore, Result, TenantKey, Value, VersionedValue, DELETION_SENTINEL,
};
pub use masterdata_registry::{
    format_code, pad, reset_due, ActorContext, AuditLog, AuditOutbox, AuditQuery, FieldKind,
    FieldSpec, IssuedNumber, ListFilter, ListOutcome, RecordSchema, Registry, ResetFrequency,
    Series, SeriesDraft, SeriesEngine, SeriesPatch, SeriesStatus, SERIES_COLLECTION,
};
pub use masterdata_storage::{MemoryStore, RetryConfig};
