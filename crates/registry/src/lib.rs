//! Master-data components: registry, audit log, numbering engine
//!
//! Three facades over the tenant-sharded store:
//!
//! - [`Registry`]: generic CRUD for one module, schema-validated, with
//!   case-insensitive natural-key uniqueness and audit emission
//! - [`AuditLog`] + [`AuditOutbox`]: append-only field-level trail with a
//!   best-effort, observable write path
//! - [`SeriesEngine`]: bounded, resettable, atomically-incrementing
//!   document numbering

mod codec;

pub mod audit_log;
pub mod outbox;
pub mod registry;
pub mod schema;
pub mod series;

pub use audit_log::{AuditLog, AuditQuery};
pub use outbox::{AuditOutbox, DEFAULT_MAX_PENDING};
pub use registry::{ActorContext, ListFilter, ListOutcome, Registry};
pub use schema::{display_name, FieldKind, FieldSpec, RecordSchema};
pub use series::{
    format_code, pad, reset_due, IssuedNumber, ResetFrequency, Series, SeriesDraft, SeriesEngine,
    SeriesPatch, SeriesStatus, SERIES_COLLECTION,
};
