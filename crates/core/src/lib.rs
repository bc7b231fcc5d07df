//! Core types for the master-data system
//!
//! This crate defines the foundational types shared by every component:
//!
//! - [`TenantKey`]: the `(company, location)` pair scoping all data
//! - [`Key`] / [`RecordKind`]: composite keys for the unified keyspace
//! - [`Value`]: canonical attribute value model
//! - [`MasterRecord`] / [`RecordId`]: one row of a master-data module
//! - audit types: [`AuditEntry`], [`AuditAction`], [`FieldDiff`], [`EntityRef`]
//! - [`Error`] / [`ErrorKind`]: the error taxonomy, via `thiserror`
//! - [`RecordStore`]: the storage trait seam

pub mod audit;
pub mod error;
pub mod key;
pub mod record;
pub mod tenant;
pub mod traits;
pub mod value;
pub mod versioned;

pub use audit::{AuditAction, AuditEntry, EntityRef, FieldDiff, DELETION_SENTINEL};
pub use error::{Error, ErrorKind, Result};
pub use key::{Key, RecordKind};
pub use record::{MasterRecord, RecordId};
pub use tenant::TenantKey;
pub use traits::RecordStore;
pub use value::Value;
pub use versioned::VersionedValue;
