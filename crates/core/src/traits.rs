//! Storage trait seam
//!
//! The registry, audit log, and numbering engine are written against
//! [`RecordStore`], not against a concrete store. The in-memory store in
//! `masterdata-storage` is the only implementation shipped here; a
//! persistence engine slots in behind the same seam without touching the
//! components.
//!
//! ## Contract
//!
//! - Reads return the row with its version; writes return the new version.
//! - `insert_new` is atomic insert-if-absent — the primitive uniqueness
//!   claims are built on.
//! - `compare_and_swap` succeeds only when the stored version still matches
//!   what the caller read. This is the single mutual-exclusion discipline in
//!   the system; everything else is plain optimistic validation.

use crate::error::Result;
use crate::key::Key;
use crate::value::Value;
use crate::versioned::VersionedValue;

/// Tenant-scoped versioned row store
pub trait RecordStore: Send + Sync {
    /// Read a row, if present
    fn get(&self, key: &Key) -> Option<VersionedValue>;

    /// Insert a row that must not already exist
    ///
    /// Returns the new version (always 1). Fails with `Conflict` when the
    /// key is already present — including when a concurrent writer won the
    /// race after the caller's earlier read.
    fn insert_new(&self, key: Key, value: Value) -> Result<u64>;

    /// Conditionally replace a row
    ///
    /// Succeeds only if the stored version equals `expected_version`;
    /// returns the new version. Fails with `VersionMismatch` on conflict and
    /// `NotFound`-shaped `Conflict` when the row is gone.
    fn compare_and_swap(&self, key: Key, expected_version: u64, value: Value) -> Result<u64>;

    /// Unconditional write (insert or replace), returns the new version
    fn put(&self, key: Key, value: Value) -> u64;

    /// Remove a row, returning it if it existed
    fn remove(&self, key: &Key) -> Option<VersionedValue>;

    /// All rows whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &Key) -> Vec<(Key, VersionedValue)>;
}
