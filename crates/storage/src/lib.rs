//! In-memory tenant-sharded storage for the master-data core
//!
//! Implements the [`masterdata_core::RecordStore`] seam with a
//! DashMap-of-BTreeMaps: one ordered shard per tenant, per-row versions,
//! and a conditional-write primitive plus the retry policy built on it.

pub mod memory;
pub mod retry;

pub use memory::MemoryStore;
pub use retry::{with_cas_retry, RetryConfig};
