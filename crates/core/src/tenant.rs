//! Tenant scoping type
//!
//! Every master record and every audit entry belongs to exactly one
//! `(company, location)` pair. The pair is the unit of isolation: keys are
//! grouped by tenant, storage shards are allocated per tenant, and no lock
//! or invariant ever spans two tenants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant scope: a company/location pair
///
/// Callers resolve the pair (session, request header, wherever it lives in
/// the transport layer) and pass it explicitly on every call. The core never
/// reads ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantKey {
    /// Company identifier (top-level isolation)
    pub company_id: String,
    /// Location identifier within the company
    pub location_id: String,
}

impl TenantKey {
    /// Create a new tenant key
    pub fn new(company_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            location_id: location_id.into(),
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.company_id, self.location_id)
    }
}

// Ord implementation for BTreeMap key ordering
// Orders by: company_id → location_id
impl Ord for TenantKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.company_id
            .cmp(&other.company_id)
            .then(self.location_id.cmp(&other.location_id))
    }
}

impl PartialOrd for TenantKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
