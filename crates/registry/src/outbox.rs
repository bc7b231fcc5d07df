//! Best-effort audit outbox
//!
//! Mutations record their audit entries through the outbox, never through
//! the log directly. The contract: the triggering mutation has already
//! succeeded, and nothing about the audit write may change that. A failed
//! append is logged and the entry parked in a bounded retry queue — the
//! trail can have gaps under storage failure, which is accepted and
//! documented behavior, but the failures are observable (`pending`) and
//! recoverable (`flush`) instead of vanishing into a log line.

use crate::audit_log::AuditLog;
use masterdata_core::audit::AuditEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default bound on parked entries
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Fire-and-forget front of the audit log
pub struct AuditOutbox {
    log: AuditLog,
    pending: Mutex<VecDeque<AuditEntry>>,
    max_pending: usize,
}

impl AuditOutbox {
    /// Create an outbox with the default queue bound
    pub fn new(log: AuditLog) -> Self {
        Self::with_capacity(log, DEFAULT_MAX_PENDING)
    }

    /// Create an outbox with an explicit queue bound
    pub fn with_capacity(log: AuditLog, max_pending: usize) -> Self {
        Self {
            log,
            pending: Mutex::new(VecDeque::new()),
            max_pending,
        }
    }

    /// Record an entry, never failing the caller
    ///
    /// On append failure the entry is parked; when the queue is full the
    /// oldest parked entry is dropped to make room.
    pub fn record(&self, entry: AuditEntry) {
        match self.log.append(entry.clone()) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    action = entry.action.as_str(),
                    entity = %entry.entity.record_id,
                    "audit write failed; parking entry for retry"
                );
                let mut pending = self.pending.lock();
                if pending.len() >= self.max_pending {
                    pending.pop_front();
                    tracing::warn!("audit outbox full; dropped oldest pending entry");
                }
                pending.push_back(entry);
            }
        }
    }

    /// Number of parked entries awaiting retry
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Re-attempt parked entries, oldest first
    ///
    /// Returns how many were appended. Entries that fail again stay parked
    /// in their original order.
    pub fn flush(&self) -> usize {
        let drained: Vec<AuditEntry> = self.pending.lock().drain(..).collect();
        let mut flushed = 0;
        let mut still_failing = VecDeque::new();
        for entry in drained {
            match self.log.append(entry.clone()) {
                Ok(_) => flushed += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "audit retry failed; entry stays parked");
                    still_failing.push_back(entry);
                }
            }
        }
        if !still_failing.is_empty() {
            let mut pending = self.pending.lock();
            // New entries may have been parked while we flushed; keep the
            // still-failing ones ahead of them to preserve order.
            for entry in still_failing.into_iter().rev() {
                pending.push_front(entry);
            }
        }
        flushed
    }

    /// The underlying log (for queries)
    pub fn log(&self) -> &AuditLog {
        &self.log
    }
}
