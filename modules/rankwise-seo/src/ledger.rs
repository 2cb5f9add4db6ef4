//! Append-only change log and audit-issue ledger, one per pipeline.
//!
//! All access goes through a mutex, so concurrent remediation runs may share
//! a ledger handle. Records are never removed; change entries only move out
//! of `pending` through [`Ledger::review`].

use std::sync::{Mutex, MutexGuard};

use rankwise_common::{AuditIssue, ChangeLogEntry, ChangeStatus, RankwiseError, ReviewAction};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Serializable copy of a ledger's contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub change_log: Vec<ChangeLogEntry>,
    pub audit_issues: Vec<AuditIssue>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    inner: Mutex<LedgerSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerSnapshot> {
        // Appends are single pushes; a poisoned guard still holds consistent data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_issue(&self, issue: AuditIssue) {
        info!(page_id = %issue.page_id, issue_id = %issue.id, "Audit issue recorded");
        self.lock().audit_issues.push(issue);
    }

    pub fn record_change(&self, entry: ChangeLogEntry) -> Uuid {
        let id = entry.id;
        info!(
            page_id = %entry.page_id,
            change_type = %entry.change_type,
            change_id = %id,
            "Change proposed"
        );
        self.lock().change_log.push(entry);
        id
    }

    pub fn change_log(&self) -> Vec<ChangeLogEntry> {
        self.lock().change_log.clone()
    }

    pub fn audit_issues(&self) -> Vec<AuditIssue> {
        self.lock().audit_issues.clone()
    }

    pub fn pending(&self) -> Vec<ChangeLogEntry> {
        self.lock()
            .change_log
            .iter()
            .filter(|e| e.status == ChangeStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: Uuid) -> Option<ChangeLogEntry> {
        self.lock().change_log.iter().find(|e| e.id == id).cloned()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().clone()
    }

    /// Approve or reject a pending change. Returns the updated entry.
    pub fn review(
        &self,
        id: Uuid,
        action: ReviewAction,
        actor: &str,
        notes: Option<String>,
    ) -> Result<ChangeLogEntry, RankwiseError> {
        let mut guard = self.lock();
        let entry = guard
            .change_log
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RankwiseError::NotFound(id))?;

        entry.apply_review(action, actor, notes)?;
        info!(change_id = %id, status = %entry.status, actor, "Change reviewed");
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use rankwise_common::ChangeType;

    use super::*;

    fn change(page: &str) -> ChangeLogEntry {
        ChangeLogEntry::new(page, ChangeType::ContentRefresh, BTreeMap::new())
    }

    #[test]
    fn records_in_append_order() {
        let ledger = Ledger::new();
        ledger.record_change(change("a"));
        ledger.record_change(change("b"));
        ledger.record_issue(AuditIssue::new("a", "Lost backlinks", vec![]));

        let pages: Vec<_> = ledger.change_log().into_iter().map(|e| e.page_id).collect();
        assert_eq!(pages, vec!["a", "b"]);
        assert_eq!(ledger.audit_issues().len(), 1);
    }

    #[test]
    fn review_moves_entry_out_of_pending() {
        let ledger = Ledger::new();
        let id = ledger.record_change(change("a"));
        ledger.record_change(change("b"));

        let updated = ledger
            .review(id, ReviewAction::Approve, "dana", None)
            .unwrap();

        assert_eq!(updated.status, ChangeStatus::Approved);
        assert_eq!(ledger.pending().len(), 1);
        assert_eq!(ledger.get(id).unwrap().status, ChangeStatus::Approved);
    }

    #[test]
    fn reviewing_processed_entry_is_conflict() {
        let ledger = Ledger::new();
        let id = ledger.record_change(change("a"));
        ledger.review(id, ReviewAction::Reject, "dana", Some("off-brand".into())).unwrap();
        let before = ledger.get(id).unwrap();

        let err = ledger
            .review(id, ReviewAction::Approve, "sam", None)
            .unwrap_err();

        assert!(matches!(err, RankwiseError::Conflict { .. }));
        assert_eq!(ledger.get(id).unwrap(), before);
    }

    #[test]
    fn unknown_entry_is_not_found() {
        let ledger = Ledger::new();
        let missing = Uuid::new_v4();
        let err = ledger.review(missing, ReviewAction::Approve, "dana", None).unwrap_err();
        assert!(matches!(err, RankwiseError::NotFound(id) if id == missing));
    }

    #[test]
    fn snapshot_round_trips() {
        let ledger = Ledger::new();
        ledger.record_change(change("a"));
        ledger.record_issue(AuditIssue::new("a", "cause", vec!["Refresh content".into()]));

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = Ledger::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), ledger.snapshot());
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let ledger = Arc::new(Ledger::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        ledger.record_change(change(&format!("page-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.change_log().len(), 200);
    }
}
