use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RankwiseError;

// --- Change log ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    ContentRefresh,
    FaqUpdate,
    SchemaUpdate,
    MetaDescription,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentRefresh => write!(f, "content_refresh"),
            Self::FaqUpdate => write!(f, "faq_update"),
            Self::SchemaUpdate => write!(f, "schema_update"),
            Self::MetaDescription => write!(f, "meta_description"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A reviewer's decision on a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn resulting_status(self) -> ChangeStatus {
        match self {
            Self::Approve => ChangeStatus::Approved,
            Self::Reject => ChangeStatus::Rejected,
        }
    }
}

/// A proposed remediation awaiting human review.
///
/// Payload values are already string-serialized so the record stays flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub page_id: String,
    pub change_type: ChangeType,
    pub payload: BTreeMap<String, String>,
    #[serde(default)]
    pub status: ChangeStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ChangeLogEntry {
    pub fn new(
        page_id: impl Into<String>,
        change_type: ChangeType,
        payload: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id: page_id.into(),
            change_type,
            payload,
            status: ChangeStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            notes: None,
        }
    }

    /// Apply a review decision. Only pending entries transition; anything
    /// else is a conflict and the entry is left untouched.
    pub fn apply_review(
        &mut self,
        action: ReviewAction,
        actor: &str,
        notes: Option<String>,
    ) -> Result<(), RankwiseError> {
        if self.status != ChangeStatus::Pending {
            return Err(RankwiseError::Conflict {
                id: self.id,
                status: self.status,
            });
        }

        self.status = action.resulting_status();
        self.processed_at = Some(Utc::now());
        self.processed_by = Some(actor.to_string());
        self.notes = notes;
        Ok(())
    }
}

// --- Audit issues ---

/// A diagnosed problem on a page. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub id: Uuid,
    pub page_id: String,
    pub summary: String,
    pub recommended_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditIssue {
    pub fn new(
        page_id: impl Into<String>,
        summary: impl Into<String>,
        recommended_actions: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id: page_id.into(),
            summary: summary.into(),
            recommended_actions,
            created_at: Utc::now(),
        }
    }
}

// --- Retrieval documents ---

/// A piece of content to index, with free-form metadata (source, page_id, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DocumentPayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ChangeLogEntry {
        let payload = BTreeMap::from([("faqs".to_string(), "[]".to_string())]);
        ChangeLogEntry::new("pricing", ChangeType::FaqUpdate, payload)
    }

    #[test]
    fn new_entries_are_pending() {
        let e = entry();
        assert_eq!(e.status, ChangeStatus::Pending);
        assert!(e.processed_at.is_none());
    }

    #[test]
    fn approve_stamps_reviewer() {
        let mut e = entry();
        e.apply_review(ReviewAction::Approve, "dana", Some("looks good".into()))
            .unwrap();
        assert_eq!(e.status, ChangeStatus::Approved);
        assert_eq!(e.processed_by.as_deref(), Some("dana"));
        assert_eq!(e.notes.as_deref(), Some("looks good"));
        assert!(e.processed_at.is_some());
    }

    #[test]
    fn second_review_is_conflict_and_leaves_entry_unchanged() {
        let mut e = entry();
        e.apply_review(ReviewAction::Reject, "dana", None).unwrap();
        let before = e.clone();

        let err = e
            .apply_review(ReviewAction::Approve, "sam", Some("override".into()))
            .unwrap_err();

        assert!(matches!(
            err,
            RankwiseError::Conflict { status: ChangeStatus::Rejected, .. }
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn change_type_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeType::ContentRefresh).unwrap();
        assert_eq!(json, "\"content_refresh\"");
        assert_eq!(ChangeType::MetaDescription.to_string(), "meta_description");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let e = entry();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["change_type"], "faq_update");
        let back: ChangeLogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn document_metadata_builder() {
        let doc = DocumentPayload::new("Sample page text")
            .with_metadata("source", "site")
            .with_metadata("page_id", "home");
        assert_eq!(doc.metadata["source"], "site");
        assert_eq!(doc.metadata.len(), 2);
    }
}
