//! Audit trail for moderation decisions and emergency operations.
//!
//! Bounded in-memory log, newest first. Reasoned moderation changes and
//! every emergency path produce an entry here, distinct from the tracing
//! event stream.

use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Principal;

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Moderator status change with a supplied reason
    ModerationChange,
    /// User-report path forcing content into Flagged
    ContentFlag,
    /// Grant revoked through the burner path
    AccessRevoke,
    /// Admin-forced rejection, bypassing transition rules
    EmergencyTakedown,
    /// Admin-forced burn, bypassing ownership validation
    EmergencyBurn,
    /// Global pause engaged
    Pause,
    /// Global pause lifted
    Resume,
}

/// An entry in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id
    pub entry_id: String,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Principal that performed the action
    pub actor: Principal,
    /// What happened
    pub action: AuditAction,
    /// Affected record, e.g. `content:7` or `token:12`
    pub subject: String,
    /// Free-form detail (reason text, forced status, burned quantity)
    pub detail: Option<serde_json::Value>,
}

/// Bounded audit log, newest entries first.
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    max_entries: usize,
}

impl AuditLog {
    /// Create a log retaining at most `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries,
        }
    }

    /// Record an entry, pruning the oldest past the retention bound.
    pub fn record(
        &self,
        actor: &Principal,
        action: AuditAction,
        subject: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) -> String {
        let entry = AuditEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor: actor.clone(),
            action,
            subject: subject.into(),
            detail,
        };
        let entry_id = entry.entry_id.clone();

        let mut entries = self.entries.write().expect("audit log lock poisoned");
        entries.push_front(entry);
        while entries.len() > self.max_entries {
            entries.pop_back();
        }

        entry_id
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().expect("audit log lock poisoned");
        entries.iter().take(limit).cloned().collect()
    }

    /// Recent entries touching a subject.
    pub fn for_subject(&self, subject: &str, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().expect("audit log lock poisoned");
        entries
            .iter()
            .filter(|e| e.subject == subject)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("audit log lock poisoned").len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let log = AuditLog::new(100);
        let actor = "moderator-1".to_string();

        log.record(
            &actor,
            AuditAction::ModerationChange,
            "content:1",
            Some(serde_json::json!({ "reason": "policy violation" })),
        );
        log.record(&actor, AuditAction::ContentFlag, "content:2", None);

        assert_eq!(log.len(), 2);

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].action, AuditAction::ContentFlag);

        let for_one = log.for_subject("content:1", 10);
        assert_eq!(for_one.len(), 1);
        assert_eq!(for_one[0].action, AuditAction::ModerationChange);
    }

    #[test]
    fn test_retention_bound() {
        let log = AuditLog::new(3);
        let actor = "admin".to_string();

        for i in 0..5 {
            log.record(&actor, AuditAction::Pause, format!("round:{i}"), None);
        }

        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].subject, "round:4");
        assert_eq!(recent[2].subject, "round:2");
    }
}
