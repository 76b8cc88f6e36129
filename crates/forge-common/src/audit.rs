//! Audit log

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::TeamId;

/// A single field change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditUpdate {
    /// Field name
    pub key: String,
    /// Previous value
    pub old: String,
    /// New value
    pub new: String,
}

impl AuditUpdate {
    /// New field change record
    pub fn new(key: &str, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            old: old.into(),
            new: new.into(),
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id
    pub id: Uuid,
    /// Event name, e.g. `billing.subscription.updated`
    pub event: String,
    /// Team the event belongs to
    pub team_id: Option<TeamId>,
    /// Event specific body
    pub body: serde_json::Value,
    /// When it was recorded
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Subscription field changes for a team
    pub fn subscription_updated(team_id: TeamId, updates: Vec<AuditUpdate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: "billing.subscription.updated".into(),
            team_id: Some(team_id),
            body: json!({ "updates": updates }),
            created_at: Utc::now(),
        }
    }

    /// Team type change
    pub fn team_type_changed(team_id: TeamId, old: u64, new: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: "team.type.changed".into(),
            team_id: Some(team_id),
            body: json!({ "updates": [AuditUpdate::new("teamType", old.to_string(), new.to_string())] }),
            created_at: Utc::now(),
        }
    }

    /// Field updates carried in the body
    pub fn updates(&self) -> Vec<AuditUpdate> {
        self.body
            .get("updates")
            .cloned()
            .and_then(|u| serde_json::from_value(u).ok())
            .unwrap_or_default()
    }
}

/// Audit log sink
pub trait AuditLog: Send + Sync {
    /// Append an entry
    fn record(&self, entry: AuditEntry);

    /// Entries for a team, oldest first
    fn for_team(&self, team_id: &TeamId) -> Vec<AuditEntry>;
}

/// In-memory audit log
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        tracing::debug!(event = %entry.event, team = ?entry.team_id, "audit");
        self.entries.write().push(entry);
    }

    fn for_team(&self, team_id: &TeamId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.team_id.as_ref() == Some(team_id))
            .cloned()
            .collect()
    }
}
