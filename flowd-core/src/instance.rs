//! Workflow instance state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed transition in an instance's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Action that fired.
    pub action_id: String,

    /// State the instance left.
    pub from_state_id: String,

    /// State the instance entered.
    pub to_state_id: String,

    /// Commit time (UTC).
    pub timestamp: DateTime<Utc>,
}

/// A workflow instance: one execution token walking a definition's graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique instance ID (generated at start).
    pub id: String,

    /// Definition this instance is bound to.
    pub definition_id: String,

    /// ID of the state the instance currently occupies.
    pub current_state_id: String,

    /// Append-only transition history, oldest first.
    pub history: Vec<HistoryEntry>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Creates a new instance in the given initial state with empty history.
    pub fn new(
        id: impl Into<String>,
        definition_id: impl Into<String>,
        initial_state_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            definition_id: definition_id.into(),
            current_state_id: initial_state_id.into(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Commits a transition: appends the history entry, then moves the
    /// current state. One timestamp covers the entry and `updated_at` so the
    /// two never disagree. Returns the appended entry.
    pub fn apply_transition(&mut self, action_id: &str, to_state_id: &str) -> HistoryEntry {
        let now = Utc::now();
        let entry = HistoryEntry {
            action_id: action_id.to_string(),
            from_state_id: self.current_state_id.clone(),
            to_state_id: to_state_id.to_string(),
            timestamp: now,
        };
        self.history.push(entry.clone());
        self.current_state_id = to_state_id.to_string();
        self.updated_at = now;
        entry
    }
}
