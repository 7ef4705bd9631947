use std::collections::VecDeque;

use indexmap::IndexSet;

/// Number of recent chat messages retained per room before the oldest is
/// evicted. Not replayed to joiners; kept only so a future feature could use it.
pub const MAX_HISTORY: usize = 100;

pub const GENERAL_ROOM: &str = "General";

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub sender_name: String,
    pub content: String,
    pub timestamp: String,
}

/// A named channel. Pure data, owned and mutated exclusively by the hub.
#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub created_by: String,
    pub created_at: String,
    pub members: IndexSet<String>,
    pub history: VecDeque<HistoryEntry>,
}

impl Room {
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_by: created_by.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            members: IndexSet::new(),
            history: VecDeque::new(),
        }
    }

    /// Returns false if `session_id` was already a member.
    pub fn add_member(&mut self, session_id: impl Into<String>) -> bool {
        self.members.insert(session_id.into())
    }

    /// Returns false if `session_id` was not a member.
    pub fn remove_member(&mut self, session_id: &str) -> bool {
        self.members.shift_remove(session_id)
    }

    pub fn append_history(&mut self, sender_name: impl Into<String>, content: impl Into<String>) {
        self.history.push_back(HistoryEntry {
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }
}
