//! Activity feed entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of event shown in a group's activity feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskCreated,
    TaskCompleted,
    TaskUncompleted,
    TaskDeleted,
    ExpenseAdded,
    ExpenseDeleted,
    MemberJoined,
    MemberLeft,
    VoteCreated,
    VoteCompleted,
}

/// One entry of the append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique identifier
    pub id: String,

    /// What happened
    #[serde(rename = "type")]
    pub kind: ActivityKind,

    /// Acting user
    pub user_id: String,

    /// Acting user's display name at the time
    pub user_name: String,

    /// Event time (ms since epoch)
    pub timestamp: u64,

    /// Kind-specific details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Activity {
    /// Create an activity stamped now.
    pub fn new(
        id: String,
        kind: ActivityKind,
        user_id: String,
        user_name: String,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            kind,
            user_id,
            user_name,
            timestamp: super::now_millis(),
            metadata,
        }
    }

    fn meta_str(&self, key: &str) -> &str {
        self.metadata.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Feed line for this activity.
    pub fn message(&self) -> String {
        let who = if self.user_name.is_empty() {
            "Someone"
        } else {
            self.user_name.as_str()
        };

        match self.kind {
            ActivityKind::TaskCreated => {
                format!("{} created task \"{}\"", who, self.meta_str("taskTitle"))
            }
            ActivityKind::TaskCompleted => {
                format!("{} completed task \"{}\"", who, self.meta_str("taskTitle"))
            }
            ActivityKind::TaskUncompleted => {
                format!("{} reopened task \"{}\"", who, self.meta_str("taskTitle"))
            }
            ActivityKind::TaskDeleted => {
                format!("{} deleted task \"{}\"", who, self.meta_str("taskTitle"))
            }
            ActivityKind::ExpenseAdded => {
                let amount = self
                    .metadata
                    .get("amount")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                format!("{} added an expense of {:.2}", who, amount)
            }
            ActivityKind::ExpenseDeleted => {
                format!("{} deleted expense \"{}\"", who, self.meta_str("description"))
            }
            ActivityKind::MemberJoined => format!("{} joined the group", who),
            ActivityKind::MemberLeft => {
                let name = self.meta_str("memberName");
                if name.is_empty() {
                    format!("{} left the group", who)
                } else {
                    format!("{} left the group", name)
                }
            }
            ActivityKind::VoteCreated => format!("{} started a vote", who),
            ActivityKind::VoteCompleted => match self.meta_str("result") {
                "" => "A vote was concluded".to_string(),
                result => format!("A vote was concluded: {}", result),
            },
        }
    }
}
