//! Destructive action categories that can be put to a group vote.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A destructive action on shared group data.
///
/// The set is closed: every kind maps to exactly one mutation and one quorum
/// rule. Wire names are snake_case (`delete_task`, `remove_member`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionKind {
    /// Delete a shared task.
    DeleteTask,
    /// Delete a recorded expense.
    DeleteExpense,
    /// Delete a recurring chore.
    DeleteRoutine,
    /// Remove a member from the group.
    RemoveMember,
    /// Disband the whole group.
    #[cfg_attr(feature = "serde", serde(alias = "delete_colmeia"))]
    DeleteGroup,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::DeleteTask,
        ActionKind::DeleteExpense,
        ActionKind::DeleteRoutine,
        ActionKind::RemoveMember,
        ActionKind::DeleteGroup,
    ];

    /// Wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::DeleteTask => "delete_task",
            ActionKind::DeleteExpense => "delete_expense",
            ActionKind::DeleteRoutine => "delete_routine",
            ActionKind::RemoveMember => "remove_member",
            ActionKind::DeleteGroup => "delete_group",
        }
    }

    /// Whether this action disbands the group (the near-unanimous rule).
    pub const fn is_disband(self) -> bool {
        matches!(self, ActionKind::DeleteGroup)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known action kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action kind: {0}")]
pub struct ParseActionKindError(pub String);

impl FromStr for ActionKind {
    type Err = ParseActionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_task" => Ok(ActionKind::DeleteTask),
            "delete_expense" => Ok(ActionKind::DeleteExpense),
            "delete_routine" => Ok(ActionKind::DeleteRoutine),
            "remove_member" => Ok(ActionKind::RemoveMember),
            "delete_group" | "delete_colmeia" => Ok(ActionKind::DeleteGroup),
            other => Err(ParseActionKindError(other.to_string())),
        }
    }
}
