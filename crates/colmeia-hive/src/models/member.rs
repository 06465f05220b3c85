//! Member model.

use serde::{Deserialize, Serialize};

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Created the group
    Admin,
    /// Joined with an invite code
    Member,
}

/// A (group, user) association.
///
/// The record id is distinct from the user id it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Record identifier
    pub id: String,

    /// Identity of the user
    pub user_id: String,

    /// E-mail or display name
    pub display_name: String,

    /// Join time (ms since epoch)
    pub joined_at: u64,

    /// Role in the group
    pub role: MemberRole,
}

impl Member {
    /// Query key for the referenced user.
    pub const FIELD_USER_ID: &'static str = "userId";

    /// Create a member record joined now.
    pub fn new(id: String, user_id: String, display_name: String, role: MemberRole) -> Self {
        Self {
            id,
            user_id,
            display_name,
            joined_at: super::now_millis(),
            role,
        }
    }
}
