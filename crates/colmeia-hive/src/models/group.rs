//! Group model.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet used for invite codes.
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A shared household whose members coordinate tasks, expenses and chores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Code other users join with
    pub invite_code: String,

    /// User id of the creator
    pub created_by: String,

    /// Creation time (ms since epoch)
    pub created_at: u64,

    /// Set while a cascading delete is in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleting_since: Option<u64>,
}

impl Group {
    /// Length of generated invite codes.
    pub const INVITE_CODE_LEN: usize = 6;

    /// Query key for the invite code.
    pub const FIELD_INVITE_CODE: &'static str = "inviteCode";

    /// Create a new group with a freshly generated invite code.
    pub fn new(id: String, name: String, created_by: String) -> Self {
        Self {
            id,
            name,
            invite_code: Self::generate_invite_code(),
            created_by,
            created_at: super::now_millis(),
            deleting_since: None,
        }
    }

    /// Generate a random uppercase alphanumeric invite code.
    pub fn generate_invite_code() -> String {
        let mut rng = rand::thread_rng();
        (0..Self::INVITE_CODE_LEN)
            .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
            .collect()
    }

    /// Canonical form of a user-typed invite code.
    pub fn normalize_invite_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Whether a cascading delete has started on this group.
    pub fn is_deleting(&self) -> bool {
        self.deleting_since.is_some()
    }
}
