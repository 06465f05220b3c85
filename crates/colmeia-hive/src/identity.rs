//! Acting user identity.
//!
//! Authentication happens outside the hive; the core only sees an opaque
//! user id and a display name.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Display name used when nothing better is known.
const FALLBACK_NAME: &str = "member";

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque identity id
    pub user_id: String,
    /// Human-readable name for activity entries
    pub display_name: String,
}

impl Actor {
    /// Build an actor. An empty user id means nobody is signed in.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(Error::Unauthenticated);
        }
        let display_name = display_name.into().trim().to_string();
        Ok(Self {
            user_id,
            display_name: if display_name.is_empty() {
                FALLBACK_NAME.to_string()
            } else {
                display_name
            },
        })
    }

    /// Build an actor whose display name is the local part of `email`.
    pub fn from_email(user_id: impl Into<String>, email: &str) -> Result<Self> {
        let local = email.split('@').next().unwrap_or_default();
        Self::new(user_id, local)
    }
}
