//! Data model for hive groups.
//!
//! # Core Types
//!
//! - [`Group`] - A shared household (a "colmeia")
//! - [`Member`] - A (group, user) association with a role
//! - [`Vote`] - A quorum-gated proposal for a destructive action
//! - [`Activity`] - One line of the group's activity feed
//!
//! Documents are stored as camelCase JSON so field names double as query
//! keys (see the `FIELD_*` constants).

mod activity;
mod group;
mod member;
mod vote;

pub use activity::{Activity, ActivityKind};
pub use group::Group;
pub use member::{Member, MemberRole};
pub use vote::{Vote, VoteStatus};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
