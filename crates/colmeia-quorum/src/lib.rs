//! Quorum rules for Colmeia group decisions.
//!
//! Destructive actions on shared household data (deleting a task, an
//! expense or a chore, removing a member, disbanding the group) are put to a
//! vote once a group is large enough that no single member should decide
//! alone.
//!
//! # Thresholds
//!
//! | members | disband group | anything else |
//! |---------|---------------|---------------|
//! | 1–2     | 1 (no vote)   | 1 (no vote)   |
//! | 3       | 3             | 2             |
//! | n ≥ 4   | n − 1         | ceil(n / 2)   |
//!
//! Everything here is pure computation over a membership count; callers
//! obtain the count from a live query.

mod action;
mod quorum;

pub use action::{ActionKind, ParseActionKindError};
pub use quorum::{needs_voting, required_votes, Quorum, VOTING_THRESHOLD};
