//! Vote model and its state machine.
//!
//! ```text
//! pending --(quorum reached)--> executing --(mutation ok)-----> approved
//!                                         \--(mutation failed)-> failed
//! pending --(creator cancels)--> rejected
//! ```
//!
//! Terminal votes are kept as history. `executing` is the in-flight claim
//! taken by exactly one caller; it is not pending, so no ballot can change
//! once quorum has been reached.

use crate::error::{Error, Result};
use colmeia_quorum::{ActionKind, Quorum};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a vote.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    /// Collecting ballots
    Pending,
    /// Quorum reached, action being carried out
    Executing,
    /// Action carried out
    Approved,
    /// Cancelled by its creator
    Rejected,
    /// Quorum reached but the action could not be carried out
    Failed,
}

impl VoteStatus {
    /// Wire name, as stored in the `status` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            VoteStatus::Pending => "pending",
            VoteStatus::Executing => "executing",
            VoteStatus::Approved => "approved",
            VoteStatus::Rejected => "rejected",
            VoteStatus::Failed => "failed",
        }
    }

    /// Whether the vote can never change state again.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            VoteStatus::Approved | VoteStatus::Rejected | VoteStatus::Failed
        )
    }
}

/// A proposal to carry out a destructive action once enough members agree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Unique identifier
    pub id: String,

    /// Action to carry out
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Record acted upon
    pub target_id: String,

    /// Display label of the target, captured at creation
    pub target_name: String,

    /// User id of the proposer
    pub created_by: String,

    /// Creation time (ms since epoch)
    pub created_at: u64,

    /// User ids in favour, in ballot order; no duplicates
    pub votes: Vec<String>,

    /// Current state
    pub status: VoteStatus,

    /// Ballots needed, frozen at creation
    pub required_votes: usize,

    /// Membership at creation
    #[serde(default)]
    pub total_members: usize,

    /// Why the action failed, for `failed` votes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Vote {
    /// Query key for the target id.
    pub const FIELD_TARGET_ID: &'static str = "targetId";

    /// Query key for the status.
    pub const FIELD_STATUS: &'static str = "status";

    /// Open a vote with the creator's ballot already cast.
    pub fn new(
        id: String,
        kind: ActionKind,
        target_id: String,
        target_name: String,
        created_by: String,
        quorum: Quorum,
    ) -> Self {
        Self {
            id,
            kind,
            target_id,
            target_name,
            votes: vec![created_by.clone()],
            created_by,
            created_at: super::now_millis(),
            status: VoteStatus::Pending,
            required_votes: quorum.required.max(1),
            total_members: quorum.total,
            failure: None,
        }
    }

    /// Whether `user_id` has voted in favour.
    pub fn has_voted(&self, user_id: &str) -> bool {
        self.votes.iter().any(|v| v == user_id)
    }

    /// Whether the ballots meet the frozen requirement.
    pub fn quorum_reached(&self) -> bool {
        self.votes.len() >= self.required_votes
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status == VoteStatus::Pending {
            Ok(())
        } else {
            Err(Error::VoteAlreadyResolved)
        }
    }

    /// Add a ballot for `user_id`.
    ///
    /// Returns `true` when this ballot reached quorum; the vote then moves to
    /// `executing` and the caller owns the execution.
    pub fn cast(&mut self, user_id: &str) -> Result<bool> {
        self.ensure_pending()?;
        if self.has_voted(user_id) {
            return Err(Error::DuplicateVote);
        }
        self.votes.push(user_id.to_string());
        Ok(self.claim_execution())
    }

    /// Withdraw the ballot of `user_id`. The creator's ballot is permanent.
    pub fn retract(&mut self, user_id: &str) -> Result<()> {
        self.ensure_pending()?;
        if self.created_by == user_id {
            return Err(Error::CreatorCannotRemove);
        }
        if !self.has_voted(user_id) {
            return Err(Error::NotVoted);
        }
        self.votes.retain(|v| v != user_id);
        Ok(())
    }

    /// Cancel the vote. Only the creator may do this.
    pub fn cancel(&mut self, user_id: &str) -> Result<()> {
        if self.created_by != user_id {
            return Err(Error::NotCreator);
        }
        self.ensure_pending()?;
        self.status = VoteStatus::Rejected;
        Ok(())
    }

    /// Move a pending vote that meets quorum to `executing`.
    ///
    /// Returns `false` if the vote is not pending or still short of quorum.
    pub fn claim_execution(&mut self) -> bool {
        if self.status == VoteStatus::Pending && self.quorum_reached() {
            self.status = VoteStatus::Executing;
            true
        } else {
            false
        }
    }

    /// Record the outcome of an execution claimed with [`Vote::claim_execution`].
    pub fn settle(&mut self, outcome: std::result::Result<(), String>) {
        match outcome {
            Ok(()) => {
                self.status = VoteStatus::Approved;
                self.failure = None;
            }
            Err(reason) => {
                self.status = VoteStatus::Failed;
                self.failure = Some(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(required: usize) -> Vote {
        Vote::new(
            "v1".into(),
            ActionKind::DeleteTask,
            "t1".into(),
            "Clean kitchen".into(),
            "alice".into(),
            Quorum {
                required,
                total: 4,
            },
        )
    }

    #[test]
    fn creator_votes_first() {
        let v = vote(2);
        assert_eq!(v.votes, vec!["alice".to_string()]);
        assert_eq!(v.status, VoteStatus::Pending);
        assert!(!v.quorum_reached());
    }

    #[test]
    fn reaching_quorum_claims_execution() {
        let mut v = vote(2);
        assert!(v.cast("bob").unwrap());
        assert_eq!(v.status, VoteStatus::Executing);
        assert!(matches!(v.cast("carol"), Err(Error::VoteAlreadyResolved)));
        assert_eq!(v.votes.len(), 2);
    }

    #[test]
    fn duplicate_ballot_leaves_votes_unchanged() {
        let mut v = vote(3);
        assert!(!v.cast("bob").unwrap());
        assert!(matches!(v.cast("bob"), Err(Error::DuplicateVote)));
        assert_eq!(v.votes, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn creator_ballot_is_permanent() {
        let mut v = vote(3);
        assert!(matches!(v.retract("alice"), Err(Error::CreatorCannotRemove)));
        v.status = VoteStatus::Approved;
        // terminal status wins over the creator rule
        assert!(matches!(v.retract("alice"), Err(Error::VoteAlreadyResolved)));
    }

    #[test]
    fn retract_requires_ballot() {
        let mut v = vote(3);
        assert!(matches!(v.retract("bob"), Err(Error::NotVoted)));
        v.cast("bob").unwrap();
        v.retract("bob").unwrap();
        assert_eq!(v.votes, vec!["alice".to_string()]);
    }

    #[test]
    fn only_creator_cancels() {
        let mut v = vote(3);
        assert!(matches!(v.cancel("bob"), Err(Error::NotCreator)));
        v.cancel("alice").unwrap();
        assert_eq!(v.status, VoteStatus::Rejected);
        assert!(matches!(v.cancel("alice"), Err(Error::VoteAlreadyResolved)));
    }

    #[test]
    fn settle_records_failure() {
        let mut v = vote(1);
        assert!(v.claim_execution());
        v.settle(Err("store offline".into()));
        assert_eq!(v.status, VoteStatus::Failed);
        assert!(v.status.is_terminal());
        assert_eq!(v.failure.as_deref(), Some("store offline"));
        assert!(!v.claim_execution());
    }

    #[test]
    fn wire_format() {
        let json = serde_json::to_value(vote(2)).unwrap();
        assert_eq!(json["type"], "delete_task");
        assert_eq!(json["targetId"], "t1");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["requiredVotes"], 2);
        assert_eq!(json[Vote::FIELD_STATUS], VoteStatus::Pending.as_str());
    }
}
