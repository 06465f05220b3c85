//! Vote ledger: opening votes and collecting ballots.
//!
//! Ballots are applied with the store's atomic single-document update, so
//! two members voting at the same moment cannot overwrite each other's
//! ballot, and only the ballot that reaches quorum triggers execution.

use super::VotingSystem;
use crate::activity::metadata;
use crate::error::{Error, Result};
use crate::identity::Actor;
use crate::models::{ActivityKind, Vote, VoteStatus};
use crate::storage::{new_id, DocumentStoreExt, Filter};
use colmeia_quorum::{ActionKind, Quorum};
use serde_json::Value;

impl VotingSystem {
    /// Whether destructive actions in this group must be voted on.
    pub fn needs_voting(&self, group_id: &str) -> Result<bool> {
        Ok(colmeia_quorum::needs_voting(
            self.groups.member_count(group_id)?,
        ))
    }

    /// Quorum for `kind` given the group's current membership.
    pub fn calculate_required_votes(&self, group_id: &str, kind: ActionKind) -> Result<Quorum> {
        Ok(Quorum::for_group(self.groups.member_count(group_id)?, kind))
    }

    /// Open a vote on `kind` against `target_id`, with the creator's ballot
    /// already cast. Returns the vote id.
    ///
    /// If the creator's ballot alone meets quorum the action runs
    /// immediately.
    pub fn create_vote(
        &self,
        actor: &Actor,
        group_id: &str,
        kind: ActionKind,
        target_id: &str,
        target_name: &str,
    ) -> Result<String> {
        // disbanding always targets the group itself
        let target_id = if kind.is_disband() { group_id } else { target_id };
        if target_id.trim().is_empty() {
            return Err(Error::InvalidInput("vote target must not be empty".into()));
        }
        self.groups.require_member(group_id, actor)?;

        let quorum = self.calculate_required_votes(group_id, kind)?;
        let vote = Vote::new(
            new_id(),
            kind,
            target_id.to_string(),
            target_name.to_string(),
            actor.user_id.clone(),
            quorum,
        );

        let one_pending = [
            Filter::eq(Vote::FIELD_TARGET_ID, target_id),
            Filter::eq(Vote::FIELD_STATUS, VoteStatus::Pending.as_str()),
        ];
        if !self.store.insert_unless_exists_as(
            &Self::votes_path(group_id),
            &one_pending,
            &vote.id,
            &vote,
        )? {
            return Err(Error::DuplicatePendingVote);
        }

        tracing::info!(
            "Vote {} opened by {} in group {}: {} {} ({}/{} votes)",
            vote.id,
            actor.user_id,
            group_id,
            kind,
            target_id,
            vote.votes.len(),
            vote.required_votes
        );
        self.activity.record(
            group_id,
            actor,
            ActivityKind::VoteCreated,
            metadata([
                ("voteType", Value::from(kind.as_str())),
                ("targetName", Value::from(target_name)),
                ("voteId", Value::from(vote.id.as_str())),
            ]),
        );

        if vote.quorum_reached() {
            self.execute_vote(actor, group_id, &vote.id)?;
        }
        Ok(vote.id)
    }

    /// Cast `actor`'s ballot. Runs the action if this ballot reaches quorum.
    ///
    /// Returns the vote as it stands afterwards.
    pub fn add_vote(&self, actor: &Actor, group_id: &str, vote_id: &str) -> Result<Vote> {
        self.groups.require_member(group_id, actor)?;

        let (vote, reached) = self
            .store
            .update_as::<Vote, _, _>(&Self::votes_path(group_id), vote_id, |vote| {
                vote.cast(&actor.user_id)
            })?
            .ok_or(Error::VoteNotFound)?;

        tracing::info!(
            "{} voted on {} ({}/{})",
            actor.user_id,
            vote_id,
            vote.votes.len(),
            vote.required_votes
        );

        if reached {
            self.run_execution(actor, group_id, vote)
        } else {
            Ok(vote)
        }
    }

    /// Withdraw `actor`'s ballot. The creator's ballot cannot be withdrawn.
    pub fn remove_vote(&self, actor: &Actor, group_id: &str, vote_id: &str) -> Result<Vote> {
        self.groups.require_member(group_id, actor)?;

        let (vote, ()) = self
            .store
            .update_as::<Vote, _, _>(&Self::votes_path(group_id), vote_id, |vote| {
                vote.retract(&actor.user_id)
            })?
            .ok_or(Error::VoteNotFound)?;

        tracing::info!("{} withdrew their vote on {}", actor.user_id, vote_id);
        Ok(vote)
    }

    /// Cancel a pending vote. Creator only; the vote is kept as `rejected`.
    pub fn cancel_vote(&self, actor: &Actor, group_id: &str, vote_id: &str) -> Result<Vote> {
        self.groups.require_member(group_id, actor)?;

        let (vote, ()) = self
            .store
            .update_as::<Vote, _, _>(&Self::votes_path(group_id), vote_id, |vote| {
                vote.cancel(&actor.user_id)
            })?
            .ok_or(Error::VoteNotFound)?;

        tracing::info!("Vote {} cancelled by its creator", vote_id);
        self.activity.record(
            group_id,
            actor,
            ActivityKind::VoteCompleted,
            metadata([
                ("voteType", Value::from(vote.kind.as_str())),
                ("targetName", Value::from(vote.target_name.as_str())),
                ("result", Value::from(VoteStatus::Rejected.as_str())),
            ]),
        );
        Ok(vote)
    }

    /// Veto a pending vote by deleting its record. Any member may do this;
    /// no terminal state is retained.
    pub fn reject_vote(&self, actor: &Actor, group_id: &str, vote_id: &str) -> Result<()> {
        self.groups.require_member(group_id, actor)?;

        let still_pending = [Filter::eq(Vote::FIELD_STATUS, VoteStatus::Pending.as_str())];
        match self
            .store
            .delete_if(&Self::votes_path(group_id), vote_id, &still_pending)?
        {
            None => Err(Error::VoteNotFound),
            Some(false) => Err(Error::VoteAlreadyResolved),
            Some(true) => {
                tracing::info!("Vote {} vetoed by {}", vote_id, actor.user_id);
                Ok(())
            }
        }
    }

    /// Look up one vote.
    pub fn vote(&self, group_id: &str, vote_id: &str) -> Result<Vote> {
        self.store
            .get_as(&Self::votes_path(group_id), vote_id)?
            .ok_or(Error::VoteNotFound)
    }

    /// Pending votes of a group, oldest first.
    pub fn pending_votes(&self, group_id: &str) -> Result<Vec<Vote>> {
        let mut votes: Vec<Vote> = self.store.query_as(
            &Self::votes_path(group_id),
            &[Filter::eq(Vote::FIELD_STATUS, VoteStatus::Pending.as_str())],
        )?;
        votes.sort_by_key(|v| v.created_at);
        Ok(votes)
    }
}
