//! Direct-action fallback for groups too small to vote.

use super::VotingSystem;
use crate::error::Result;
use crate::identity::Actor;
use colmeia_quorum::ActionKind;
use serde::Serialize;

/// What a deletion request turned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    /// A vote was opened (or joined the action straight to quorum).
    Proposed { vote_id: String },
    /// The target was deleted without a vote.
    Deleted,
}

impl VotingSystem {
    /// Perform `kind` immediately, without a vote record.
    ///
    /// Callers are expected to have checked [`VotingSystem::needs_voting`];
    /// [`VotingSystem::request_deletion`] does both.
    pub fn delete_direct(
        &self,
        actor: &Actor,
        group_id: &str,
        kind: ActionKind,
        target_id: &str,
        target_name: &str,
    ) -> Result<()> {
        self.groups.require_member(group_id, actor)?;
        tracing::info!("{} {} {} directly in group {}", actor.user_id, kind, target_id, group_id);
        self.perform_deletion(actor, group_id, kind, target_id, target_name)
    }

    pub fn delete_task_direct(
        &self,
        actor: &Actor,
        group_id: &str,
        task_id: &str,
        title: &str,
    ) -> Result<()> {
        self.delete_direct(actor, group_id, ActionKind::DeleteTask, task_id, title)
    }

    pub fn delete_routine_direct(
        &self,
        actor: &Actor,
        group_id: &str,
        routine_id: &str,
        title: &str,
    ) -> Result<()> {
        self.delete_direct(actor, group_id, ActionKind::DeleteRoutine, routine_id, title)
    }

    pub fn delete_expense_direct(
        &self,
        actor: &Actor,
        group_id: &str,
        expense_id: &str,
        description: &str,
    ) -> Result<()> {
        self.delete_direct(actor, group_id, ActionKind::DeleteExpense, expense_id, description)
    }

    pub fn remove_member_direct(
        &self,
        actor: &Actor,
        group_id: &str,
        member_id: &str,
        member_name: &str,
    ) -> Result<()> {
        self.delete_direct(actor, group_id, ActionKind::RemoveMember, member_id, member_name)
    }

    pub fn delete_group_direct(&self, actor: &Actor, group_id: &str) -> Result<()> {
        self.delete_direct(actor, group_id, ActionKind::DeleteGroup, group_id, "")
    }

    /// Delete through a vote when the group is large enough, directly
    /// otherwise.
    pub fn request_deletion(
        &self,
        actor: &Actor,
        group_id: &str,
        kind: ActionKind,
        target_id: &str,
        target_name: &str,
    ) -> Result<DeletionOutcome> {
        if self.needs_voting(group_id)? {
            let vote_id = self.create_vote(actor, group_id, kind, target_id, target_name)?;
            Ok(DeletionOutcome::Proposed { vote_id })
        } else {
            self.delete_direct(actor, group_id, kind, target_id, target_name)?;
            Ok(DeletionOutcome::Deleted)
        }
    }
}
