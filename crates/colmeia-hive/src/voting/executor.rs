//! Action executor.
//!
//! [`VotingSystem::perform_deletion`] is the one mutation routine behind
//! both the voted and the direct path. Execution after quorum is claimed
//! atomically on the vote record (`pending` → `executing`), so each vote
//! runs its action at most once.

use super::VotingSystem;
use crate::activity::metadata;
use crate::cascade;
use crate::error::{Error, Result};
use crate::identity::Actor;
use crate::models::{ActivityKind, Vote, VoteStatus};
use crate::storage::{CollectionPath, DocumentStoreExt, Filter, Subcollection};
use colmeia_quorum::ActionKind;
use serde_json::Value;

impl VotingSystem {
    /// Carry out `kind` against `target_id` and record the matching activity.
    ///
    /// Deleting a record that is already gone succeeds without an activity
    /// entry.
    pub(crate) fn perform_deletion(
        &self,
        actor: &Actor,
        group_id: &str,
        kind: ActionKind,
        target_id: &str,
        target_name: &str,
    ) -> Result<()> {
        let (sub, activity, label) = match kind {
            ActionKind::DeleteTask => (Subcollection::Tasks, ActivityKind::TaskDeleted, "taskTitle"),
            ActionKind::DeleteRoutine => {
                (Subcollection::Routines, ActivityKind::TaskDeleted, "taskTitle")
            }
            ActionKind::DeleteExpense => {
                (Subcollection::Expenses, ActivityKind::ExpenseDeleted, "description")
            }
            ActionKind::RemoveMember => {
                (Subcollection::Members, ActivityKind::MemberLeft, "memberName")
            }
            ActionKind::DeleteGroup => {
                // the activity feed goes with the group
                cascade::delete_group(self.store.as_ref(), group_id)?;
                return Ok(());
            }
        };

        let path = CollectionPath::group_sub(group_id, sub);
        if !self.store.delete(&path, target_id)? {
            tracing::debug!("{} {} already gone from {}", kind, target_id, path);
            return Ok(());
        }
        tracing::info!("{}: {} removed from {}", kind, target_id, path);

        let meta = metadata([(label, Value::from(target_name))]);
        self.activity.record(group_id, actor, activity, meta);
        Ok(())
    }

    /// Claim and run a vote that has reached quorum.
    ///
    /// Does nothing if the vote is not pending or still short of quorum.
    pub(crate) fn execute_vote(&self, actor: &Actor, group_id: &str, vote_id: &str) -> Result<Vote> {
        let (vote, claimed) = self
            .store
            .update_as::<Vote, _, _>(&Self::votes_path(group_id), vote_id, |vote| {
                Ok(vote.claim_execution())
            })?
            .ok_or(Error::VoteNotFound)?;

        if claimed {
            self.run_execution(actor, group_id, vote)
        } else {
            Ok(vote)
        }
    }

    /// Run the action of a vote this caller moved to `executing`, then
    /// settle it as `approved` or `failed`.
    pub(crate) fn run_execution(&self, actor: &Actor, group_id: &str, mut vote: Vote) -> Result<Vote> {
        debug_assert_eq!(vote.status, VoteStatus::Executing);

        let outcome = self
            .perform_deletion(actor, group_id, vote.kind, &vote.target_id, &vote.target_name)
            .map_err(|e| e.to_string());
        match &outcome {
            Ok(()) => tracing::info!("Vote {} approved: {} {}", vote.id, vote.kind, vote.target_id),
            Err(reason) => tracing::error!("Vote {} could not be executed: {}", vote.id, reason),
        }

        if vote.kind == ActionKind::DeleteGroup && outcome.is_ok() {
            // the vote record and the feed were deleted with the group
            vote.settle(outcome);
            return Ok(vote);
        }

        let settled = self
            .store
            .update_as::<Vote, _, _>(&Self::votes_path(group_id), &vote.id, |stored| {
                stored.settle(outcome.clone());
                Ok(())
            });
        match settled {
            Ok(Some((stored, ()))) => vote = stored,
            Ok(None) => vote.settle(outcome),
            Err(e) => {
                // the action already ran; the record stays executing until
                // resume_executing_votes settles it
                tracing::warn!("Vote {} executed but could not be settled: {}", vote.id, e);
                vote.settle(outcome);
            }
        }

        self.activity.record(
            group_id,
            actor,
            ActivityKind::VoteCompleted,
            metadata([
                ("voteType", Value::from(vote.kind.as_str())),
                ("targetName", Value::from(vote.target_name.as_str())),
                ("result", Value::from(vote.status.as_str())),
            ]),
        );
        Ok(vote)
    }

    /// Finish votes left in `executing` by an interrupted run.
    ///
    /// Deletions are idempotent, so the action is simply run again and the
    /// vote settled. Returns how many votes were finished. Must not run
    /// while other callers can be executing votes.
    pub fn resume_executing_votes(&self) -> Result<usize> {
        let mut resumed = 0;
        for group in self.groups.list_groups()? {
            let stuck: Vec<Vote> = self.store.query_as(
                &Self::votes_path(&group.id),
                &[Filter::eq(Vote::FIELD_STATUS, VoteStatus::Executing.as_str())],
            )?;
            for vote in stuck {
                tracing::warn!("Resuming interrupted execution of vote {}", vote.id);
                let name = self
                    .groups
                    .membership(&group.id, &vote.created_by)?
                    .map(|m| m.display_name)
                    .unwrap_or_default();
                let creator = Actor::new(vote.created_by.clone(), name)?;
                self.run_execution(&creator, &group.id, vote)?;
                resumed += 1;
            }
        }
        Ok(resumed)
    }
}
