//! Group-decision voting.
//!
//! Destructive actions in groups of three or more members go through a
//! vote; smaller groups act directly. Both paths end in the same mutation
//! routine, so a task deleted by vote and a task deleted directly leave the
//! same trace in the store and the activity feed.
//!
//! - [`ledger`] - vote lifecycle (create, ballot, cancel, reject)
//! - [`executor`] - the shared deletion routine and post-quorum execution
//! - [`direct`] - the no-vote path and the combined screen-level flow

mod direct;
mod executor;
mod ledger;

pub use direct::DeletionOutcome;

use crate::activity::ActivityLog;
use crate::groups::GroupDirectory;
use crate::storage::{CollectionPath, DocumentStore, Subcollection};
use std::sync::Arc;

/// Entry point for votes and destructive actions on group data.
pub struct VotingSystem {
    store: Arc<dyn DocumentStore>,
    groups: GroupDirectory,
    activity: ActivityLog,
}

impl VotingSystem {
    pub fn new(store: Arc<dyn DocumentStore>, activity: ActivityLog) -> Self {
        Self {
            groups: GroupDirectory::new(Arc::clone(&store), activity.clone()),
            store,
            activity,
        }
    }

    /// Group and membership records.
    pub fn groups(&self) -> &GroupDirectory {
        &self.groups
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn votes_path(group_id: &str) -> CollectionPath {
        CollectionPath::group_sub(group_id, Subcollection::Votes)
    }
}
