//! Cascading group deletion.
//!
//! Deleting a group touches many documents with no cross-document
//! transaction, so it runs as a resumable saga:
//!
//! 1. stamp `deletingSince` on the group record
//! 2. clear every subcollection
//! 3. delete the group record
//!
//! A crash between steps leaves the stamp behind, and
//! [`resume_group_deletions`] finishes the job on the next start.

use crate::error::Result;
use crate::models::{now_millis, Group};
use crate::storage::{CollectionPath, DocumentStore, DocumentStoreExt, Subcollection};

/// Delete a group and everything it owns.
///
/// Safe to call repeatedly. Returns whether the group record still existed.
pub fn delete_group(store: &dyn DocumentStore, group_id: &str) -> Result<bool> {
    let groups = CollectionPath::groups();

    let marked = store.update_as::<Group, (), _>(&groups, group_id, |group| {
        if group.deleting_since.is_none() {
            group.deleting_since = Some(now_millis());
        }
        Ok(())
    })?;
    if marked.is_some() {
        tracing::info!("Deleting group {}", group_id);
    }

    // Subcollections are cleared even without a group record so that
    // orphans from an interrupted run are not left behind.
    for sub in Subcollection::ALL {
        let path = CollectionPath::group_sub(group_id, sub);
        let docs = store.list(&path)?;
        let count = docs.len();
        for doc in docs {
            store.delete(&path, &doc.id)?;
        }
        if count > 0 {
            tracing::debug!("Cleared {} documents from {}", count, path);
        }
    }

    let existed = store.delete(&groups, group_id)?;
    if existed {
        tracing::info!("Group {} deleted", group_id);
    }
    Ok(existed)
}

/// Finish every group deletion that was interrupted.
///
/// Returns how many groups were completed.
pub fn resume_group_deletions(store: &dyn DocumentStore) -> Result<usize> {
    let pending: Vec<Group> = store
        .list_as::<Group>(&CollectionPath::groups())?
        .into_iter()
        .filter(Group::is_deleting)
        .collect();

    for group in &pending {
        tracing::warn!("Resuming interrupted deletion of group {}", group.id);
        delete_group(store, &group.id)?;
    }
    Ok(pending.len())
}
