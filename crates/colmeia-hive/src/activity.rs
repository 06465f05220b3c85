//! Activity log sink.
//!
//! Activity entries are a side channel: the core records them after the
//! operation they describe, and a failed write never fails that operation.

use crate::error::Result;
use crate::identity::Actor;
use crate::models::{Activity, ActivityKind};
use crate::storage::{new_id, CollectionPath, DocumentStore, DocumentStoreExt, Subcollection};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Destination for activity entries.
pub trait ActivitySink: Send + Sync {
    /// Append one entry to the feed of `group_id`.
    fn append(&self, group_id: &str, activity: &Activity) -> Result<()>;
}

/// Writes activity entries to `groups/{id}/activities`.
pub struct StoreActivitySink {
    store: Arc<dyn DocumentStore>,
}

impl StoreActivitySink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl ActivitySink for StoreActivitySink {
    fn append(&self, group_id: &str, activity: &Activity) -> Result<()> {
        let path = CollectionPath::group_sub(group_id, Subcollection::Activities);
        self.store.put_as(&path, &activity.id, activity)
    }
}

/// Best-effort activity recording.
#[derive(Clone)]
pub struct ActivityLog {
    sink: Arc<dyn ActivitySink>,
}

impl ActivityLog {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self { sink }
    }

    /// Record an activity. Failures are logged and swallowed.
    pub fn record(
        &self,
        group_id: &str,
        actor: &Actor,
        kind: ActivityKind,
        metadata: Map<String, Value>,
    ) {
        let activity = Activity::new(
            new_id(),
            kind,
            actor.user_id.clone(),
            actor.display_name.clone(),
            metadata,
        );
        if let Err(e) = self.sink.append(group_id, &activity) {
            tracing::warn!("Failed to record {:?} activity in group {}: {}", kind, group_id, e);
        }
    }
}

/// Build activity metadata from key/value pairs.
pub fn metadata<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
