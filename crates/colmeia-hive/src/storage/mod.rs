//! Persistent document store.
//!
//! Data is organized the way the mobile clients see it: a `groups`
//! collection whose documents each own subcollections (members, tasks,
//! votes, ...). Documents are JSON objects keyed by string ids.
//!
//! Two backends implement [`DocumentStore`]:
//! - [`RocksStore`] - RocksDB on disk
//! - [`MemoryStore`] - in-process map, for tests and throwaway nodes
//!
//! Every write goes through one lock per store, so [`DocumentStore::update`]
//! and [`DocumentStore::insert_unless_exists`] are atomic with respect to
//! all other writes. Vote ballots and membership rely on this.

#[cfg(test)]
mod hooked;
mod memory;
mod rocks;

#[cfg(test)]
pub(crate) use hooked::{HookedStore, Op};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::error::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Length of generated document ids.
const ID_LEN: usize = 20;

/// Buffered change events per subscriber before it starts lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Generate a random document id.
pub fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Collections owned by a group document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subcollection {
    Members,
    Tasks,
    Routines,
    Expenses,
    Shopping,
    Activities,
    Votes,
}

impl Subcollection {
    /// Every subcollection a group can own.
    pub const ALL: [Subcollection; 7] = [
        Subcollection::Members,
        Subcollection::Tasks,
        Subcollection::Routines,
        Subcollection::Expenses,
        Subcollection::Shopping,
        Subcollection::Activities,
        Subcollection::Votes,
    ];

    /// Path segment name.
    pub const fn name(self) -> &'static str {
        match self {
            Subcollection::Members => "members",
            Subcollection::Tasks => "tasks",
            Subcollection::Routines => "routines",
            Subcollection::Expenses => "expenses",
            Subcollection::Shopping => "shopping",
            Subcollection::Activities => "activities",
            Subcollection::Votes => "votes",
        }
    }
}

/// Slash-separated path of a collection, e.g. `groups/abc/votes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The top-level groups collection.
    pub fn groups() -> Self {
        Self("groups".to_string())
    }

    /// A subcollection of one group.
    pub fn group_sub(group_id: &str, sub: Subcollection) -> Self {
        Self(format!("groups/{}/{}", group_id, sub.name()))
    }

    /// The path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key of document `id` in this collection.
    pub(crate) fn doc_key(&self, id: &str) -> Result<String> {
        if id.is_empty() || id.contains('/') {
            return Err(Error::InvalidInput(format!("invalid document id: {:?}", id)));
        }
        Ok(format!("{}/{}", self.0, id))
    }

    /// Key prefix shared by documents of this collection.
    pub(crate) fn prefix(&self) -> String {
        format!("{}/", self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document and its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Equality condition on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// `field == value`.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Whether `doc` satisfies this filter.
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

fn matches_all(filters: &[Filter], doc: &Value) -> bool {
    filters.iter().all(|f| f.matches(doc))
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Put,
    Delete,
}

/// One committed write, as seen by live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Whether this change touched `path`.
    pub fn is_in(&self, path: &CollectionPath) -> bool {
        self.collection == path.as_str()
    }
}

/// Generic document-store operations the hive core is written against.
pub trait DocumentStore: Send + Sync {
    /// Point read.
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Value>>;

    /// Create or overwrite a document.
    fn put(&self, path: &CollectionPath, id: &str, doc: Value) -> Result<()>;

    /// Delete a document. Returns whether it existed.
    fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool>;

    /// Delete a document only if it matches every filter, atomically.
    ///
    /// Returns `None` if the document does not exist, otherwise whether it
    /// matched and was deleted.
    fn delete_if(
        &self,
        path: &CollectionPath,
        id: &str,
        filters: &[Filter],
    ) -> Result<Option<bool>>;

    /// Every document directly in `path`.
    fn list(&self, path: &CollectionPath) -> Result<Vec<Document>>;

    /// Documents in `path` matching every filter.
    fn query(&self, path: &CollectionPath, filters: &[Filter]) -> Result<Vec<Document>> {
        Ok(self
            .list(path)?
            .into_iter()
            .filter(|d| matches_all(filters, &d.data))
            .collect())
    }

    /// Atomic read-modify-write of one document.
    ///
    /// `apply` runs while the store's write lock is held. If it fails,
    /// nothing is written and its error is returned. Returns the new value,
    /// or `None` if the document does not exist.
    fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        apply: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<Value>>;

    /// Insert `doc` unless a document in `path` already matches `filters`.
    ///
    /// The check and the insert happen under the write lock. Returns whether
    /// the document was inserted.
    fn insert_unless_exists(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        id: &str,
        doc: Value,
    ) -> Result<bool>;

    /// Live feed of committed writes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Typed helpers over [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    fn get_as<T: DeserializeOwned>(&self, path: &CollectionPath, id: &str) -> Result<Option<T>> {
        match self.get(path, id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put_as<T: Serialize>(&self, path: &CollectionPath, id: &str, doc: &T) -> Result<()> {
        self.put(path, id, serde_json::to_value(doc)?)
    }

    fn list_as<T: DeserializeOwned>(&self, path: &CollectionPath) -> Result<Vec<T>> {
        self.list(path)?
            .into_iter()
            .map(|d| serde_json::from_value(d.data).map_err(Error::from))
            .collect()
    }

    fn query_as<T: DeserializeOwned>(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
    ) -> Result<Vec<T>> {
        self.query(path, filters)?
            .into_iter()
            .map(|d| serde_json::from_value(d.data).map_err(Error::from))
            .collect()
    }

    /// Typed [`DocumentStore::update`]. `f` runs at most once; its result is
    /// returned alongside the stored document.
    fn update_as<T, R, F>(&self, path: &CollectionPath, id: &str, f: F) -> Result<Option<(T, R)>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let mut f = Some(f);
        let mut output = None;
        let updated = self.update(path, id, &mut |value: &mut Value| -> Result<()> {
            let f = f
                .take()
                .ok_or_else(|| Error::Storage("update closure invoked twice".into()))?;
            let mut doc: T = serde_json::from_value(value.clone())?;
            output = Some(f(&mut doc)?);
            *value = serde_json::to_value(&doc)?;
            Ok(())
        })?;

        match (updated, output) {
            (Some(value), Some(output)) => Ok(Some((serde_json::from_value(value)?, output))),
            _ => Ok(None),
        }
    }

    fn insert_unless_exists_as<T: Serialize>(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        id: &str,
        doc: &T,
    ) -> Result<bool> {
        self.insert_unless_exists(path, filters, id, serde_json::to_value(doc)?)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

/// Lock a store mutex, mapping poisoning to a storage error.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage("store lock poisoned".into()))
}

/// Sender half of a change feed.
pub(crate) fn change_feed() -> broadcast::Sender<ChangeEvent> {
    broadcast::channel(CHANGE_FEED_CAPACITY).0
}

/// Publish a change; having no subscribers is fine.
pub(crate) fn publish(
    feed: &broadcast::Sender<ChangeEvent>,
    path: &CollectionPath,
    id: &str,
    kind: ChangeKind,
) {
    let _ = feed.send(ChangeEvent {
        collection: path.as_str().to_string(),
        id: id.to_string(),
        kind,
    });
}
