//! Memory store with a hook in front of every write, for fault tests.

use super::{ChangeEvent, CollectionPath, Document, DocumentStore, Filter, MemoryStore};
use crate::error::Result;
use serde_json::Value;
use tokio::sync::broadcast;

/// Write operation about to reach the inner store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Put,
    Delete,
    Update,
    Insert,
}

type Hook = Box<dyn Fn(&MemoryStore, Op, &CollectionPath) -> Result<()> + Send + Sync>;

/// Runs `hook` before each write; an error from the hook fails the write.
pub(crate) struct HookedStore {
    inner: MemoryStore,
    hook: Hook,
}

impl HookedStore {
    pub(crate) fn new(
        hook: impl Fn(&MemoryStore, Op, &CollectionPath) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: MemoryStore::new(),
            hook: Box::new(hook),
        }
    }
}

impl DocumentStore for HookedStore {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Value>> {
        self.inner.get(path, id)
    }

    fn put(&self, path: &CollectionPath, id: &str, doc: Value) -> Result<()> {
        (self.hook)(&self.inner, Op::Put, path)?;
        self.inner.put(path, id, doc)
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool> {
        (self.hook)(&self.inner, Op::Delete, path)?;
        self.inner.delete(path, id)
    }

    fn delete_if(
        &self,
        path: &CollectionPath,
        id: &str,
        filters: &[Filter],
    ) -> Result<Option<bool>> {
        (self.hook)(&self.inner, Op::Delete, path)?;
        self.inner.delete_if(path, id, filters)
    }

    fn list(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        self.inner.list(path)
    }

    fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        apply: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<Value>> {
        (self.hook)(&self.inner, Op::Update, path)?;
        self.inner.update(path, id, apply)
    }

    fn insert_unless_exists(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        id: &str,
        doc: Value,
    ) -> Result<bool> {
        (self.hook)(&self.inner, Op::Insert, path)?;
        self.inner.insert_unless_exists(path, filters, id, doc)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.subscribe()
    }
}
