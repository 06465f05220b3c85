//! In-memory document store.

use super::{
    change_feed, lock, matches_all, publish, ChangeEvent, ChangeKind, CollectionPath, Document,
    DocumentStore, Filter,
};
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Document store held entirely in memory. Contents are lost on drop.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            changes: change_feed(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Value>> {
        let collections = lock(&self.collections)?;
        Ok(collections
            .get(path.as_str())
            .and_then(|c| c.get(id))
            .cloned())
    }

    fn put(&self, path: &CollectionPath, id: &str, doc: Value) -> Result<()> {
        path.doc_key(id)?;
        lock(&self.collections)?
            .entry(path.as_str().to_string())
            .or_default()
            .insert(id.to_string(), doc);
        publish(&self.changes, path, id, ChangeKind::Put);
        Ok(())
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool> {
        let existed = lock(&self.collections)?
            .get_mut(path.as_str())
            .and_then(|c| c.remove(id))
            .is_some();
        if existed {
            publish(&self.changes, path, id, ChangeKind::Delete);
        }
        Ok(existed)
    }

    fn delete_if(
        &self,
        path: &CollectionPath,
        id: &str,
        filters: &[Filter],
    ) -> Result<Option<bool>> {
        let mut collections = lock(&self.collections)?;
        let Some(collection) = collections.get_mut(path.as_str()) else {
            return Ok(None);
        };
        let matched = match collection.get(id) {
            Some(existing) => matches_all(filters, existing),
            None => return Ok(None),
        };
        if matched {
            collection.remove(id);
            drop(collections);
            publish(&self.changes, path, id, ChangeKind::Delete);
        }
        Ok(Some(matched))
    }

    fn list(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        let collections = lock(&self.collections)?;
        Ok(collections
            .get(path.as_str())
            .map(|c| {
                c.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        apply: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<Value>> {
        let mut collections = lock(&self.collections)?;
        let Some(current) = collections.get_mut(path.as_str()).and_then(|c| c.get_mut(id)) else {
            return Ok(None);
        };

        let mut next = current.clone();
        apply(&mut next)?;
        *current = next.clone();
        drop(collections);

        publish(&self.changes, path, id, ChangeKind::Put);
        Ok(Some(next))
    }

    fn insert_unless_exists(
        &self,
        path: &CollectionPath,
        filters: &[Filter],
        id: &str,
        doc: Value,
    ) -> Result<bool> {
        path.doc_key(id)?;
        let mut collections = lock(&self.collections)?;
        let collection = collections.entry(path.as_str().to_string()).or_default();
        if collection.values().any(|existing| matches_all(filters, existing)) {
            return Ok(false);
        }
        collection.insert(id.to_string(), doc);
        drop(collections);

        publish(&self.changes, path, id, ChangeKind::Put);
        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::{DocumentStoreExt, Subcollection};
    use serde_json::json;

    fn votes() -> CollectionPath {
        CollectionPath::group_sub("g1", Subcollection::Votes)
    }

    #[test]
    fn put_get_delete() {
        let store = MemoryStore::new();
        store.put(&votes(), "v1", json!({ "status": "pending" })).unwrap();
        assert_eq!(store.get(&votes(), "v1").unwrap(), Some(json!({ "status": "pending" })));
        assert!(store.delete(&votes(), "v1").unwrap());
        assert!(!store.delete(&votes(), "v1").unwrap());
        assert_eq!(store.get(&votes(), "v1").unwrap(), None);
    }

    #[test]
    fn conditional_delete() {
        let store = MemoryStore::new();
        store.put(&votes(), "v1", json!({ "status": "approved" })).unwrap();
        let pending = [Filter::eq("status", "pending")];

        assert_eq!(store.delete_if(&votes(), "v1", &pending).unwrap(), Some(false));
        assert_eq!(store.delete_if(&votes(), "v2", &pending).unwrap(), None);
        assert_eq!(store.delete_if(&votes(), "v1", &[]).unwrap(), Some(true));
        assert!(store.get(&votes(), "v1").unwrap().is_none());
    }

    #[test]
    fn collections_are_isolated() {
        let store = MemoryStore::new();
        store.put(&votes(), "v1", json!({})).unwrap();
        let other = CollectionPath::group_sub("g2", Subcollection::Votes);
        assert!(store.list(&other).unwrap().is_empty());
        assert_eq!(store.list(&votes()).unwrap().len(), 1);
    }

    #[test]
    fn failed_update_writes_nothing() {
        let store = MemoryStore::new();
        store.put(&votes(), "v1", json!({ "n": 1 })).unwrap();

        let result = store.update(&votes(), "v1", &mut |v: &mut Value| -> Result<()> {
            v["n"] = json!(2);
            Err(Error::DuplicateVote)
        });
        assert!(matches!(result, Err(Error::DuplicateVote)));
        assert_eq!(store.get(&votes(), "v1").unwrap(), Some(json!({ "n": 1 })));
    }

    #[test]
    fn update_missing_document() {
        let store = MemoryStore::new();
        let updated = store
            .update_as::<Value, (), _>(&votes(), "nope", |_| Ok(()))
            .unwrap();
        assert!(updated.is_none());
    }

    #[test]
    fn insert_unless_exists_respects_filters() {
        let store = MemoryStore::new();
        let filters = [Filter::eq("targetId", "t1"), Filter::eq("status", "pending")];
        let doc = json!({ "targetId": "t1", "status": "pending" });

        assert!(store.insert_unless_exists(&votes(), &filters, "v1", doc.clone()).unwrap());
        assert!(!store.insert_unless_exists(&votes(), &filters, "v2", doc).unwrap());
        assert_eq!(store.query(&votes(), &filters).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_updates_do_not_lose_writes() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        store.put(&votes(), "v1", json!({ "votes": [] })).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .update(&votes(), "v1", &mut |v: &mut Value| -> Result<()> {
                            if let Some(list) = v["votes"].as_array_mut() {
                                list.push(json!(format!("user{}", i)));
                            }
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = store.get(&votes(), "v1").unwrap().unwrap();
        assert_eq!(doc["votes"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn subscribers_see_writes() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.put(&votes(), "v1", json!({})).unwrap();
        store.delete(&votes(), "v1").unwrap();

        let first = rx.recv().await.unwrap();
        assert!(first.is_in(&votes()));
        assert_eq!(first.kind, ChangeKind::Put);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Delete);
    }
}
