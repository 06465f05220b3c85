//! Persistent document store using RocksDB.
//!
//! Keys are `collection/id` (e.g. `groups/g1/votes/v1`), values are JSON.
//! Listing a collection walks the key prefix and skips documents of nested
//! subcollections.

use super::{
    change_feed, lock, matches_all, publish, ChangeEvent, ChangeKind, CollectionPath, Document,
    DocumentStore, Filter,
};
use crate::error::Result;
use rocksdb::{Options, DB};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// RocksDB-backed document store.
pub struct RocksStore {
    db: DB,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl RocksStore {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
            changes: change_feed(),
        })
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, doc: &Value) -> Result<()> {
        let value = serde_json::to_vec(doc)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }
}

impl DocumentStore for RocksStore {
    fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<Value>> {
        self.read(&path.doc_key(id)?)
    }

    fn put(&self, path: &CollectionPath, id: &str, doc: Value) -> Result<()> {
        let key = path.doc_key(id)?;
        {
            let _guard = lock(&self.write_lock)?;
            self.write(&key, &doc)?;
        }
        tracing::debug!("put {}", key);
        publish(&self.changes, path, id, ChangeKind::Put);
        Ok(())
    }

    fn delete(&self, path: &CollectionPath, id: &str) -> Result<bool> {
        let key = path.doc_key(id)?;
        let existed = {
            let _guard = lock(&self.write_lock)?;
            let existed = self.db.get(key.as_bytes())?.is_some();
            if existed {
                self.db.delete(key.as_bytes())?;
            }
            existed
        };
        if existed {
            tracing::debug!("delete {}", key);
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
        let key = path.doc_key(id)?;
        let matched = {
            let _guard = lock(&self.write_lock)?;
            let Some(existing) = self.read(&key)? else {
                return Ok(None);
            };
            let matched = matches_all(filters, &existing);
            if matched {
                self.db.delete(key.as_bytes())?;
            }
            matched
        };
        if matched {
            tracing::debug!("delete {}", key);
            publish(&self.changes, path, id, ChangeKind::Delete);
        }
        Ok(Some(matched))
    }

    fn list(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        let prefix = path.prefix();
        let mut docs = Vec::new();

        let iter = self.db.prefix_iterator(prefix.as_bytes());
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            if id.contains('/') {
                // document of a nested subcollection
                continue;
            }
            docs.push(Document {
                id,
                data: serde_json::from_slice(&value)?,
            });
        }

        Ok(docs)
    }

    fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        apply: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<Option<Value>> {
        let key = path.doc_key(id)?;
        let next = {
            let _guard = lock(&self.write_lock)?;
            let Some(mut next) = self.read(&key)? else {
                return Ok(None);
            };
            apply(&mut next)?;
            self.write(&key, &next)?;
            next
        };
        tracing::debug!("update {}", key);
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
        let key = path.doc_key(id)?;
        {
            let _guard = lock(&self.write_lock)?;
            if self
                .list(path)?
                .iter()
                .any(|existing| matches_all(filters, &existing.data))
            {
                return Ok(false);
            }
            self.write(&key, &doc)?;
        }
        tracing::debug!("insert {}", key);
        publish(&self.changes, path, id, ChangeKind::Put);
        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
