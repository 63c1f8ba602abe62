use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::document::{Document, DocumentSnapshot, DocumentStore, Filter, OrderBy, apply_query, merge_into};
use super::push_id::PushIdGenerator;
use super::realtime::{
    ChildCallback, RealtimeStore, ValueCallback, join_path, set_at, split_path, validate_path,
    value_at,
};
use super::watchers::{WatcherRegistry, spawn_child_added, spawn_value};
use super::{StoreResult, Subscription};

#[derive(Default)]
struct RealtimeInner {
    root: RwLock<Value>,
    watchers: WatcherRegistry,
    push_ids: PushIdGenerator,
    writes: AtomicU64,
}

#[derive(Clone, Default)]
pub struct MemoryRealtimeStore {
    inner: Arc<RealtimeInner>,
}

impl MemoryRealtimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    async fn apply(&self, path: &str, changes: Vec<(String, Value)>) -> StoreResult<()> {
        validate_path(path)?;
        for (relative, _) in &changes {
            validate_path(relative)?;
        }
        {
            let mut root = self.inner.root.write().await;
            for (relative, value) in changes {
                let full = join_path(path, &relative);
                set_at(&mut root, &split_path(&full), value);
            }
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.watchers.notify(path);
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryRealtimeStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        validate_path(path)?;
        let root = self.inner.root.read().await;
        Ok(value_at(&root, &split_path(path)).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        self.apply(path, vec![(String::new(), value)]).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.apply(path, fields.into_iter().collect()).await
    }

    async fn push(&self, path: &str, value: Value) -> StoreResult<String> {
        let id = self.inner.push_ids.next_id();
        self.apply(path, vec![(id.clone(), value)]).await?;
        Ok(id)
    }

    async fn subscribe_child_added(
        &self,
        path: &str,
        callback: ChildCallback,
    ) -> StoreResult<Subscription> {
        validate_path(path)?;
        let wakeups = self.inner.watchers.register(path);
        Ok(spawn_child_added(
            self.clone(),
            path.to_string(),
            wakeups,
            callback,
        ))
    }

    async fn subscribe_value(
        &self,
        path: &str,
        callback: ValueCallback,
    ) -> StoreResult<Subscription> {
        validate_path(path)?;
        let wakeups = self.inner.watchers.register(path);
        Ok(spawn_value(self.clone(), path.to_string(), wakeups, callback))
    }
}

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => merge_into(existing, fields),
            _ => {
                docs.insert(id.to_string(), fields);
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentSnapshot>> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| DocumentSnapshot {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(apply_query(docs, filters, order_by))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}
