// One row per leaf, keyed by full path. `path > 'p/' AND path < 'p0'` selects
// the descendants of `p` in index order.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::SqliteConnection;

use super::document::{Document, DocumentSnapshot, DocumentStore, Filter, OrderBy, apply_query, merge_into};
use super::push_id::PushIdGenerator;
use super::realtime::{
    ChildCallback, RealtimeStore, ValueCallback, flatten, join_path, set_at, split_path,
    validate_path, value_at,
};
use super::watchers::{WatcherRegistry, spawn_child_added, spawn_value};
use super::{StoreResult, Subscription};
use crate::database::DbPool;

fn canonical(path: &str) -> String {
    split_path(path).join("/")
}

#[derive(Clone)]
pub struct SqliteRealtimeStore {
    pool: DbPool,
    watchers: Arc<WatcherRegistry>,
    push_ids: Arc<PushIdGenerator>,
}

impl SqliteRealtimeStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            watchers: Arc::new(WatcherRegistry::default()),
            push_ids: Arc::new(PushIdGenerator::new()),
        }
    }

    async fn apply(&self, path: &str, changes: Vec<(String, Value)>) -> StoreResult<()> {
        validate_path(path)?;
        for (relative, _) in &changes {
            validate_path(relative)?;
        }

        let mut tx = self.pool.begin().await?;
        for (relative, value) in changes {
            write_node(&mut *tx, &join_path(path, &relative), &value).await?;
        }
        tx.commit().await?;

        self.watchers.notify(path);
        Ok(())
    }
}

async fn write_node(conn: &mut SqliteConnection, path: &str, value: &Value) -> StoreResult<()> {
    let path = canonical(path);

    if path.is_empty() {
        sqlx::query("DELETE FROM rt_nodes").execute(&mut *conn).await?;
    } else {
        sqlx::query("DELETE FROM rt_nodes WHERE path = ?1 OR (path > ?2 AND path < ?3)")
            .bind(&path)
            .bind(format!("{}/", path))
            .bind(format!("{}0", path))
            .execute(&mut *conn)
            .await?;

        // A leaf sitting on an ancestor would shadow the new subtree.
        let segments = split_path(&path);
        for depth in 1..segments.len() {
            sqlx::query("DELETE FROM rt_nodes WHERE path = ?")
                .bind(segments[..depth].join("/"))
                .execute(&mut *conn)
                .await?;
        }
    }

    let mut rows = Vec::new();
    flatten(&path, value, &mut rows);
    for (leaf_path, json) in rows {
        sqlx::query("INSERT INTO rt_nodes (path, value) VALUES (?, ?)")
            .bind(&leaf_path)
            .bind(&json)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl RealtimeStore for SqliteRealtimeStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        validate_path(path)?;
        let path = canonical(path);

        let rows: Vec<(String, String)> = if path.is_empty() {
            sqlx::query_as("SELECT path, value FROM rt_nodes")
                .fetch_all(self.pool.as_ref())
                .await?
        } else {
            sqlx::query_as(
                "SELECT path, value FROM rt_nodes WHERE path = ?1 OR (path > ?2 AND path < ?3)",
            )
            .bind(&path)
            .bind(format!("{}/", path))
            .bind(format!("{}0", path))
            .fetch_all(self.pool.as_ref())
            .await?
        };

        let mut root = Value::Object(Map::new());
        for (leaf_path, json) in rows {
            let value: Value = serde_json::from_str(&json)?;
            set_at(&mut root, &split_path(&leaf_path), value);
        }
        Ok(value_at(&root, &split_path(&path)).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        self.apply(path, vec![(String::new(), value)]).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.apply(path, fields.into_iter().collect()).await
    }

    async fn push(&self, path: &str, value: Value) -> StoreResult<String> {
        let id = self.push_ids.next_id();
        self.apply(path, vec![(id.clone(), value)]).await?;
        Ok(id)
    }

    async fn subscribe_child_added(
        &self,
        path: &str,
        callback: ChildCallback,
    ) -> StoreResult<Subscription> {
        validate_path(path)?;
        let wakeups = self.watchers.register(path);
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
        let wakeups = self.watchers.register(path);
        Ok(spawn_value(self.clone(), path.to_string(), wakeups, callback))
    }
}

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: DbPool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        row.map(|(data,)| serde_json::from_str(&data).map_err(Into::into))
            .transpose()
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let mut document = Document::new();
        if merge {
            let existing: Option<(String,)> =
                sqlx::query_as("SELECT data FROM documents WHERE collection = ? AND id = ?")
                    .bind(collection)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some((data,)) = existing {
                document = serde_json::from_str(&data)?;
            }
        }
        merge_into(&mut document, fields);

        sqlx::query(
            "INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data",
        )
        .bind(collection)
        .bind(id)
        .bind(serde_json::to_string(&document)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> StoreResult<Vec<DocumentSnapshot>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ? ORDER BY id")
                .bind(collection)
                .fetch_all(self.pool.as_ref())
                .await?;

        let docs = rows
            .into_iter()
            .map(|(id, data)| {
                Ok(DocumentSnapshot {
                    id,
                    data: serde_json::from_str(&data)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(apply_query(docs, filters, order_by))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_pool;
    use crate::store::Filter;
    use serde_json::json;

    async fn stores() -> (SqliteRealtimeStore, SqliteDocumentStore) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        (
            SqliteRealtimeStore::new(pool.clone()),
            SqliteDocumentStore::new(pool),
        )
    }

    #[tokio::test]
    async fn tree_round_trips_through_rows() {
        let (realtime, _) = stores().await;
        let channel = json!({"members": {"u1": true, "u2": true}, "createdAt": 42});
        realtime.write("channels/u1_u2", channel.clone()).await.unwrap();

        assert_eq!(realtime.read("channels/u1_u2").await.unwrap(), Some(channel));
        assert_eq!(
            realtime.read("channels/u1_u2/members/u1").await.unwrap(),
            Some(json!(true))
        );
        assert_eq!(realtime.read("channels/u1_u").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_replaces_subtree() {
        let (realtime, _) = stores().await;
        realtime
            .write("channels/x", json!({"members": {"a": true}, "createdAt": 1}))
            .await
            .unwrap();
        realtime
            .write("channels/x", json!({"createdAt": 2}))
            .await
            .unwrap();
        assert_eq!(
            realtime.read("channels/x").await.unwrap(),
            Some(json!({"createdAt": 2}))
        );
    }

    #[tokio::test]
    async fn update_and_push_merge() {
        let (realtime, _) = stores().await;
        realtime
            .write("channels/x", json!({"members": {"a": true}}))
            .await
            .unwrap();
        let mut fields = Map::new();
        fields.insert("members/b".to_string(), json!(true));
        realtime.update("channels/x", fields).await.unwrap();
        let id = realtime
            .push("channels/x/messages", json!({"text": "hi"}))
            .await
            .unwrap();

        let channel = realtime.read("channels/x").await.unwrap().unwrap();
        assert_eq!(channel["members"], json!({"a": true, "b": true}));
        assert_eq!(channel["messages"][&id]["text"], json!("hi"));
    }

    #[tokio::test]
    async fn documents_support_merge_and_query() {
        let (_, documents) = stores().await;
        let profile = json!({"name": "Kim", "email": "kim@example.com"});
        documents
            .put("users", "u1", profile.as_object().cloned().unwrap(), false)
            .await
            .unwrap();
        let patch = json!({"photoURL": "https://example.com/k.png"});
        documents
            .put("users", "u1", patch.as_object().cloned().unwrap(), true)
            .await
            .unwrap();

        let doc = documents.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["name"], json!("Kim"));
        assert_eq!(doc["photoURL"], json!("https://example.com/k.png"));

        let found = documents
            .query("users", &[Filter::eq("email", "kim@example.com")], None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
    }
}
