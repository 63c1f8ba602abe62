pub mod document;
pub mod memory;
pub mod push_id;
pub mod realtime;
pub mod sqlite;
pub mod subscription;
mod watchers;

use thiserror::Error;

pub use document::{Document, DocumentSnapshot, DocumentStore, Filter, FilterOp, OrderBy};
pub use memory::{MemoryDocumentStore, MemoryRealtimeStore};
pub use realtime::{ChildCallback, RealtimeStore, ValueCallback};
pub use sqlite::{SqliteDocumentStore, SqliteRealtimeStore};
pub use subscription::Subscription;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
