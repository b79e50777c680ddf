//! # Document Backends
//!
//! Two interchangeable places to keep documents:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DocumentBackend                                  │
//! │                                                                         │
//! │   load_collection ── get ── put ── delete ── commit(batch) ── subscribe │
//! │                                                                         │
//! │   ┌──────────────────────────┐       ┌──────────────────────────────┐  │
//! │   │ MemoryBackend            │       │ SqliteBackend                │  │
//! │   │ HashMap in a RwLock,     │       │ documents(collection, id,    │  │
//! │   │ JSON snapshot file       │       │   body, updated_at)          │  │
//! │   │ rewritten per mutation   │       │ one transaction per batch    │  │
//! │   └──────────────────────────┘       └──────────────────────────────┘  │
//! │                                                                         │
//! │   Both publish a ChangeEvent per written document after the write      │
//! │   succeeds. Listeners (the server's change feed) subscribe here.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use depot_core::{Collection, Entity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::error::StoreResult;
use crate::pool::DbConfig;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Capacity of the change channel. Slow listeners that fall further behind
/// than this see a `Lagged` error and should reload.
pub const CHANGE_CHANNEL_CAPACITY: usize = 1024;

// =============================================================================
// Change Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// One document changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
    pub kind: ChangeKind,
}

// =============================================================================
// Batches
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        doc: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Put { collection, .. } | WriteOp::Delete { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }

    fn change(&self) -> ChangeEvent {
        ChangeEvent {
            collection: self.collection(),
            id: self.id().to_string(),
            kind: match self {
                WriteOp::Put { .. } => ChangeKind::Upserted,
                WriteOp::Delete { .. } => ChangeKind::Deleted,
            },
        }
    }
}

/// Writes that succeed or fail together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<WriteOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, collection: Collection, id: impl Into<String>, doc: Value) -> &mut Self {
        self.ops.push(WriteOp::Put {
            collection,
            id: id.into(),
            doc,
        });
        self
    }

    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection,
            id: id.into(),
        });
        self
    }

    /// Serializes an entity into a put.
    pub fn put_entity<T: Entity>(&mut self, entity: &T) -> StoreResult<&mut Self> {
        let doc = serde_json::to_value(entity)?;
        Ok(self.put(T::COLLECTION, entity.id(), doc))
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub(crate) fn changes(&self) -> Vec<ChangeEvent> {
        self.ops.iter().map(WriteOp::change).collect()
    }
}

/// Stored documents always carry their id, even if an old writer left it
/// out of the body.
pub(crate) fn with_id(id: &str, mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        if obj.get("id").and_then(Value::as_str).map_or(true, str::is_empty) {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
    }
    doc
}

// =============================================================================
// Backend Trait
// =============================================================================

/// A store of JSON documents grouped into collections.
pub trait DocumentBackend: Send + Sync {
    /// Every document in a collection, in no particular order.
    fn load_collection(
        &self,
        collection: Collection,
    ) -> impl Future<Output = StoreResult<Vec<Value>>> + Send;

    fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = StoreResult<Option<Value>>> + Send;

    /// Applies every op of the batch, or none of them.
    fn commit(&self, batch: Batch) -> impl Future<Output = StoreResult<()>> + Send;

    fn put(
        &self,
        collection: Collection,
        id: &str,
        doc: Value,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let mut batch = Batch::new();
        batch.put(collection, id, doc);
        self.commit(batch)
    }

    fn delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let mut batch = Batch::new();
        batch.delete(collection, id);
        self.commit(batch)
    }

    /// A receiver of every change committed from now on.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

// =============================================================================
// Runtime Selection
// =============================================================================

/// Which backend to open.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Mock store. `None` keeps nothing on disk.
    Memory { snapshot: Option<PathBuf> },
    /// SQLite document store.
    Sqlite(DbConfig),
}

/// The backend chosen at startup.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Memory(MemoryBackend),
    Sqlite(SqliteBackend),
}

impl StoreBackend {
    pub async fn open(config: BackendConfig) -> StoreResult<Self> {
        match config {
            BackendConfig::Memory { snapshot: Some(path) } => {
                Ok(StoreBackend::Memory(MemoryBackend::open(path).await?))
            }
            BackendConfig::Memory { snapshot: None } => {
                Ok(StoreBackend::Memory(MemoryBackend::ephemeral()))
            }
            BackendConfig::Sqlite(config) => {
                Ok(StoreBackend::Sqlite(SqliteBackend::open(config).await?))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Sqlite(_) => "sqlite",
        }
    }

    pub async fn health_check(&self) -> bool {
        match self {
            StoreBackend::Memory(_) => true,
            StoreBackend::Sqlite(b) => b.database().health_check().await,
        }
    }
}

/// One fresh store of each kind, for tests that must pass on both.
#[cfg(test)]
pub(crate) async fn test_backends() -> Vec<StoreBackend> {
    vec![
        StoreBackend::Memory(MemoryBackend::ephemeral()),
        StoreBackend::Sqlite(
            SqliteBackend::open(DbConfig::in_memory())
                .await
                .expect("in-memory sqlite"),
        ),
    ]
}

impl DocumentBackend for StoreBackend {
    async fn load_collection(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        match self {
            StoreBackend::Memory(b) => b.load_collection(collection).await,
            StoreBackend::Sqlite(b) => b.load_collection(collection).await,
        }
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        match self {
            StoreBackend::Memory(b) => b.get(collection, id).await,
            StoreBackend::Sqlite(b) => b.get(collection, id).await,
        }
    }

    async fn commit(&self, batch: Batch) -> StoreResult<()> {
        match self {
            StoreBackend::Memory(b) => b.commit(batch).await,
            StoreBackend::Sqlite(b) => b.commit(batch).await,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        match self {
            StoreBackend::Memory(b) => b.subscribe(),
            StoreBackend::Sqlite(b) => b.subscribe(),
        }
    }
}
