//! # Mock Store
//!
//! Every collection lives in memory. When opened with a snapshot path the
//! whole store is read from a JSON file at startup and written back after
//! every mutation, much like a browser app mirroring its state into
//! local storage.
//!
//! ## Snapshot Layout
//! ```text
//! {
//!   "inventory":      { "<id>": { ...document... }, ... },
//!   "purchaseOrders": { "<id>": { ... } },
//!   ...
//! }
//! ```
//!
//! The file is replaced atomically: the new content goes to a sibling
//! temp file which is then renamed over the old one.

use depot_core::Collection;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{with_id, Batch, ChangeEvent, DocumentBackend, WriteOp, CHANGE_CHANNEL_CAPACITY};
use crate::error::StoreResult;

type Collections = HashMap<Collection, BTreeMap<String, Value>>;

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    data: RwLock<Collections>,
    snapshot: Option<PathBuf>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryBackend {
    fn with_data(data: Collections, snapshot: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        MemoryBackend {
            inner: Arc::new(Inner {
                data: RwLock::new(data),
                snapshot,
                changes,
            }),
        }
    }

    /// A store that keeps nothing on disk.
    pub fn ephemeral() -> Self {
        Self::with_data(HashMap::new(), None)
    }

    /// Opens a store backed by a snapshot file. A missing file is an empty
    /// store; the file is created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => parse_snapshot(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No snapshot yet, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        let documents: usize = data.values().map(BTreeMap::len).sum();
        info!(path = %path.display(), documents, "Mock store loaded");

        Ok(Self::with_data(data, Some(path)))
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.inner.snapshot.as_deref()
    }
}

fn parse_snapshot(bytes: &[u8]) -> StoreResult<Collections> {
    let raw: HashMap<String, BTreeMap<String, Value>> = serde_json::from_slice(bytes)?;
    let mut data = HashMap::new();
    for (name, docs) in raw {
        match name.parse::<Collection>() {
            Ok(collection) => {
                data.insert(collection, docs);
            }
            Err(_) => warn!(collection = %name, "Ignoring unknown collection in snapshot"),
        }
    }
    Ok(data)
}

async fn write_snapshot(path: &Path, data: &Collections) -> StoreResult<()> {
    let named: BTreeMap<&str, &BTreeMap<String, Value>> =
        data.iter().map(|(c, docs)| (c.as_str(), docs)).collect();
    let bytes = serde_json::to_vec_pretty(&named)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), bytes = bytes.len(), "Snapshot written");
    Ok(())
}

impl DocumentBackend for MemoryBackend {
    async fn load_collection(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let data = self.inner.data.read().await;
        Ok(data
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| with_id(id, doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let data = self.inner.data.read().await;
        Ok(data
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| with_id(id, doc.clone())))
    }

    async fn commit(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let changes = batch.changes();

        let mut data = self.inner.data.write().await;
        let mut next = data.clone();
        for op in batch.ops {
            match op {
                WriteOp::Put { collection, id, doc } => {
                    next.entry(collection).or_default().insert(id, doc);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = next.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }

        // Disk first: a failed snapshot leaves memory untouched too.
        if let Some(path) = &self.inner.snapshot {
            write_snapshot(path, &next).await?;
        }
        *data = next;
        drop(data);

        for change in changes {
            let _ = self.inner.changes.send(change);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChangeKind;
    use serde_json::json;

    fn temp_snapshot() -> PathBuf {
        std::env::temp_dir()
            .join(format!("depot-{}", uuid::Uuid::new_v4()))
            .join("store.json")
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBackend::ephemeral();
        store
            .put(Collection::Suppliers, "s1", json!({ "name": "Acme" }))
            .await
            .unwrap();

        let doc = store.get(Collection::Suppliers, "s1").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Acme");
        assert_eq!(doc["id"], "s1");

        store.delete(Collection::Suppliers, "s1").await.unwrap();
        assert!(store.get(Collection::Suppliers, "s1").await.unwrap().is_none());
        assert!(store.load_collection(Collection::Suppliers).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let path = temp_snapshot();
        {
            let store = MemoryBackend::open(&path).await.unwrap();
            let mut batch = Batch::new();
            batch
                .put(Collection::Inventory, "i1", json!({ "id": "i1", "sku": "A" }))
                .put(Collection::Categories, "c1", json!({ "id": "c1", "name": "Tools" }));
            store.commit(batch).await.unwrap();
        }

        let reopened = MemoryBackend::open(&path).await.unwrap();
        let items = reopened.load_collection(Collection::Inventory).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["sku"], "A");

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["categories"]["c1"].is_object());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let store = MemoryBackend::open(temp_snapshot()).await.unwrap();
        assert!(store.load_collection(Collection::Users).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryBackend::ephemeral();
        let mut rx = store.subscribe();

        let mut batch = Batch::new();
        batch
            .put(Collection::Orders, "o1", json!({}))
            .delete(Collection::Orders, "o0");
        store.commit(batch).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Upserted);
        assert_eq!(first.id, "o1");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, ChangeKind::Deleted);
    }
}
