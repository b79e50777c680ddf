//! # SQLite Document Store
//!
//! Documents are stored whole as JSON text, one row per document, keyed by
//! `(collection, id)`. A batch is one transaction.

use chrono::Utc;
use depot_core::Collection;
use serde_json::Value;
use sqlx::Row;
use tokio::sync::broadcast;
use tracing::debug;

use super::{with_id, Batch, ChangeEvent, DocumentBackend, WriteOp, CHANGE_CHANNEL_CAPACITY};
use crate::error::StoreResult;
use crate::pool::{Database, DbConfig};

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    db: Database,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteBackend {
    pub async fn open(config: DbConfig) -> StoreResult<Self> {
        let db = Database::new(config).await?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        SqliteBackend { db, changes }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn parse_body(id: &str, body: &str) -> StoreResult<Value> {
    Ok(with_id(id, serde_json::from_str(body)?))
}

impl DocumentBackend for SqliteBackend {
    async fn load_collection(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ?1")
            .bind(collection.as_str())
            .fetch_all(self.db.pool())
            .await?;

        debug!(collection = %collection, count = rows.len(), "Loaded collection");

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let body: String = row.try_get("body")?;
                parse_body(&id, &body)
            })
            .collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        body.map(|body| parse_body(id, &body)).transpose()
    }

    async fn commit(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let changes = batch.changes();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.db.pool().begin().await?;
        for op in &batch.ops {
            match op {
                WriteOp::Put { collection, id, doc } => {
                    let body = serde_json::to_string(doc)?;
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, body, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(id)
                    .bind(body)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
                        .bind(collection.as_str())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        debug!(ops = batch.len(), "Batch committed");

        for change in changes {
            let _ = self.changes.send(change);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
