//! # Repositories
//!
//! One generic repository serves all eleven collections. Collections with
//! extra rules add a workflow repository next to it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository<T>          create / update / delete / archive / restore    │
//! │                         bulk_* / list / get / require / migrate         │
//! │        │                                                                │
//! │        │ WriteHook::prepare   fill line snapshots, check references     │
//! │        │ WriteHook::on_write  extra writes in the same batch            │
//! │        ▼                                                                │
//! │  StoreBackend::commit(batch)                                            │
//! │                                                                         │
//! │  PurchaseOrderRepository   submit, approve, ..., receive                │
//! │  SalesOrderRepository      confirm, ship, deliver, cancel               │
//! │  FulfilmentRepository      order and shipment status changes            │
//! │  PaymentRepository         record a payment, recompute balances         │
//! │  CashRepository            account balances                             │
//! │  UserRepository            passwords, last-admin rule                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cash;
pub mod fulfilment;
pub mod hooks;
pub mod payment;
pub mod purchase_order;
pub mod sales_order;
pub mod user;

use chrono::Utc;
use depot_core::bulk::dedup_ids;
use depot_core::entity::generate_id;
use depot_core::{BulkOutcome, CoreError, Entity};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::backend::{Batch, DocumentBackend, StoreBackend};
use crate::error::{StoreError, StoreResult};

pub use cash::CashRepository;
pub use fulfilment::FulfilmentRepository;
pub use hooks::{Change, WriteHook};
pub use payment::PaymentRepository;
pub use purchase_order::PurchaseOrderRepository;
pub use sales_order::{Dispatch, SalesOrderRepository};
pub use user::UserRepository;

/// Which bulk mutation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkAction {
    Archive,
    Restore,
    Delete,
}

/// Generic CRUD over one collection.
///
/// ## Usage
/// ```rust,ignore
/// let suppliers = warehouse.repo::<Supplier>();
/// let acme = suppliers.create(Supplier::new("Acme")).await?;
/// let outcome = suppliers.bulk_archive(&[acme.record.id.clone()]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Repository<T> {
    backend: StoreBackend,
    _entity: PhantomData<fn() -> T>,
}

impl<T: WriteHook> Repository<T> {
    pub fn new(backend: StoreBackend) -> Self {
        Repository {
            backend,
            _entity: PhantomData,
        }
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }

    /// Upgrades and deserializes one stored document.
    pub(crate) fn decode(mut doc: Value) -> StoreResult<T> {
        T::migrate(&mut doc);
        Ok(serde_json::from_value(doc)?)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Every record, oldest first. Archived records only when asked for.
    pub async fn list(&self, include_archived: bool) -> StoreResult<Vec<T>> {
        let docs = self.backend.load_collection(T::COLLECTION).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let record = Self::decode(doc)?;
            if include_archived || !record.is_archived() {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            a.record()
                .created_at
                .cmp(&b.record().created_at)
                .then_with(|| a.id().cmp(b.id()))
        });

        debug!(collection = %T::COLLECTION, count = records.len(), "Listed records");
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        self.backend
            .get(T::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Like [`get`](Self::get), but a missing record is an error.
    pub async fn require(&self, id: &str) -> StoreResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::LABEL, id))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Stores a new record. An empty id is generated; timestamps and the
    /// initial workflow state are set here regardless of what the caller
    /// sent.
    pub async fn create(&self, mut entity: T) -> StoreResult<T> {
        entity.reset_for_create();
        if entity.id().trim().is_empty() {
            entity.record_mut().id = generate_id();
        }
        if self.get(entity.id()).await?.is_some() {
            return Err(StoreError::duplicate("id", entity.id()));
        }

        let now = Utc::now();
        let record = entity.record_mut();
        record.archived = false;
        record.created_at = now;
        record.updated_at = now;

        self.write(None, entity).await
    }

    /// Replaces a stored record with an edited version.
    pub async fn update(&self, incoming: T) -> StoreResult<T> {
        let stored = self.require(incoming.id()).await?;
        if stored.is_archived() {
            return Err(archived(&stored).into());
        }

        let mut merged = stored.merge_update(incoming)?;
        *merged.record_mut() = stored.record().clone();
        merged.touch();

        self.write(Some(&stored), merged).await
    }

    /// Writes a record a workflow has already changed; the caller has done
    /// its own checks. Extra writes (stock movements) join the same batch.
    pub(crate) async fn save_with(&self, before: &T, mut entity: T, mut batch: Batch) -> StoreResult<T> {
        entity.normalize();
        entity.validate()?;
        T::on_write(&self.backend, Change::Upsert { before: Some(before), after: &entity }, &mut batch)
            .await?;
        batch.put_entity(&entity)?;
        self.backend.commit(batch).await?;
        Ok(entity)
    }

    async fn write(&self, before: Option<&T>, mut entity: T) -> StoreResult<T> {
        T::prepare(&self.backend, &mut entity).await?;
        entity.normalize();
        entity.validate()?;
        self.ensure_unique(&entity).await?;

        let mut batch = Batch::new();
        T::on_write(&self.backend, Change::Upsert { before, after: &entity }, &mut batch).await?;
        batch.put_entity(&entity)?;
        self.backend.commit(batch).await?;

        debug!(collection = %T::COLLECTION, id = %entity.id(), "Record written");
        Ok(entity)
    }

    async fn ensure_unique(&self, entity: &T) -> StoreResult<()> {
        let Some((field, key)) = entity.unique_key() else {
            return Ok(());
        };
        let clash = self
            .list(true)
            .await?
            .into_iter()
            .any(|other| other.id() != entity.id() && other.unique_key().is_some_and(|(_, k)| k == key));
        if clash {
            return Err(StoreError::duplicate(field, key));
        }
        Ok(())
    }

    /// Removes a record for good.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let stored = self.require(id).await?;

        let mut batch = Batch::new();
        T::on_write(&self.backend, Change::Delete { before: &stored }, &mut batch).await?;
        batch.delete(T::COLLECTION, id);
        self.backend.commit(batch).await?;

        debug!(collection = %T::COLLECTION, id = %id, "Record deleted");
        Ok(())
    }

    /// Soft delete: hidden from lists, kept in the store.
    pub async fn archive(&self, id: &str) -> StoreResult<T> {
        self.set_archived(id, true).await
    }

    pub async fn restore(&self, id: &str) -> StoreResult<T> {
        self.set_archived(id, false).await
    }

    async fn set_archived(&self, id: &str, archived_flag: bool) -> StoreResult<T> {
        let stored = self.require(id).await?;
        if stored.is_archived() == archived_flag {
            let reason = if archived_flag {
                "record is already archived"
            } else {
                "record is not archived"
            };
            return Err(CoreError::invalid_state(T::LABEL, id, reason).into());
        }

        let mut entity = stored.clone();
        entity.record_mut().archived = archived_flag;
        entity.touch();

        let mut batch = Batch::new();
        T::on_write(&self.backend, Change::Upsert { before: Some(&stored), after: &entity }, &mut batch)
            .await?;
        batch.put_entity(&entity)?;
        self.backend.commit(batch).await?;

        debug!(collection = %T::COLLECTION, id = %id, archived = archived_flag, "Archive flag changed");
        Ok(entity)
    }

    // -------------------------------------------------------------------------
    // Bulk
    // -------------------------------------------------------------------------

    pub async fn bulk_archive(&self, ids: &[String]) -> StoreResult<BulkOutcome> {
        self.bulk(ids, BulkAction::Archive).await
    }

    pub async fn bulk_restore(&self, ids: &[String]) -> StoreResult<BulkOutcome> {
        self.bulk(ids, BulkAction::Restore).await
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> StoreResult<BulkOutcome> {
        self.bulk(ids, BulkAction::Delete).await
    }

    async fn bulk(&self, ids: &[String], action: BulkAction) -> StoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new();
        for id in dedup_ids(ids) {
            let result = match action {
                BulkAction::Archive => self.archive(&id).await.map(drop),
                BulkAction::Restore => self.restore(&id).await.map(drop),
                BulkAction::Delete => self.delete(&id).await,
            };
            if let Err(e) = &result {
                warn!(collection = %T::COLLECTION, id = %id, error = %e, ?action, "Bulk item failed");
            }
            outcome.record(&id, result);
        }
        debug!(
            collection = %T::COLLECTION,
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            "Bulk operation finished"
        );
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Migration
    // -------------------------------------------------------------------------

    /// Rewrites every stored document its migration function changes.
    /// Returns how many were rewritten.
    pub async fn migrate(&self) -> StoreResult<usize> {
        let docs = self.backend.load_collection(T::COLLECTION).await?;
        let mut batch = Batch::new();
        for mut doc in docs {
            if !T::migrate(&mut doc) {
                continue;
            }
            let entity: T = serde_json::from_value(doc)?;
            batch.put_entity(&entity)?;
        }

        let rewritten = batch.len();
        self.backend.commit(batch).await?;
        Ok(rewritten)
    }
}

pub(crate) fn archived<T: Entity>(entity: &T) -> CoreError {
    CoreError::invalid_state(T::LABEL, entity.id(), "record is archived")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use depot_core::{Category, InventoryItem, Record, Supplier};
    use serde_json::json;

    fn repo<T: WriteHook>() -> Repository<T> {
        Repository::new(StoreBackend::Memory(MemoryBackend::ephemeral()))
    }

    fn category(name: &str) -> Category {
        Category {
            record: Record::new(),
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let suppliers = repo::<Supplier>();
        let mut acme = Supplier::new("Acme");
        acme.record.id = String::new();

        let created = suppliers.create(acme).await.unwrap();
        assert_eq!(created.id().len(), 36);

        let mut edit = created.clone();
        edit.email = Some("orders@acme.test".to_string());
        let updated = suppliers.update(edit).await.unwrap();
        assert_eq!(updated.record.created_at, created.record.created_at);
        assert!(updated.record.updated_at >= created.record.updated_at);

        let fetched = suppliers.require(created.id()).await.unwrap();
        assert_eq!(fetched.email.as_deref(), Some("orders@acme.test"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_and_duplicate_id() {
        let suppliers = repo::<Supplier>();
        let err = suppliers.create(Supplier::new("  ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));

        let acme = suppliers.create(Supplier::new("Acme")).await.unwrap();
        let err = suppliers.create(acme).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_unique_key_is_case_insensitive() {
        let categories = repo::<Category>();
        categories.create(category("Packaging")).await.unwrap();
        let err = categories.create(category(" packaging ")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let suppliers = repo::<Supplier>();
        let err = suppliers.update(Supplier::new("Ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_archive_restore_and_list() {
        let categories = repo::<Category>();
        let a = categories.create(category("A")).await.unwrap();
        let b = categories.create(category("B")).await.unwrap();

        categories.archive(a.id()).await.unwrap();
        let err = categories.archive(a.id()).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidState { .. })));

        let live = categories.list(false).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), b.id());
        assert_eq!(categories.list(true).await.unwrap().len(), 2);

        let err = categories.update(a.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidState { .. })));

        categories.restore(a.id()).await.unwrap();
        assert!(categories.restore(a.id()).await.is_err());
        assert_eq!(categories.list(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_sorted_by_created_at() {
        let categories = repo::<Category>();
        let first = categories.create(category("First")).await.unwrap();
        let second = categories.create(category("Second")).await.unwrap();
        let ids: Vec<_> = categories
            .list(false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.record.id)
            .collect();
        assert_eq!(ids, vec![first.record.id, second.record.id]);
    }

    #[tokio::test]
    async fn test_bulk_tally_and_dedup() {
        let categories = repo::<Category>();
        let a = categories.create(category("A")).await.unwrap();
        let b = categories.create(category("B")).await.unwrap();
        categories.archive(b.id()).await.unwrap();

        let ids = vec![
            a.record.id.clone(),
            a.record.id.clone(),
            b.record.id.clone(),
            "missing".to_string(),
        ];
        let outcome = categories.bulk_archive(&ids).await.unwrap();
        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.succeeded, vec![a.record.id.clone()]);
        assert_eq!(outcome.failure_count(), 2);

        let outcome = categories.bulk_delete(&ids).await.unwrap();
        assert_eq!(outcome.success_count(), 2);
        assert!(categories.list(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_documents_are_upgraded_on_read_and_by_migrate() {
        let backend = StoreBackend::Memory(MemoryBackend::ephemeral());
        backend
            .put(
                depot_core::Collection::Inventory,
                "legacy-1",
                json!({ "sku": "OLD-1", "name": "Old item", "quantity": 3, "reorderLevel": 10 }),
            )
            .await
            .unwrap();

        let items = Repository::<InventoryItem>::new(backend.clone());
        let item = items.require("legacy-1").await.unwrap();
        assert_eq!(item.quantity_purchased, 10);
        assert_eq!(item.quantity_sold, 7);
        assert!(!item.record.archived);

        assert_eq!(items.migrate().await.unwrap(), 1);
        assert_eq!(items.migrate().await.unwrap(), 0);
    }
}
