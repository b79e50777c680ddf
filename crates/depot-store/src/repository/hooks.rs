//! Per-entity extensions to the generic write path.
//!
//! `prepare` runs before validation and may complete the record (copy SKU
//! and name onto order lines) or reject dangling references. `on_write`
//! runs once the write is decided and may add further writes to the same
//! batch (a payment rewrites its order's balance).

use depot_core::{Category, CashTransaction, Customer, Entity, InventoryItem, Supplier};
use std::future::Future;

use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::StoreResult;

/// The write a hook is asked about.
#[derive(Debug)]
pub enum Change<'a, T> {
    /// Create (`before` is `None`), update, archive or restore.
    Upsert { before: Option<&'a T>, after: &'a T },
    Delete { before: &'a T },
}

impl<T> Clone for Change<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Change<'_, T> {}

impl<'a, T> Change<'a, T> {
    pub fn before(&self) -> Option<&'a T> {
        match *self {
            Change::Upsert { before, .. } => before,
            Change::Delete { before } => Some(before),
        }
    }

    pub fn after(&self) -> Option<&'a T> {
        match *self {
            Change::Upsert { after, .. } => Some(after),
            Change::Delete { .. } => None,
        }
    }
}

pub trait WriteHook: Entity {
    fn prepare(
        backend: &StoreBackend,
        entity: &mut Self,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let _ = (backend, entity);
        async { Ok(()) }
    }

    fn on_write(
        backend: &StoreBackend,
        change: Change<'_, Self>,
        batch: &mut Batch,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let _ = (backend, change, batch);
        async { Ok(()) }
    }
}

/// Fails unless `id` names an existing record of `T`.
pub(crate) async fn ensure_exists<T: WriteHook>(backend: &StoreBackend, id: &str) -> StoreResult<T> {
    Repository::<T>::new(backend.clone()).require(id).await
}

impl WriteHook for Category {}
impl WriteHook for Supplier {}
impl WriteHook for Customer {}
impl WriteHook for CashTransaction {}

impl WriteHook for InventoryItem {
    async fn prepare(backend: &StoreBackend, item: &mut Self) -> StoreResult<()> {
        if let Some(category_id) = item.category_id.as_deref().filter(|id| !id.is_empty()) {
            ensure_exists::<Category>(backend, category_id).await?;
        }
        if let Some(supplier_id) = item.supplier_id.as_deref().filter(|id| !id.is_empty()) {
            ensure_exists::<Supplier>(backend, supplier_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_item_references_must_exist() {
        let backend = StoreBackend::Memory(MemoryBackend::ephemeral());
        let items = Repository::<InventoryItem>::new(backend.clone());

        let mut item = InventoryItem::new("PAL-001", "Euro pallet");
        item.category_id = Some("nope".to_string());
        let err = items.create(item.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let supplier = Repository::<Supplier>::new(backend)
            .create(Supplier::new("Acme"))
            .await
            .unwrap();
        item.category_id = None;
        item.supplier_id = Some(supplier.record.id);
        assert!(items.create(item).await.is_ok());
    }
}
