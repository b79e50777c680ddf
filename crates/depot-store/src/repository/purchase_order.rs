//! # Purchase Order Repository
//!
//! Status changes and goods receipts for purchase orders.
//!
//! ## Receiving Flow
//! ```text
//! receive(po_id, [(item, qty), ...])
//!      │
//!      ├── load PO, PurchaseOrder::receive ──► stock movements
//!      │        (rejects over-receipt, wrong status, unknown lines)
//!      ├── load every item moved, InventoryItem::receive
//!      ▼
//!  one batch: PO + items ──► commit ──► change events
//! ```

use depot_core::{
    BulkOutcome, CoreError, Entity, InventoryItem, LineQuantity, PurchaseOrder,
    PurchaseOrderStatus, Supplier, ValidationError,
};
use tracing::info;

use super::hooks::{ensure_exists, WriteHook};
use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::StoreResult;

impl WriteHook for PurchaseOrder {
    /// Checks the supplier and every line item exist, and snapshots SKU and
    /// name onto lines that carry none.
    async fn prepare(backend: &StoreBackend, po: &mut Self) -> StoreResult<()> {
        ensure_exists::<Supplier>(backend, &po.supplier_id).await?;
        for line in &mut po.lines {
            let item = ensure_exists::<InventoryItem>(backend, &line.item_id).await?;
            if line.sku.is_empty() || line.name.is_empty() {
                line.sku = item.sku;
                line.name = item.name;
                if line.unit_cost_cents == 0 {
                    line.unit_cost_cents = item.cost_price_cents;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    orders: Repository<PurchaseOrder>,
    items: Repository<InventoryItem>,
}

impl PurchaseOrderRepository {
    pub fn new(backend: StoreBackend) -> Self {
        PurchaseOrderRepository {
            orders: Repository::new(backend.clone()),
            items: Repository::new(backend),
        }
    }

    pub fn records(&self) -> &Repository<PurchaseOrder> {
        &self.orders
    }

    /// Loads a live order, applies `step` and saves the result.
    async fn apply<F>(&self, id: &str, step: F) -> StoreResult<PurchaseOrder>
    where
        F: FnOnce(&mut PurchaseOrder) -> Result<(), CoreError> + Send,
    {
        let stored = self.orders.require(id).await?;
        let mut po = stored.clone();
        step(&mut po)?;
        let po = self.orders.save_with(&stored, po, Batch::new()).await?;

        info!(
            po_number = %po.po_number,
            from = %stored.status,
            to = %po.status,
            "Purchase order status changed"
        );
        Ok(po)
    }

    pub async fn submit(&self, id: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, PurchaseOrder::submit).await
    }

    pub async fn approve(&self, id: &str, approved_by: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, |po| po.approve(approved_by)).await
    }

    pub async fn reject(&self, id: &str, reason: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, |po| po.reject(reason)).await
    }

    pub async fn revise(&self, id: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, PurchaseOrder::revise).await
    }

    pub async fn place(&self, id: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, PurchaseOrder::place).await
    }

    pub async fn cancel(&self, id: &str) -> StoreResult<PurchaseOrder> {
        self.apply(id, PurchaseOrder::cancel).await
    }

    /// Moves an order to `target` through the matching action. `note` is
    /// the approver for `Approved` and the reason for `Rejected`.
    pub async fn transition_to(
        &self,
        id: &str,
        target: PurchaseOrderStatus,
        note: Option<&str>,
    ) -> StoreResult<PurchaseOrder> {
        let note = note.unwrap_or_default();
        match target {
            PurchaseOrderStatus::Draft => self.revise(id).await,
            PurchaseOrderStatus::PendingApproval => self.submit(id).await,
            PurchaseOrderStatus::Approved => self.approve(id, note).await,
            PurchaseOrderStatus::Rejected => self.reject(id, note).await,
            PurchaseOrderStatus::Ordered => self.place(id).await,
            PurchaseOrderStatus::Cancelled => self.cancel(id).await,
            PurchaseOrderStatus::PartiallyReceived | PurchaseOrderStatus::Received => {
                Err(ValidationError::NotAllowed {
                    field: "status".to_string(),
                    allowed: vec![
                        "Draft".to_string(),
                        "Pending Approval".to_string(),
                        "Approved".to_string(),
                        "Rejected".to_string(),
                        "Ordered".to_string(),
                        "Cancelled".to_string(),
                    ],
                }
                .into())
            }
        }
    }

    pub async fn bulk_transition(
        &self,
        ids: &[String],
        target: PurchaseOrderStatus,
        note: Option<&str>,
    ) -> StoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new();
        for id in depot_core::bulk::dedup_ids(ids) {
            let result = self.transition_to(&id, target, note).await;
            outcome.record(&id, result);
        }
        Ok(outcome)
    }

    /// Books a goods receipt: order lines, order status and inventory are
    /// written together.
    pub async fn receive(
        &self,
        id: &str,
        receipts: &[LineQuantity],
    ) -> StoreResult<(PurchaseOrder, Vec<InventoryItem>)> {
        let stored = self.orders.require(id).await?;
        let mut po = stored.clone();
        let movements = po.receive(receipts)?;

        let mut batch = Batch::new();
        let mut items = Vec::with_capacity(movements.len());
        for movement in &movements {
            let mut item = self.items.require(&movement.item_id).await?;
            item.receive(movement.quantity, movement.unit_cost_cents);
            item.touch();
            batch.put_entity(&item)?;
            items.push(item);
        }

        let po = self.orders.save_with(&stored, po, batch).await?;

        info!(
            po_number = %po.po_number,
            lines = movements.len(),
            units = movements.iter().map(|m| m.quantity).sum::<i64>(),
            status = %po.status,
            "Goods received"
        );
        Ok((po, items))
    }
}
