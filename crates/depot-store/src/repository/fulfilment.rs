//! Customer orders and shipments: plain status changes, no stock movement.

use depot_core::{
    transition, BulkOutcome, Customer, InventoryItem, Order, OrderStatus, SalesOrder, Shipment,
    ShipmentStatus, Workflow,
};
use tracing::info;

use super::hooks::{ensure_exists, WriteHook};
use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::StoreResult;

impl WriteHook for Order {
    async fn prepare(backend: &StoreBackend, order: &mut Self) -> StoreResult<()> {
        if let Some(customer_id) = order.customer_id.as_deref().filter(|id| !id.is_empty()) {
            ensure_exists::<Customer>(backend, customer_id).await?;
        }
        for line in &mut order.lines {
            let item = ensure_exists::<InventoryItem>(backend, &line.item_id).await?;
            if line.sku.is_empty() || line.name.is_empty() {
                line.sku = item.sku;
                line.name = item.name;
                if line.unit_price_cents == 0 {
                    line.unit_price_cents = item.unit_price_cents;
                }
            }
        }
        Ok(())
    }
}

impl WriteHook for Shipment {
    async fn prepare(backend: &StoreBackend, shipment: &mut Self) -> StoreResult<()> {
        if let Some(order_id) = shipment.order_id.as_deref().filter(|id| !id.is_empty()) {
            ensure_exists::<Order>(backend, order_id).await?;
        }
        if let Some(so_id) = shipment.sales_order_id.as_deref().filter(|id| !id.is_empty()) {
            ensure_exists::<SalesOrder>(backend, so_id).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FulfilmentRepository {
    orders: Repository<Order>,
    shipments: Repository<Shipment>,
}

impl FulfilmentRepository {
    pub fn new(backend: StoreBackend) -> Self {
        FulfilmentRepository {
            orders: Repository::new(backend.clone()),
            shipments: Repository::new(backend),
        }
    }

    pub fn orders(&self) -> &Repository<Order> {
        &self.orders
    }

    pub fn shipments(&self) -> &Repository<Shipment> {
        &self.shipments
    }

    async fn apply<W: WriteHook + Workflow>(
        repo: &Repository<W>,
        id: &str,
        to: W::Status,
    ) -> StoreResult<W> {
        let stored = repo.require(id).await?;
        if stored.is_archived() {
            return Err(super::archived(&stored).into());
        }
        let mut entity = stored.clone();
        transition(&mut entity, to)?;
        let entity = repo.save_with(&stored, entity, Batch::new()).await?;

        info!(
            collection = %W::COLLECTION,
            id = %id,
            from = %stored.status(),
            to = %to,
            "Status changed"
        );
        Ok(entity)
    }

    pub async fn transition_order(&self, id: &str, to: OrderStatus) -> StoreResult<Order> {
        Self::apply(&self.orders, id, to).await
    }

    pub async fn transition_shipment(&self, id: &str, to: ShipmentStatus) -> StoreResult<Shipment> {
        Self::apply(&self.shipments, id, to).await
    }

    pub async fn bulk_order_status(&self, ids: &[String], to: OrderStatus) -> StoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new();
        for id in depot_core::bulk::dedup_ids(ids) {
            let result = self.transition_order(&id, to).await;
            outcome.record(&id, result);
        }
        Ok(outcome)
    }

    pub async fn bulk_shipment_status(
        &self,
        ids: &[String],
        to: ShipmentStatus,
    ) -> StoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new();
        for id in depot_core::bulk::dedup_ids(ids) {
            let result = self.transition_shipment(&id, to).await;
            outcome.record(&id, result);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::StoreError;
    use depot_core::{CoreError, Entity, OrderLine};

    async fn setup() -> (FulfilmentRepository, InventoryItem) {
        let backend = StoreBackend::Memory(MemoryBackend::ephemeral());
        let mut item = InventoryItem::new("TAPE-48", "Packing tape");
        item.unit_price_cents = 350;
        let item = Repository::<InventoryItem>::new(backend.clone())
            .create(item)
            .await
            .unwrap();
        (FulfilmentRepository::new(backend), item)
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let (repo, item) = setup().await;
        let mut order = Order::new("ORD-1");
        order.lines.push(OrderLine {
            item_id: item.id().to_string(),
            sku: String::new(),
            name: String::new(),
            quantity: 4,
            unit_price_cents: 0,
        });
        let order = repo.orders().create(order).await.unwrap();
        assert_eq!(order.lines[0].sku, "TAPE-48");
        assert_eq!(order.total_cents, 1400);

        let err = repo
            .transition_order(order.id(), OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidTransition { .. })));

        repo.transition_order(order.id(), OrderStatus::Processing).await.unwrap();
        let shipped = repo
            .transition_order(order.id(), OrderStatus::Shipped)
            .await
            .unwrap();
        assert!(shipped.shipped_at.is_some());
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let (repo, _) = setup().await;
        let mut order = Order::new("ORD-2");
        order.status = OrderStatus::Delivered;
        order.delivered_at = Some(chrono::Utc::now());
        let order = repo.orders().create(order).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.delivered_at.is_none());

        let mut shipment = Shipment::new("Dock 7");
        shipment.status = ShipmentStatus::Returned;
        let shipment = repo.shipments().create(shipment).await.unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_edit_cannot_change_status() {
        let (repo, _) = setup().await;
        let order = repo.orders().create(Order::new("ORD-3")).await.unwrap();
        let mut edit = order.clone();
        edit.status = OrderStatus::Delivered;
        edit.notes = Some("fragile".to_string());
        let updated = repo.orders().update(edit).await.unwrap();
        assert_eq!(updated.status, OrderStatus::Pending);
        assert_eq!(updated.notes.as_deref(), Some("fragile"));

        let shipment = repo.shipments().create(Shipment::new("Dock 8")).await.unwrap();
        let mut edit = shipment.clone();
        edit.status = ShipmentStatus::Returned;
        edit.tracking_number = Some("1Z999".to_string());
        let updated = repo.shipments().update(edit).await.unwrap();
        assert_eq!(updated.status, ShipmentStatus::Pending);
        assert_eq!(updated.tracking_number.as_deref(), Some("1Z999"));

        // Workflow steps still follow the transition table.
        let err = repo
            .transition_shipment(shipment.id(), ShipmentStatus::Returned)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_order_lines_must_reference_items() {
        let (repo, item) = setup().await;
        let mut order = Order::new("ORD-4");
        order.lines.push(OrderLine {
            item_id: "ghost-item".to_string(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: 1,
            unit_price_cents: 100,
        });
        let err = repo.orders().create(order).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_shipment_links_must_exist() {
        let (repo, _) = setup().await;
        let mut shipment = Shipment::new("Warehouse B");
        shipment.order_id = Some("missing".to_string());
        let err = repo.shipments().create(shipment).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bulk_shipment_status() {
        let (repo, _) = setup().await;
        let a = repo.shipments().create(Shipment::new("Dock 1")).await.unwrap();
        let b = repo.shipments().create(Shipment::new("Dock 2")).await.unwrap();
        repo.transition_shipment(b.id(), ShipmentStatus::Cancelled).await.unwrap();

        let ids = vec![a.id().to_string(), b.id().to_string()];
        let outcome = repo
            .bulk_shipment_status(&ids, ShipmentStatus::InTransit)
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, vec![a.id().to_string()]);
        assert_eq!(outcome.failed[0].id, b.id());

        let a = repo.shipments().require(a.id()).await.unwrap();
        assert!(a.shipped_at.is_some());
    }
}
