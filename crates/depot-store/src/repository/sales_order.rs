//! # Sales Order Repository
//!
//! Confirmation, shipping and delivery of sales orders.
//!
//! ## Shipping Flow
//! ```text
//! ship(so_id, [(item, qty), ...], destination?, carrier?, tracking?)
//!      │
//!      ├── load SO and the stock of every line
//!      ├── SalesOrder::ship ──► quantities leaving the warehouse
//!      │        (rejects over-shipment and short stock)
//!      ├── InventoryItem::issue for each
//!      ├── new Shipment, In Transit
//!      ▼
//!  one batch: SO + items + shipment ──► commit
//! ```

use depot_core::{
    transition, BulkOutcome, CoreError, Customer, Entity, InventoryItem, LineQuantity,
    SalesOrder, SalesOrderStatus, Shipment, ShipmentStatus, ValidationError,
};
use tracing::info;

use super::hooks::{ensure_exists, WriteHook};
use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::StoreResult;

impl WriteHook for SalesOrder {
    /// Checks the customer and every line item exist, snapshots SKU and
    /// name onto lines that carry none and prices those from the catalogue.
    async fn prepare(backend: &StoreBackend, so: &mut Self) -> StoreResult<()> {
        ensure_exists::<Customer>(backend, &so.customer_id).await?;
        for line in &mut so.lines {
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

/// Where and how a shipment travels.
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    /// Falls back to the order's shipping address, then the customer's.
    pub destination: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SalesOrderRepository {
    orders: Repository<SalesOrder>,
    items: Repository<InventoryItem>,
    shipments: Repository<Shipment>,
    customers: Repository<Customer>,
}

impl SalesOrderRepository {
    pub fn new(backend: StoreBackend) -> Self {
        SalesOrderRepository {
            orders: Repository::new(backend.clone()),
            items: Repository::new(backend.clone()),
            shipments: Repository::new(backend.clone()),
            customers: Repository::new(backend),
        }
    }

    pub fn records(&self) -> &Repository<SalesOrder> {
        &self.orders
    }

    /// Current stock for every item the order mentions.
    async fn stock_for(&self, so: &SalesOrder) -> StoreResult<Vec<InventoryItem>> {
        let mut stock = Vec::with_capacity(so.lines.len());
        for line in &so.lines {
            if let Some(item) = self.items.get(&line.item_id).await? {
                stock.push(item);
            }
        }
        Ok(stock)
    }

    fn log_change(stored: &SalesOrder, so: &SalesOrder) {
        info!(
            so_number = %so.so_number,
            from = %stored.status,
            to = %so.status,
            "Sales order status changed"
        );
    }

    pub async fn confirm(&self, id: &str) -> StoreResult<SalesOrder> {
        let stored = self.orders.require(id).await?;
        let stock = self.stock_for(&stored).await?;
        let mut so = stored.clone();
        so.confirm(&stock)?;
        let so = self.orders.save_with(&stored, so, Batch::new()).await?;
        Self::log_change(&stored, &so);
        Ok(so)
    }

    pub async fn cancel(&self, id: &str) -> StoreResult<SalesOrder> {
        let stored = self.orders.require(id).await?;
        let mut so = stored.clone();
        so.cancel()?;
        let so = self.orders.save_with(&stored, so, Batch::new()).await?;
        Self::log_change(&stored, &so);
        Ok(so)
    }

    /// Shipped → Delivered. Shipments of the order still in transit are
    /// delivered with it.
    pub async fn deliver(&self, id: &str) -> StoreResult<SalesOrder> {
        let stored = self.orders.require(id).await?;
        let mut so = stored.clone();
        so.deliver()?;

        let mut batch = Batch::new();
        for mut shipment in self.shipments.list(false).await? {
            let linked = shipment.sales_order_id.as_deref() == Some(id);
            if linked && shipment.status == ShipmentStatus::InTransit {
                transition(&mut shipment, ShipmentStatus::Delivered)?;
                batch.put_entity(&shipment)?;
            }
        }

        let so = self.orders.save_with(&stored, so, batch).await?;
        Self::log_change(&stored, &so);
        Ok(so)
    }

    /// Books goods leaving the warehouse. Returns the updated order and
    /// the shipment created for it.
    pub async fn ship(
        &self,
        id: &str,
        request: &[LineQuantity],
        dispatch: Dispatch,
    ) -> StoreResult<(SalesOrder, Shipment)> {
        let stored = self.orders.require(id).await?;
        let mut stock = self.stock_for(&stored).await?;
        let mut so = stored.clone();
        let shipped = so.ship(request, &stock)?;

        let destination = match dispatch.destination.or_else(|| so.shipping_address.clone()) {
            Some(destination) => destination,
            None => self
                .customers
                .require(&so.customer_id)
                .await?
                .shipping_address
                .ok_or_else(|| ValidationError::Required {
                    field: "destination".to_string(),
                })?,
        };

        let mut batch = Batch::new();
        for movement in &shipped {
            let item = stock
                .iter_mut()
                .find(|i| i.id() == movement.item_id)
                .ok_or_else(|| CoreError::not_found(InventoryItem::LABEL, &movement.item_id))?;
            item.issue(movement.quantity);
            item.touch();
            batch.put_entity(&*item)?;
        }

        let shipment =
            so.shipment_for(shipped, destination, dispatch.carrier, dispatch.tracking_number);
        shipment.validate()?;
        batch.put_entity(&shipment)?;

        let so = self.orders.save_with(&stored, so, batch).await?;

        info!(
            so_number = %so.so_number,
            shipment = %shipment.id(),
            units = shipment.lines.iter().map(|l| l.quantity).sum::<i64>(),
            status = %so.status,
            "Goods shipped"
        );
        Ok((so, shipment))
    }

    pub async fn transition_to(&self, id: &str, target: SalesOrderStatus) -> StoreResult<SalesOrder> {
        match target {
            SalesOrderStatus::Confirmed => self.confirm(id).await,
            SalesOrderStatus::Delivered => self.deliver(id).await,
            SalesOrderStatus::Cancelled => self.cancel(id).await,
            SalesOrderStatus::Draft
            | SalesOrderStatus::PartiallyShipped
            | SalesOrderStatus::Shipped => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "Confirmed".to_string(),
                    "Delivered".to_string(),
                    "Cancelled".to_string(),
                ],
            }
            .into()),
        }
    }

    pub async fn bulk_transition(
        &self,
        ids: &[String],
        target: SalesOrderStatus,
    ) -> StoreResult<BulkOutcome> {
        let mut outcome = BulkOutcome::new();
        for id in depot_core::bulk::dedup_ids(ids) {
            let result = self.transition_to(&id, target).await;
            outcome.record(&id, result);
        }
        Ok(outcome)
    }
}
