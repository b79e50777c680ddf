//! # Warehouse
//!
//! The handle the rest of the system holds: one backend, and a repository
//! for every collection built on top of it. Cheap to clone.
//!
//! ## Usage
//! ```rust,ignore
//! let warehouse = Warehouse::open(BackendConfig::Sqlite(DbConfig::new("depot.db"))).await?;
//! warehouse.migrate_all().await?;
//!
//! let po = warehouse.purchase_orders().submit(&po_id).await?;
//! let mut changes = warehouse.subscribe();
//! ```

use depot_core::{
    CashTransaction, Category, Collection, Customer, InventoryItem, Order, PaymentTransaction,
    PurchaseOrder, SalesOrder, Shipment, Supplier, User,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::info;

use crate::backend::{BackendConfig, ChangeEvent, DocumentBackend, MemoryBackend, StoreBackend};
use crate::error::StoreResult;
use crate::repository::{
    CashRepository, FulfilmentRepository, PaymentRepository, PurchaseOrderRepository, Repository,
    SalesOrderRepository, UserRepository, WriteHook,
};

/// Documents rewritten by a migration pass, per collection.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub collections: BTreeMap<String, usize>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct Warehouse {
    backend: StoreBackend,
}

impl Warehouse {
    pub fn new(backend: StoreBackend) -> Self {
        Warehouse { backend }
    }

    pub async fn open(config: BackendConfig) -> StoreResult<Self> {
        let backend = StoreBackend::open(config).await?;
        info!(backend = backend.kind(), "Warehouse store opened");
        Ok(Self::new(backend))
    }

    /// In-memory store with nothing on disk; for tests and demos.
    pub fn memory() -> Self {
        Self::new(StoreBackend::Memory(MemoryBackend::ephemeral()))
    }

    pub fn backend(&self) -> &StoreBackend {
        &self.backend
    }

    pub fn repo<T: WriteHook>(&self) -> Repository<T> {
        Repository::new(self.backend.clone())
    }

    pub fn inventory(&self) -> Repository<InventoryItem> {
        self.repo()
    }

    pub fn categories(&self) -> Repository<Category> {
        self.repo()
    }

    pub fn suppliers(&self) -> Repository<Supplier> {
        self.repo()
    }

    pub fn customers(&self) -> Repository<Customer> {
        self.repo()
    }

    pub fn purchase_orders(&self) -> PurchaseOrderRepository {
        PurchaseOrderRepository::new(self.backend.clone())
    }

    pub fn sales_orders(&self) -> SalesOrderRepository {
        SalesOrderRepository::new(self.backend.clone())
    }

    pub fn fulfilment(&self) -> FulfilmentRepository {
        FulfilmentRepository::new(self.backend.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.backend.clone())
    }

    pub fn cash(&self) -> CashRepository {
        CashRepository::new(self.backend.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.backend.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.backend.subscribe()
    }

    pub async fn health_check(&self) -> bool {
        self.backend.health_check().await
    }

    /// Upgrades legacy documents in every collection. Safe to run on every
    /// start: a second pass rewrites nothing.
    pub async fn migrate_all(&self) -> StoreResult<MigrationReport> {
        let mut report = MigrationReport::default();
        for collection in Collection::ALL {
            let rewritten = match collection {
                Collection::Inventory => self.repo::<InventoryItem>().migrate().await?,
                Collection::Categories => self.repo::<Category>().migrate().await?,
                Collection::Suppliers => self.repo::<Supplier>().migrate().await?,
                Collection::Customers => self.repo::<Customer>().migrate().await?,
                Collection::Orders => self.repo::<Order>().migrate().await?,
                Collection::Shipments => self.repo::<Shipment>().migrate().await?,
                Collection::PurchaseOrders => self.repo::<PurchaseOrder>().migrate().await?,
                Collection::SalesOrders => self.repo::<SalesOrder>().migrate().await?,
                Collection::CashTransactions => self.repo::<CashTransaction>().migrate().await?,
                Collection::PaymentTransactions => {
                    self.repo::<PaymentTransaction>().migrate().await?
                }
                Collection::Users => self.repo::<User>().migrate().await?,
            };
            report.collections.insert(collection.as_str().to_string(), rewritten);
            report.total += rewritten;
        }

        info!(rewritten = report.total, "Migration pass finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_backends;
    use depot_core::Entity;
    use serde_json::json;

    #[tokio::test]
    async fn test_migrate_all_is_idempotent() {
        for backend in test_backends().await {
            let kind = backend.kind();
            let warehouse = Warehouse::new(backend);
            warehouse
                .backend()
                .put(
                    Collection::Users,
                    "u1",
                    json!({ "username": "admin", "name": "Admin", "role": "Admin" }),
                )
                .await
                .unwrap();
            warehouse
                .backend()
                .put(
                    Collection::CashTransactions,
                    "t1",
                    json!({ "account": "Cash", "type": "in", "amount": 12.5, "date": "2024-03-01T09:00:00Z" }),
                )
                .await
                .unwrap();

            let report = warehouse.migrate_all().await.unwrap();
            assert_eq!(report.total, 2, "{kind}");
            assert_eq!(report.collections["users"], 1);

            let again = warehouse.migrate_all().await.unwrap();
            assert_eq!(again.total, 0);

            let user = warehouse.users().records().require("u1").await.unwrap();
            assert_eq!(user.display_name.as_deref(), Some("Admin"));
            let tx = warehouse.cash().records().require("t1").await.unwrap();
            assert_eq!(tx.amount_cents, 1250);
            assert_eq!(tx.id(), "t1");
        }
    }

    #[tokio::test]
    async fn test_changes_reach_subscribers() {
        let warehouse = Warehouse::memory();
        let mut rx = warehouse.subscribe();
        let supplier = warehouse.suppliers().create(Supplier::new("Acme")).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, Collection::Suppliers);
        assert_eq!(event.id, supplier.id());
    }
}
