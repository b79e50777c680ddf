//! # Domain Types
//!
//! Every entity the warehouse stores, grouped by area.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  catalog      Category, InventoryItem                                  │
//! │  parties      Supplier, Customer                                       │
//! │  fulfilment   Order, Shipment                                          │
//! │  purchasing   PurchaseOrder ──► Supplier, InventoryItem                │
//! │  sales        SalesOrder    ──► Customer, InventoryItem, Shipment      │
//! │  ledger       CashTransaction, PaymentTransaction ──► PO / SO          │
//! │  users        User, Role                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` used for references, and most carry a
//! human-facing business key as well (SKU, PO number, username).

pub mod catalog;
pub mod fulfilment;
pub mod ledger;
pub mod parties;
pub mod purchasing;
pub mod sales;
pub mod users;

pub use catalog::{Category, InventoryItem};
pub use fulfilment::{LineQuantity, Order, OrderLine, OrderStatus, Shipment, ShipmentStatus};
pub use ledger::{
    account_balance, CashAccount, CashDirection, CashTransaction, OrderKind, PaymentMethod, PaymentStatus,
    PaymentTransaction,
};
pub use parties::{Customer, Supplier};
pub use purchasing::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus, StockReceipt};
pub use sales::{SalesOrder, SalesOrderLine, SalesOrderStatus};
pub use users::{Role, User};
