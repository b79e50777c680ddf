//! # depot-core: Pure Business Logic for Depot WMS
//!
//! Entity types, status lifecycles, balance math and legacy-document
//! migration for the warehouse. Nothing in here touches a disk, a socket
//! or a clock other than `Utc::now()` for timestamps.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot WMS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser SPA                                  │   │
//! │  │    Inventory ──► Purchasing ──► Sales ──► Ledger ──► Users      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP JSON + WebSocket change feed     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    depot-server (axum)                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    depot-store                                  │   │
//! │  │     Repository<T>, workflow services, memory / SQLite backends  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ lifecycle │  │  balance  │  │ migration │  │   │
//! │  │   │  11 kinds │  │  PO / SO  │  │ Settlement│  │  backfill │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`entity`] - `Record`, `Collection` and the `Entity` trait
//! - [`types`] - The eleven stored entity types
//! - [`lifecycle`] - Status transition tables and the `transition` function
//! - [`balance`] - Order totals against payments
//! - [`migration`] - Upgrading documents written by older versions
//! - [`bulk`] - Per-id tallies for bulk operations
//! - [`money`] - Integer-cent money
//! - [`error`] / [`validation`] - Typed errors and field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::money::Money;
//! use depot_core::types::{PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus, LineQuantity};
//!
//! let mut po = PurchaseOrder::new("PO-0001", "supplier-1");
//! po.lines.push(PurchaseOrderLine::new("item-1", 10, Money::from_cents(450)));
//!
//! po.submit().unwrap();
//! po.approve("warehouse-lead").unwrap();
//! po.place().unwrap();
//!
//! let movements = po.receive(&[LineQuantity::new("item-1", 4)]).unwrap();
//! assert_eq!(movements[0].quantity, 4);
//! assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod bulk;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod migration;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use balance::{Payable, Settlement};
pub use bulk::{BulkFailure, BulkOutcome};
pub use entity::{Collection, Entity, Record};
pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{transition, Lifecycle, Workflow};
pub use money::Money;
pub use types::*;
