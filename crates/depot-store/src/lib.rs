//! # depot-store: Storage Layer for Depot WMS
//!
//! Persists warehouse records as JSON documents and runs the workflows that
//! touch more than one record at a time.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (POST /api/purchase-orders/{id}/receive)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   depot-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │   │
//! │  │   │   Warehouse   │    │  Repositories │    │   Backends   │    │   │
//! │  │   │               │    │               │    │              │    │   │
//! │  │   │ one handle,   │───►│ Repository<T> │───►│ Memory (JSON │    │   │
//! │  │   │ all repos     │    │ PurchaseOrder │    │   snapshot)  │    │   │
//! │  │   │ migrate_all   │    │ SalesOrder .. │    │ SQLite       │    │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │   │
//! │  │                                                    │            │   │
//! │  │                                   broadcast ◄──────┘            │   │
//! │  │                                   ChangeEvent                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`backend`] - Mock and SQLite document backends, write batches, change events
//! - [`repository`] - Generic CRUD and the workflow repositories
//! - [`warehouse`] - The handle that ties them together
//! - [`pool`] - SQLite connection pool
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_store::{BackendConfig, Warehouse};
//!
//! let warehouse = Warehouse::open(BackendConfig::Memory { snapshot: None }).await?;
//! let acme = warehouse.suppliers().create(Supplier::new("Acme")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod warehouse;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{
    BackendConfig, Batch, ChangeEvent, ChangeKind, DocumentBackend, MemoryBackend, SqliteBackend,
    StoreBackend,
};
pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CashRepository, Dispatch, FulfilmentRepository, PaymentRepository, PurchaseOrderRepository,
    Repository, SalesOrderRepository, UserRepository, WriteHook,
};
pub use warehouse::{MigrationReport, Warehouse};
