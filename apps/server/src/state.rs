//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐    │
//! │  │        Warehouse         │      │       Arc<DepotConfig>       │    │
//! │  │                          │      │                              │    │
//! │  │  StoreBackend (cloned    │      │  read-only after startup     │    │
//! │  │  handle, shared pool or  │      │                              │    │
//! │  │  shared in-memory map)   │      │                              │    │
//! │  └──────────────────────────┘      └──────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use depot_store::Warehouse;

use crate::config::DepotConfig;

#[derive(Clone)]
pub struct AppState {
    pub warehouse: Warehouse,
    pub config: Arc<DepotConfig>,
}

impl AppState {
    pub fn new(warehouse: Warehouse, config: DepotConfig) -> Self {
        AppState {
            warehouse,
            config: Arc::new(config),
        }
    }
}
