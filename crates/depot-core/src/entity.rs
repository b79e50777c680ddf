//! # Entity Model
//!
//! The shape every stored record shares, and the trait the storage layer
//! uses to treat all eleven collections with one generic repository.
//!
//! ## Document Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  collection "inventory" / document "3f1c…"                             │
//! │                                                                         │
//! │  {                                                                      │
//! │    "id": "3f1c…",            ┐                                          │
//! │    "archived": false,        │ Record (flattened into every entity)    │
//! │    "createdAt": "…",         │                                          │
//! │    "updatedAt": "…",         ┘                                          │
//! │    "sku": "PAL-001",         ┐                                          │
//! │    "name": "Euro pallet",    │ entity-specific fields                   │
//! │    ...                       ┘                                          │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::migration;
use crate::validation::ValidationResult;

// =============================================================================
// Collection
// =============================================================================

/// Every collection the warehouse keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Inventory,
    Categories,
    Suppliers,
    Customers,
    Orders,
    Shipments,
    PurchaseOrders,
    SalesOrders,
    CashTransactions,
    PaymentTransactions,
    Users,
}

impl Collection {
    /// All collections, in migration order.
    pub const ALL: [Collection; 11] = [
        Collection::Categories,
        Collection::Suppliers,
        Collection::Customers,
        Collection::Inventory,
        Collection::Orders,
        Collection::Shipments,
        Collection::PurchaseOrders,
        Collection::SalesOrders,
        Collection::CashTransactions,
        Collection::PaymentTransactions,
        Collection::Users,
    ];

    /// Document-store collection name (camelCase, as persisted).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Inventory => "inventory",
            Collection::Categories => "categories",
            Collection::Suppliers => "suppliers",
            Collection::Customers => "customers",
            Collection::Orders => "orders",
            Collection::Shipments => "shipments",
            Collection::PurchaseOrders => "purchaseOrders",
            Collection::SalesOrders => "salesOrders",
            Collection::CashTransactions => "cashTransactions",
            Collection::PaymentTransactions => "paymentTransactions",
            Collection::Users => "users",
        }
    }

    /// URL path segment (kebab-case).
    pub const fn slug(&self) -> &'static str {
        match self {
            Collection::Inventory => "inventory",
            Collection::Categories => "categories",
            Collection::Suppliers => "suppliers",
            Collection::Customers => "customers",
            Collection::Orders => "orders",
            Collection::Shipments => "shipments",
            Collection::PurchaseOrders => "purchase-orders",
            Collection::SalesOrders => "sales-orders",
            Collection::CashTransactions => "cash-transactions",
            Collection::PaymentTransactions => "payments",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ValidationError;

    /// Accepts either the stored name or the URL slug.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.slug() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "collection".to_string(),
                allowed: Collection::ALL.iter().map(|c| c.slug().to_string()).collect(),
            })
    }
}

// =============================================================================
// Record
// =============================================================================

/// Identity, soft-delete flag and timestamps shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// UUID v4. Empty on create requests; assigned by the repository.
    #[serde(default)]
    pub id: String,

    /// Soft-delete flag.
    #[serde(default)]
    pub archived: bool,

    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// A fresh record with a generated id.
    pub fn new() -> Self {
        let now = Utc::now();
        Record {
            id: generate_id(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new()
    }
}

/// Generates a new document id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Entity Trait
// =============================================================================

/// A record type stored in one collection.
///
/// The storage layer is written once against this trait; each entity only
/// says where it lives, how to validate it and how to upgrade old documents.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection this entity lives in.
    const COLLECTION: Collection;

    /// Human-readable name used in error messages ("Purchase order").
    const LABEL: &'static str;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn id(&self) -> &str {
        &self.record().id
    }

    fn is_archived(&self) -> bool {
        self.record().archived
    }

    /// Sets `updatedAt` to now.
    fn touch(&mut self) {
        self.record_mut().updated_at = Utc::now();
    }

    /// Puts a record about to be created into its initial workflow state.
    /// Status, progress counters, payment figures and lifecycle stamps only
    /// change through workflow steps, never through a create.
    fn reset_for_create(&mut self) {}

    /// Combines an edit with the stored record. Entities with a workflow
    /// keep their status and derived fields; everything else takes the edit.
    fn merge_update(&self, incoming: Self) -> CoreResult<Self> {
        Ok(incoming)
    }

    /// Recomputes derived fields (totals, balances) before a write.
    fn normalize(&mut self) {}

    /// Field-level validation run before every create and update.
    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }

    /// Field that must be unique within the collection, with its normalized
    /// value. `None` when the entity has no such field.
    fn unique_key(&self) -> Option<(&'static str, String)> {
        None
    }

    /// Upgrades a raw document written by an older schema version in place.
    /// Returns true when the document changed.
    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_record(doc)
    }
}
