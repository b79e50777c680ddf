//! # Routes
//!
//! ## Route Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET    /health                              liveness + store check     │
//! │  GET    /api/changes                         WebSocket change feed      │
//! │  GET    /api/balances/{account}              cash / bank balance        │
//! │  POST   /api/auth/verify                     username + password check  │
//! │  POST   /api/admin/migrate                   document migration pass    │
//! │                                                                         │
//! │  GET    /api/{collection}                    list (?includeArchived)    │
//! │  POST   /api/{collection}                    create                     │
//! │  POST   /api/{collection}/bulk               archive/restore/delete/..  │
//! │  GET    /api/{collection}/{id}               read                       │
//! │  PUT    /api/{collection}/{id}               update                     │
//! │  DELETE /api/{collection}/{id}               delete                     │
//! │  POST   /api/{collection}/{id}/{action}      archive, submit, ship, ..  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The fixed routes start with a segment that is never a collection slug,
//! so they never shadow a collection.

pub mod actions;
pub mod admin;
pub mod bulk;
pub mod changes;
pub mod ledger;
pub mod records;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use depot_core::{
    CashTransaction, Category, Collection, Customer, InventoryItem, Order, PaymentTransaction,
    PurchaseOrder, SalesOrder, Shipment, Supplier, User,
};
use depot_store::WriteHook;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Runs `$body` with `$T` bound to the entity type stored in `$collection`.
macro_rules! with_entity {
    ($collection:expr, $T:ident => $body:expr) => {
        match $collection {
            ::depot_core::Collection::Inventory => {
                type $T = ::depot_core::InventoryItem;
                $body
            }
            ::depot_core::Collection::Categories => {
                type $T = ::depot_core::Category;
                $body
            }
            ::depot_core::Collection::Suppliers => {
                type $T = ::depot_core::Supplier;
                $body
            }
            ::depot_core::Collection::Customers => {
                type $T = ::depot_core::Customer;
                $body
            }
            ::depot_core::Collection::Orders => {
                type $T = ::depot_core::Order;
                $body
            }
            ::depot_core::Collection::Shipments => {
                type $T = ::depot_core::Shipment;
                $body
            }
            ::depot_core::Collection::PurchaseOrders => {
                type $T = ::depot_core::PurchaseOrder;
                $body
            }
            ::depot_core::Collection::SalesOrders => {
                type $T = ::depot_core::SalesOrder;
                $body
            }
            ::depot_core::Collection::CashTransactions => {
                type $T = ::depot_core::CashTransaction;
                $body
            }
            ::depot_core::Collection::PaymentTransactions => {
                type $T = ::depot_core::PaymentTransaction;
                $body
            }
            ::depot_core::Collection::Users => {
                type $T = ::depot_core::User;
                $body
            }
        }
    };
}

pub(crate) use with_entity;

/// How a stored record is shown to clients.
pub trait ApiEntity: WriteHook {
    fn to_api(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl ApiEntity for InventoryItem {}
impl ApiEntity for Category {}
impl ApiEntity for Supplier {}
impl ApiEntity for Customer {}
impl ApiEntity for Order {}
impl ApiEntity for Shipment {}
impl ApiEntity for PurchaseOrder {}
impl ApiEntity for SalesOrder {}
impl ApiEntity for CashTransaction {}
impl ApiEntity for PaymentTransaction {}

impl ApiEntity for User {
    fn to_api(&self) -> Value {
        let mut doc = serde_json::to_value(self).unwrap_or_default();
        if let Some(fields) = doc.as_object_mut() {
            fields.remove("passwordHash");
        }
        doc
    }
}

/// Resolves a URL slug (or stored collection name).
pub(crate) fn parse_collection(slug: &str) -> ApiResult<Collection> {
    slug.parse()
        .map_err(|_| ApiError::not_found("Collection", slug))
}

/// Decodes a request body into `T`, upgrading legacy field shapes first.
pub(crate) fn decode_body<T: WriteHook>(mut body: Value) -> ApiResult<T> {
    T::migrate(&mut body);
    Ok(serde_json::from_value(body)?)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/changes", get(changes::stream))
        .route("/api/balances/{account}", get(ledger::balance))
        .route("/api/auth/verify", post(admin::verify_password))
        .route("/api/admin/migrate", post(admin::migrate))
        .route("/api/{collection}", get(records::list).post(records::create))
        .route("/api/{collection}/bulk", post(bulk::apply))
        .route(
            "/api/{collection}/{id}",
            get(records::read)
                .put(records::update)
                .delete(records::remove),
        )
        .route("/api/{collection}/{id}/{action}", post(actions::apply))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.warehouse.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "STORE UNAVAILABLE")
    }
}
