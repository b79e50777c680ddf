//! Bulk operations: one request, many ids, a tally back.
//!
//! ```json
//! POST /api/purchase-orders/bulk
//! { "action": "status", "ids": ["a", "b"], "status": "Approved", "note": "dana" }
//!
//! { "succeeded": ["a"], "failed": [{ "id": "b", "reason": "..." }] }
//! ```

use axum::extract::{Path, State};
use axum::Json;
use depot_core::{BulkOutcome, Collection, OrderStatus, PurchaseOrderStatus, SalesOrderStatus, ShipmentStatus};
use depot_store::Warehouse;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{parse_collection, with_entity, ApiEntity};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkKind {
    Archive,
    Restore,
    Delete,
    Status,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: BulkKind,
    pub ids: Vec<String>,
    #[serde(default)]
    pub status: Option<Value>,
    /// Approver or rejection reason for purchase-order status changes.
    #[serde(default)]
    pub note: Option<String>,
}

async fn archive_many<T: ApiEntity>(warehouse: &Warehouse, ids: &[String]) -> ApiResult<BulkOutcome> {
    Ok(warehouse.repo::<T>().bulk_archive(ids).await?)
}

async fn restore_many<T: ApiEntity>(warehouse: &Warehouse, ids: &[String]) -> ApiResult<BulkOutcome> {
    Ok(warehouse.repo::<T>().bulk_restore(ids).await?)
}

async fn delete_many<T: ApiEntity>(warehouse: &Warehouse, ids: &[String]) -> ApiResult<BulkOutcome> {
    Ok(warehouse.repo::<T>().bulk_delete(ids).await?)
}

fn target_status<S: DeserializeOwned>(status: Option<Value>) -> ApiResult<S> {
    let status = status.ok_or_else(|| ApiError::validation("status is required"))?;
    Ok(serde_json::from_value(status)?)
}

async fn change_status(
    warehouse: &Warehouse,
    collection: Collection,
    request: BulkRequest,
) -> ApiResult<BulkOutcome> {
    let ids = &request.ids;
    let outcome = match collection {
        Collection::PurchaseOrders => {
            let target: PurchaseOrderStatus = target_status(request.status)?;
            warehouse
                .purchase_orders()
                .bulk_transition(ids, target, request.note.as_deref())
                .await?
        }
        Collection::SalesOrders => {
            let target: SalesOrderStatus = target_status(request.status)?;
            warehouse.sales_orders().bulk_transition(ids, target).await?
        }
        Collection::Orders => {
            let target: OrderStatus = target_status(request.status)?;
            warehouse.fulfilment().bulk_order_status(ids, target).await?
        }
        Collection::Shipments => {
            let target: ShipmentStatus = target_status(request.status)?;
            warehouse.fulfilment().bulk_shipment_status(ids, target).await?
        }
        other => {
            return Err(ApiError::validation(format!(
                "{} has no status to change",
                other.slug()
            )))
        }
    };
    Ok(outcome)
}

pub async fn apply(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let collection = parse_collection(&slug)?;
    let warehouse = &state.warehouse;
    let action = request.action;

    let outcome = match action {
        BulkKind::Archive => with_entity!(collection, T => archive_many::<T>(warehouse, &request.ids).await)?,
        BulkKind::Restore => with_entity!(collection, T => restore_many::<T>(warehouse, &request.ids).await)?,
        BulkKind::Delete => with_entity!(collection, T => delete_many::<T>(warehouse, &request.ids).await)?,
        BulkKind::Status => change_status(warehouse, collection, request).await?,
    };

    info!(
        collection = %collection,
        ?action,
        succeeded = outcome.success_count(),
        failed = outcome.failure_count(),
        "Bulk request finished"
    );
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use crate::config::DepotConfig;
    use crate::routes::router;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use depot_core::{Entity, Supplier};
    use depot_store::Warehouse;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_bulk_archive_reports_each_id() {
        let warehouse = Warehouse::memory();
        let acme = warehouse.suppliers().create(Supplier::new("Acme")).await.unwrap();
        let app = router(AppState::new(warehouse.clone(), DepotConfig::default()));

        let (status, outcome) = post(
            &app,
            "/api/suppliers/bulk",
            json!({ "action": "archive", "ids": [acme.id(), "missing", acme.id()] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["succeeded"], json!([acme.id()]));
        assert_eq!(outcome["failed"][0]["id"], "missing");
        assert!(warehouse.suppliers().require(acme.id()).await.unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_bulk_status_needs_a_workflow_collection() {
        let app = router(AppState::new(Warehouse::memory(), DepotConfig::default()));
        let (status, _) = post(
            &app,
            "/api/suppliers/bulk",
            json!({ "action": "status", "ids": ["x"], "status": "Approved" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, outcome) = post(
            &app,
            "/api/orders/bulk",
            json!({ "action": "status", "ids": ["x"], "status": "Processing" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["failed"][0]["id"], "x");
    }
}
