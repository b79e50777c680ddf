//! # Record Actions
//!
//! `POST /api/{collection}/{id}/{action}` with an optional JSON body.
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────────────────────────┐
//! │ collection       │ actions                                             │
//! ├──────────────────┼─────────────────────────────────────────────────────┤
//! │ any              │ archive, restore                                    │
//! │ purchase-orders  │ submit, approve {approvedBy}, reject {reason},      │
//! │                  │ revise, order, cancel, receive {lines}              │
//! │ sales-orders     │ confirm, ship {lines, destination?, carrier?,       │
//! │                  │ trackingNumber?}, deliver, cancel                   │
//! │ orders           │ status {status}                                     │
//! │ shipments        │ status {status}                                     │
//! │ users            │ password {password}                                 │
//! └──────────────────┴─────────────────────────────────────────────────────┘
//! ```

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use depot_core::{Collection, LineQuantity, OrderStatus, ShipmentStatus};
use depot_store::{Dispatch, Warehouse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_collection, with_entity, ApiEntity};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    approved_by: String,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ReceiveRequest {
    lines: Vec<LineQuantity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipRequest {
    lines: Vec<LineQuantity>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusRequest<S> {
    status: S,
}

#[derive(Debug, Deserialize)]
struct PasswordRequest {
    password: String,
}

fn body_as<B: DeserializeOwned>(body: Value) -> ApiResult<B> {
    Ok(serde_json::from_value(body)?)
}

async fn archive_one<T: ApiEntity>(warehouse: &Warehouse, id: &str) -> ApiResult<Value> {
    Ok(warehouse.repo::<T>().archive(id).await?.to_api())
}

async fn restore_one<T: ApiEntity>(warehouse: &Warehouse, id: &str) -> ApiResult<Value> {
    Ok(warehouse.repo::<T>().restore(id).await?.to_api())
}

async fn purchase_order_action(
    warehouse: &Warehouse,
    id: &str,
    action: &str,
    body: Value,
) -> ApiResult<Value> {
    let pos = warehouse.purchase_orders();
    let po = match action {
        "submit" => pos.submit(id).await?,
        "approve" => {
            let request: ApproveRequest = body_as(body)?;
            pos.approve(id, &request.approved_by).await?
        }
        "reject" => {
            let request: RejectRequest = body_as(body)?;
            pos.reject(id, &request.reason).await?
        }
        "revise" => pos.revise(id).await?,
        "order" => pos.place(id).await?,
        "cancel" => pos.cancel(id).await?,
        "receive" => {
            let request: ReceiveRequest = body_as(body)?;
            let (po, items) = pos.receive(id, &request.lines).await?;
            return Ok(json!({
                "purchaseOrder": po.to_api(),
                "items": items.iter().map(ApiEntity::to_api).collect::<Vec<_>>(),
            }));
        }
        other => return Err(ApiError::not_found("Action", other)),
    };
    Ok(po.to_api())
}

async fn sales_order_action(
    warehouse: &Warehouse,
    id: &str,
    action: &str,
    body: Value,
) -> ApiResult<Value> {
    let sos = warehouse.sales_orders();
    let so = match action {
        "confirm" => sos.confirm(id).await?,
        "deliver" => sos.deliver(id).await?,
        "cancel" => sos.cancel(id).await?,
        "ship" => {
            let request: ShipRequest = body_as(body)?;
            let dispatch = Dispatch {
                destination: request.destination,
                carrier: request.carrier,
                tracking_number: request.tracking_number,
            };
            let (so, shipment) = sos.ship(id, &request.lines, dispatch).await?;
            return Ok(json!({
                "salesOrder": so.to_api(),
                "shipment": shipment.to_api(),
            }));
        }
        other => return Err(ApiError::not_found("Action", other)),
    };
    Ok(so.to_api())
}

pub async fn apply(
    State(state): State<AppState>,
    Path((slug, id, action)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let collection = parse_collection(&slug)?;
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    let warehouse = &state.warehouse;

    let doc = match (collection, action.as_str()) {
        (c, "archive") => with_entity!(c, T => archive_one::<T>(warehouse, &id).await)?,
        (c, "restore") => with_entity!(c, T => restore_one::<T>(warehouse, &id).await)?,
        (Collection::PurchaseOrders, a) => purchase_order_action(warehouse, &id, a, body).await?,
        (Collection::SalesOrders, a) => sales_order_action(warehouse, &id, a, body).await?,
        (Collection::Orders, "status") => {
            let request: StatusRequest<OrderStatus> = body_as(body)?;
            warehouse.fulfilment().transition_order(&id, request.status).await?.to_api()
        }
        (Collection::Shipments, "status") => {
            let request: StatusRequest<ShipmentStatus> = body_as(body)?;
            warehouse.fulfilment().transition_shipment(&id, request.status).await?.to_api()
        }
        (Collection::Users, "password") => {
            let request: PasswordRequest = body_as(body)?;
            warehouse.users().set_password(&id, &request.password).await?.to_api()
        }
        (_, other) => return Err(ApiError::not_found("Action", other)),
    };

    info!(collection = %collection, id = %id, action = %action, "Action applied");
    Ok(Json(doc))
}

#[cfg(test)]
mod tests {
    use crate::config::DepotConfig;
    use crate::routes::router;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
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

    async fn id_of(app: &Router, uri: &str, body: Value) -> String {
        let (status, doc) = post(app, uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "{doc}");
        doc["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_purchase_order_through_http() {
        let app = router(AppState::new(Warehouse::memory(), DepotConfig::default()));
        let supplier = id_of(&app, "/api/suppliers", json!({ "name": "Acme" })).await;
        let item = id_of(&app, "/api/inventory", json!({ "sku": "PAL-001", "name": "Euro pallet" })).await;
        let po = id_of(
            &app,
            "/api/purchase-orders",
            json!({
                "poNumber": "PO-0001",
                "supplierId": supplier,
                "lines": [{ "itemId": item, "quantity": 10, "unitCostCents": 450 }]
            }),
        )
        .await;

        let (status, body) = post(&app, &format!("/api/purchase-orders/{po}/approve"), json!({ "approvedBy": "dana" })).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");

        let (status, doc) = post(&app, &format!("/api/purchase-orders/{po}/submit"), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["status"], "Pending Approval");

        let (status, _) = post(&app, &format!("/api/purchase-orders/{po}/approve"), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        post(&app, &format!("/api/purchase-orders/{po}/approve"), json!({ "approvedBy": "dana" })).await;
        post(&app, &format!("/api/purchase-orders/{po}/order"), Value::Null).await;

        let (status, receipt) = post(
            &app,
            &format!("/api/purchase-orders/{po}/receive"),
            json!({ "lines": [{ "itemId": item, "quantity": 4 }] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["purchaseOrder"]["status"], "Partially Received");
        assert_eq!(receipt["items"][0]["quantity"], 4);

        let (status, body) = post(
            &app,
            &format!("/api/purchase-orders/{po}/receive"),
            json!({ "lines": [{ "itemId": item, "quantity": 7 }] }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUSINESS_LOGIC");
    }

    #[tokio::test]
    async fn test_sales_order_ship_creates_shipment() {
        let app = router(AppState::new(Warehouse::memory(), DepotConfig::default()));
        let customer = id_of(
            &app,
            "/api/customers",
            json!({ "name": "Harbour Logistics", "shippingAddress": "12 Harbour Road" }),
        )
        .await;
        let item = id_of(
            &app,
            "/api/inventory",
            json!({ "sku": "CRT-001", "name": "Crate", "quantity": 5, "unitPriceCents": 1200 }),
        )
        .await;
        let so = id_of(
            &app,
            "/api/sales-orders",
            json!({
                "soNumber": "SO-0001",
                "customerId": customer,
                "lines": [{ "itemId": item, "quantity": 3 }]
            }),
        )
        .await;

        post(&app, &format!("/api/sales-orders/{so}/confirm"), Value::Null).await;
        let (status, shipped) = post(
            &app,
            &format!("/api/sales-orders/{so}/ship"),
            json!({ "lines": [{ "itemId": item, "quantity": 3 }], "carrier": "DHL" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{shipped}");
        assert_eq!(shipped["salesOrder"]["status"], "Shipped");
        assert_eq!(shipped["shipment"]["destination"], "12 Harbour Road");

        let (status, _) = post(&app, &format!("/api/sales-orders/{so}/explode"), Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_order_status_action() {
        let app = router(AppState::new(Warehouse::memory(), DepotConfig::default()));
        let order = id_of(&app, "/api/orders", json!({ "orderNumber": "ORD-1" })).await;

        let (status, doc) = post(&app, &format!("/api/orders/{order}/status"), json!({ "status": "Processing" })).await;
        assert_eq!(status, StatusCode::OK, "{doc}");
        assert_eq!(doc["status"], "Processing");

        let (status, _) = post(&app, &format!("/api/orders/{order}/status"), json!({ "status": "Lost" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
