//! Generic CRUD over every collection.
//!
//! ```text
//! GET /api/purchase-orders/42
//!      │
//!      ▼
//! parse_collection("purchase-orders") ──► Collection::PurchaseOrders
//!      │
//!      ▼
//! with_entity!  ──► read_one::<PurchaseOrder>  ──► Repository<PurchaseOrder>
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use depot_core::{Collection, Entity, User, ValidationError};
use depot_store::Warehouse;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{decode_body, parse_collection, with_entity, ApiEntity};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub include_archived: bool,
}

async fn list_all<T: ApiEntity>(warehouse: &Warehouse, include_archived: bool) -> ApiResult<Vec<Value>> {
    let records = warehouse.repo::<T>().list(include_archived).await?;
    Ok(records.iter().map(T::to_api).collect())
}

async fn read_one<T: ApiEntity>(warehouse: &Warehouse, id: &str) -> ApiResult<Value> {
    Ok(warehouse.repo::<T>().require(id).await?.to_api())
}

async fn create_one<T: ApiEntity>(warehouse: &Warehouse, body: Value) -> ApiResult<Value> {
    let entity: T = decode_body(body)?;
    Ok(warehouse.repo::<T>().create(entity).await?.to_api())
}

async fn update_one<T: ApiEntity>(warehouse: &Warehouse, id: &str, body: Value) -> ApiResult<Value> {
    let mut entity: T = decode_body(body)?;
    entity.record_mut().id = id.to_string();
    Ok(warehouse.repo::<T>().update(entity).await?.to_api())
}

async fn delete_one<T: ApiEntity>(warehouse: &Warehouse, id: &str) -> ApiResult<()> {
    Ok(warehouse.repo::<T>().delete(id).await?)
}

/// Users are created with a password; the hash never comes from a client.
async fn create_user(warehouse: &Warehouse, mut body: Value) -> ApiResult<Value> {
    let password = body
        .as_object_mut()
        .and_then(|fields| {
            fields.remove("passwordHash");
            fields.remove("password")
        })
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| {
            ApiError::from(ValidationError::Required {
                field: "password".to_string(),
            })
        })?;

    let user: User = decode_body(body)?;
    let user = warehouse.users().create_with_password(user, &password).await?;
    Ok(user.to_api())
}

pub async fn list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Value>>> {
    let collection = parse_collection(&slug)?;
    let docs = with_entity!(collection, T => list_all::<T>(&state.warehouse, params.include_archived).await)?;
    debug!(collection = %collection, count = docs.len(), "Listed records");
    Ok(Json(docs))
}

pub async fn read(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let collection = parse_collection(&slug)?;
    let doc = with_entity!(collection, T => read_one::<T>(&state.warehouse, &id).await)?;
    Ok(Json(doc))
}

pub async fn create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let collection = parse_collection(&slug)?;
    let doc = match collection {
        Collection::Users => create_user(&state.warehouse, body).await?,
        other => with_entity!(other, T => create_one::<T>(&state.warehouse, body).await)?,
    };
    info!(collection = %collection, id = ?doc.get("id"), "Record created");
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let collection = parse_collection(&slug)?;
    let doc = with_entity!(collection, T => update_one::<T>(&state.warehouse, &id, body).await)?;
    debug!(collection = %collection, id = %id, "Record updated");
    Ok(Json(doc))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let collection = parse_collection(&slug)?;
    with_entity!(collection, T => delete_one::<T>(&state.warehouse, &id).await)?;
    info!(collection = %collection, id = %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::router;
    use crate::state::AppState;
    use crate::config::DepotConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use depot_store::Warehouse;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Warehouse::memory(), DepotConfig::default()))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_crud_round() {
        let app = app();

        let (status, created) = send(&app, "POST", "/api/suppliers", Some(json!({ "name": "Acme" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, "GET", &format!("/api/suppliers/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Acme");

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/suppliers/{id}"),
            Some(json!({ "name": "Acme Packaging" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Acme Packaging");
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (_, listed) = send(&app, "GET", "/api/suppliers", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/suppliers/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &format!("/api/suppliers/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unknown_collection_and_bad_body() {
        let app = app();
        let (status, _) = send(&app, "GET", "/api/widgets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "POST", "/api/inventory", Some(json!({ "name": "No SKU" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_sku_conflicts() {
        let app = app();
        let item = json!({ "sku": "PAL-001", "name": "Euro pallet" });
        send(&app, "POST", "/api/inventory", Some(item.clone())).await;
        let (status, body) = send(&app, "POST", "/api/inventory", Some(item)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "DUPLICATE");
    }

    #[tokio::test]
    async fn test_users_never_expose_password_hash() {
        let app = app();
        let (status, _) = send(&app, "POST", "/api/users", Some(json!({ "username": "dana", "role": "admin" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, user) = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({ "username": "dana", "role": "admin", "password": "correct horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(user.get("passwordHash").is_none());

        let (_, listed) = send(&app, "GET", "/api/users", None).await;
        assert!(listed[0].get("passwordHash").is_none());

        let (_, verdict) = send(
            &app,
            "POST",
            "/api/auth/verify",
            Some(json!({ "username": "Dana", "password": "correct horse" })),
        )
        .await;
        assert_eq!(verdict["valid"], true);
    }

    #[tokio::test]
    async fn test_workflow_state_only_moves_through_actions() {
        let app = app();
        let (_, supplier) = send(&app, "POST", "/api/suppliers", Some(json!({ "name": "Acme" }))).await;
        let (_, item) = send(
            &app,
            "POST",
            "/api/inventory",
            Some(json!({ "sku": "PAL-001", "name": "Euro pallet", "quantity": 5 })),
        )
        .await;

        let (status, po) = send(
            &app,
            "POST",
            "/api/purchase-orders",
            Some(json!({
                "poNumber": "PO-1",
                "supplierId": supplier["id"],
                "status": "Received",
                "amountPaidCents": 700,
                "lines": [{ "itemId": item["id"], "quantity": 10, "quantityReceived": 10, "unitCostCents": 100 }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(po["status"], "Draft");
        assert_eq!(po["lines"][0]["quantityReceived"], 0);
        assert_eq!(po["amountPaidCents"], 0);
        assert_eq!(po["balanceCents"], 1000);

        let (_, order) = send(&app, "POST", "/api/orders", Some(json!({ "orderNumber": "ORD-1" }))).await;
        let id = order["id"].as_str().unwrap();
        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/orders/{id}"),
            Some(json!({ "orderNumber": "ORD-1", "status": "Delivered" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "Pending");

        let (status, body) = send(
            &app,
            "POST",
            "/api/purchase-orders",
            Some(json!({
                "poNumber": "PO-2",
                "supplierId": supplier["id"],
                "lines": [{ "itemId": item["id"], "quantity": i64::MAX / 2, "unitCostCents": 3 }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_include_archived_filter() {
        let app = app();
        let (_, created) = send(&app, "POST", "/api/categories", Some(json!({ "name": "Pallets" }))).await;
        let id = created["id"].as_str().unwrap();
        let (status, _) = send(&app, "POST", &format!("/api/categories/{id}/archive"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, active) = send(&app, "GET", "/api/categories", None).await;
        assert!(active.as_array().unwrap().is_empty());
        let (_, all) = send(&app, "GET", "/api/categories?includeArchived=true", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    }
}
