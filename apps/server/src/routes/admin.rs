//! Password verification and the document migration pass.

use axum::extract::State;
use axum::Json;
use depot_store::MigrationReport;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// Checks a username and password pair. Never says which half was wrong.
pub async fn verify_password(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let valid = state
        .warehouse
        .users()
        .verify_password(&request.username, &request.password)
        .await?;
    if !valid {
        warn!(username = %request.username, "Password verification failed");
    }
    Ok(Json(VerifyResponse { valid }))
}

pub async fn migrate(State(state): State<AppState>) -> ApiResult<Json<MigrationReport>> {
    let report = state.warehouse.migrate_all().await?;
    info!(rewritten = report.total, "Migration requested over HTTP");
    Ok(Json(report))
}
