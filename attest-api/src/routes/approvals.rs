use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::{
        models::UserId,
        services::{BulkKind, BulkOutcome},
    },
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bulk-approve", post(bulk_approve))
        .route("/bulk-reject", post(bulk_reject))
        .route("/bulk-submit", post(bulk_submit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkApprovePayload {
    kind: BulkKind,
    ids: Vec<i32>,
    approver_id: i32,
}

#[instrument(name = "bulk_approve", skip(app_state, body))]
async fn bulk_approve(
    State(app_state): State<AppState>,
    Json(body): Json<BulkApprovePayload>,
) -> Result<Json<BulkOutcome>, ApiError> {
    let outcome = app_state
        .bulk
        .bulk_approve(body.kind, &body.ids, UserId::new(body.approver_id))
        .await;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRejectPayload {
    kind: BulkKind,
    ids: Vec<i32>,
    approver_id: i32,
    reason: String,
}

#[instrument(name = "bulk_reject", skip(app_state, body))]
async fn bulk_reject(
    State(app_state): State<AppState>,
    Json(body): Json<BulkRejectPayload>,
) -> Result<Json<BulkOutcome>, ApiError> {
    let outcome = app_state
        .bulk
        .bulk_reject(
            body.kind,
            &body.ids,
            UserId::new(body.approver_id),
            body.reason,
        )
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSubmitPayload {
    ids: Vec<i32>,
    user_id: i32,
}

#[instrument(name = "bulk_submit", skip(app_state, body))]
async fn bulk_submit(
    State(app_state): State<AppState>,
    Json(body): Json<BulkSubmitPayload>,
) -> Result<Json<BulkOutcome>, ApiError> {
    let outcome = app_state
        .bulk
        .bulk_submit(&body.ids, UserId::new(body.user_id))
        .await;
    Ok(Json(outcome))
}
