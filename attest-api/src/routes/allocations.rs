use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use time::Date;
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::{
        models::{Allocation, ProjectId, UserId},
        ports::outbound::AllocationRegistry,
    },
    routes::ApiError,
};

/// Thin registry surface used by membership management.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", put(upsert))
        .route("/:user_id/:project_id", get(show).delete(remove))
}

fn default_percentage() -> f64 {
    100.0
}

fn default_billable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPayload {
    user_id: i32,
    project_id: i32,
    #[serde(default = "default_percentage")]
    allocation_percentage: f64,
    start_date: Option<Date>,
    end_date: Option<Date>,
    #[serde(default = "default_billable")]
    billable: bool,
}

#[instrument(name = "upsert_allocation", skip(app_state, body))]
async fn upsert(
    State(app_state): State<AppState>,
    Json(body): Json<AllocationPayload>,
) -> Result<Json<Allocation>, ApiError> {
    let allocation = Allocation {
        user_id: UserId::new(body.user_id),
        project_id: ProjectId::new(body.project_id),
        allocation_percentage: body.allocation_percentage,
        start_date: body.start_date,
        end_date: body.end_date,
        billable: body.billable,
    };

    let stored = app_state.allocations.upsert(&allocation).await?;
    Ok(Json(stored))
}

#[instrument(name = "show_allocation", skip(app_state))]
async fn show(
    State(app_state): State<AppState>,
    Path((user_id, project_id)): Path<(i32, i32)>,
) -> Result<Json<Allocation>, ApiError> {
    let allocation = app_state
        .allocations
        .find(UserId::new(user_id), ProjectId::new(project_id))
        .await?
        .ok_or_else(|| ApiError::not_found("allocation not found"))?;
    Ok(Json(allocation))
}

#[instrument(name = "remove_allocation", skip(app_state))]
async fn remove(
    State(app_state): State<AppState>,
    Path((user_id, project_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .allocations
        .remove(UserId::new(user_id), ProjectId::new(project_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
