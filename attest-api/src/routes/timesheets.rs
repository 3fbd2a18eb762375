use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::models::{TimeEntry, Timesheet, TimesheetId, UserId},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(show).put(update_period).delete(remove))
        .route("/:id/submit", post(submit))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetPayload {
    user_id: i32,
    start_date: Date,
}

#[instrument(name = "create_timesheet", skip(app_state, body))]
async fn create(
    State(app_state): State<AppState>,
    Json(body): Json<TimesheetPayload>,
) -> Result<(StatusCode, Json<Timesheet>), ApiError> {
    let timesheet = app_state
        .timesheets
        .create(UserId::new(body.user_id), body.start_date)
        .await?;
    Ok((StatusCode::CREATED, Json(timesheet)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    user_id: i32,
}

#[instrument(name = "list_timesheets", skip(app_state))]
async fn list(
    State(app_state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Timesheet>>, ApiError> {
    let timesheets = app_state
        .timesheets
        .list_for_user(UserId::new(query.user_id))
        .await?;
    Ok(Json(timesheets))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetResponse {
    #[serde(flatten)]
    timesheet: Timesheet,
    entries: Vec<TimeEntry>,
    total_hours: f64,
}

#[instrument(name = "show_timesheet", skip(app_state))]
async fn show(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TimesheetResponse>, ApiError> {
    let (timesheet, entries) = app_state.timesheets.get(TimesheetId::new(id)).await?;
    let total_hours = entries.iter().map(|e| e.hours).sum();
    Ok(Json(TimesheetResponse {
        timesheet,
        entries,
        total_hours,
    }))
}

#[instrument(name = "update_timesheet", skip(app_state, body))]
async fn update_period(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<TimesheetPayload>,
) -> Result<Json<Timesheet>, ApiError> {
    let timesheet = app_state
        .timesheets
        .update_period(
            TimesheetId::new(id),
            UserId::new(body.user_id),
            body.start_date,
        )
        .await?;
    Ok(Json(timesheet))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorPayload {
    user_id: i32,
}

#[instrument(name = "delete_timesheet", skip(app_state, body))]
async fn remove(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ActorPayload>,
) -> Result<StatusCode, ApiError> {
    app_state
        .timesheets
        .delete(TimesheetId::new(id), UserId::new(body.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "submit_timesheet", skip(app_state, body))]
async fn submit(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ActorPayload>,
) -> Result<Json<Timesheet>, ApiError> {
    let timesheet = app_state
        .timesheets
        .submit(TimesheetId::new(id), UserId::new(body.user_id))
        .await?;
    Ok(Json(timesheet))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    approver_id: i32,
}

#[instrument(name = "approve_timesheet", skip(app_state, body))]
async fn approve(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ApprovePayload>,
) -> Result<Json<Timesheet>, ApiError> {
    let timesheet = app_state
        .timesheets
        .approve(TimesheetId::new(id), UserId::new(body.approver_id))
        .await?;
    Ok(Json(timesheet))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    approver_id: i32,
    reason: String,
}

#[instrument(name = "reject_timesheet", skip(app_state, body))]
async fn reject(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<RejectPayload>,
) -> Result<Json<Timesheet>, ApiError> {
    let timesheet = app_state
        .timesheets
        .reject(
            TimesheetId::new(id),
            UserId::new(body.approver_id),
            body.reason,
        )
        .await?;
    Ok(Json(timesheet))
}
