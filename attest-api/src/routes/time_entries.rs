use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use time::Date;
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::models::{
        ActivityId, IssueId, NewTimeEntry, ProjectId, TimeEntry, TimeEntryId, TimeEntryPatch,
        TimesheetId, UserId,
    },
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/:id", put(update).delete(remove))
        .route("/:id/approve", post(approve))
        .route("/:id/reject", post(reject))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntryPayload {
    user_id: i32,
    author_id: i32,
    project_id: i32,
    issue_id: Option<i32>,
    activity_id: i32,
    timesheet_id: Option<i32>,
    spent_on: Date,
    hours: f64,
    comments: Option<String>,
}

#[instrument(name = "create_time_entry", skip(app_state, body))]
async fn create(
    State(app_state): State<AppState>,
    Json(body): Json<CreateTimeEntryPayload>,
) -> Result<(StatusCode, Json<TimeEntry>), ApiError> {
    let new = NewTimeEntry {
        user_id: UserId::new(body.user_id),
        author_id: UserId::new(body.author_id),
        project_id: ProjectId::new(body.project_id),
        issue_id: body.issue_id.map(IssueId::new),
        activity_id: ActivityId::new(body.activity_id),
        timesheet_id: body.timesheet_id.map(TimesheetId::new),
        spent_on: body.spent_on,
        hours: body.hours,
        comments: body.comments,
    };

    let entry = app_state.time_entries.create(new).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeEntryPayload {
    user_id: i32,
    project_id: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    issue_id: Option<Option<i32>>,
    activity_id: Option<i32>,
    spent_on: Option<Date>,
    hours: Option<f64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    comments: Option<Option<String>>,
}

#[instrument(name = "update_time_entry", skip(app_state, body))]
async fn update(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateTimeEntryPayload>,
) -> Result<Json<TimeEntry>, ApiError> {
    let patch = TimeEntryPatch {
        project_id: body.project_id.map(ProjectId::new),
        issue_id: body.issue_id.map(|o| o.map(IssueId::new)),
        activity_id: body.activity_id.map(ActivityId::new),
        spent_on: body.spent_on,
        hours: body.hours,
        comments: body.comments,
    };

    let entry = app_state
        .time_entries
        .update(TimeEntryId::new(id), UserId::new(body.user_id), patch)
        .await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorPayload {
    user_id: i32,
}

#[instrument(name = "delete_time_entry", skip(app_state, body))]
async fn remove(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ActorPayload>,
) -> Result<StatusCode, ApiError> {
    app_state
        .time_entries
        .delete(TimeEntryId::new(id), UserId::new(body.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    approver_id: i32,
}

#[instrument(name = "approve_time_entry", skip(app_state, body))]
async fn approve(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ApprovePayload>,
) -> Result<Json<TimeEntry>, ApiError> {
    let entry = app_state
        .time_entries
        .approve(TimeEntryId::new(id), UserId::new(body.approver_id))
        .await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    approver_id: i32,
    reason: String,
}

#[instrument(name = "reject_time_entry", skip(app_state, body))]
async fn reject(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<RejectPayload>,
) -> Result<Json<TimeEntry>, ApiError> {
    let entry = app_state
        .time_entries
        .reject(
            TimeEntryId::new(id),
            UserId::new(body.approver_id),
            body.reason,
        )
        .await?;
    Ok(Json(entry))
}
