use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::{Date, OffsetDateTime};

use crate::domain::models::{ActivityId, IssueId, ProjectId, TimeEntryId, TimesheetId, UserId};

/// Upper bound on the free-text comment attached to an entry.
pub const MAX_COMMENT_LENGTH: usize = 1024;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

/// A single loggable unit of time, owned by the user who logged it.
///
/// Entries enter the world `pending` and only ever move to `approved` or
/// `rejected`, either individually or through their timesheet's cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub user_id: UserId,
    pub author_id: UserId,
    pub project_id: ProjectId,
    pub issue_id: Option<IssueId>,
    pub activity_id: ActivityId,
    pub timesheet_id: Option<TimesheetId>,
    pub spent_on: Date,
    pub hours: f64,
    pub comments: Option<String>,
    pub status: EntryStatus,
    pub approved_by_id: Option<UserId>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_on: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
}

impl TimeEntry {
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == EntryStatus::Approved
    }
}

/// A candidate entry, not yet admitted or persisted.
#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub user_id: UserId,
    pub author_id: UserId,
    pub project_id: ProjectId,
    pub issue_id: Option<IssueId>,
    pub activity_id: ActivityId,
    pub timesheet_id: Option<TimesheetId>,
    pub spent_on: Date,
    pub hours: f64,
    pub comments: Option<String>,
}

/// Field changes requested for an existing entry. `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct TimeEntryPatch {
    pub project_id: Option<ProjectId>,
    pub issue_id: Option<Option<IssueId>>,
    pub activity_id: Option<ActivityId>,
    pub spent_on: Option<Date>,
    pub hours: Option<f64>,
    pub comments: Option<Option<String>>,
}

/// Round hours to minute granularity to avoid floating point drift.
///
/// 0.38333333 (23m) becomes 23/60; 59m 30s rounds up to a full hour.
pub fn normalize_hours(hours: f64) -> f64 {
    (hours * 60.0).round() / 60.0
}
