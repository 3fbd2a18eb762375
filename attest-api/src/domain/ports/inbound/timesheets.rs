use async_trait::async_trait;
use time::Date;

use crate::domain::{
    error::WorkflowError,
    models::{TimeEntry, Timesheet, TimesheetId, UserId},
};

/// Use cases of the timesheet lifecycle.
#[async_trait]
pub trait TimesheetWorkflow: Send + Sync + 'static {
    /// Create a draft covering `[start_date, start_date + 6]`.
    async fn create(&self, user_id: UserId, start_date: Date)
        -> Result<Timesheet, WorkflowError>;

    async fn get(&self, id: TimesheetId) -> Result<(Timesheet, Vec<TimeEntry>), WorkflowError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Timesheet>, WorkflowError>;

    /// Owner-only period change while the sheet is a draft.
    async fn update_period(
        &self,
        id: TimesheetId,
        actor: UserId,
        start_date: Date,
    ) -> Result<Timesheet, WorkflowError>;

    /// Owner submit: draft → pending, or rejected → pending (resubmission,
    /// which re-admits every attached entry).
    async fn submit(&self, id: TimesheetId, actor: UserId) -> Result<Timesheet, WorkflowError>;

    /// Approve the sheet and cascade onto every attached entry atomically.
    async fn approve(
        &self,
        id: TimesheetId,
        approver: UserId,
    ) -> Result<Timesheet, WorkflowError>;

    async fn reject(
        &self,
        id: TimesheetId,
        approver: UserId,
        reason: String,
    ) -> Result<Timesheet, WorkflowError>;

    /// Owner-only delete while a draft; entries are detached, not destroyed.
    async fn delete(&self, id: TimesheetId, actor: UserId) -> Result<(), WorkflowError>;
}
