use async_trait::async_trait;

use crate::domain::{
    error::WorkflowError,
    models::{Decision, TimeEntry, Timesheet, TimesheetId, TimesheetPeriod, UserId},
};

#[async_trait]
pub trait TimesheetStore: Send + Sync + 'static {
    async fn get(&self, id: TimesheetId) -> Result<Option<Timesheet>, WorkflowError>;

    async fn entries_of(&self, id: TimesheetId) -> Result<Vec<TimeEntry>, WorkflowError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Timesheet>, WorkflowError>;

    /// Whether another timesheet of the same user intersects `period`.
    async fn overlapping_exists(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
        exclude: Option<TimesheetId>,
    ) -> Result<bool, WorkflowError>;

    /// Insert a draft. The store is the write-time serialization point for
    /// the overlap invariant; a concurrent insert losing the race comes back
    /// as the same validation error the pre-check would have produced.
    async fn insert(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError>;

    async fn update_period(
        &self,
        id: TimesheetId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError>;

    /// Flip the timesheet to pending and reset every attached entry to
    /// pending (decision fields cleared), in one transaction.
    async fn mark_submitted(&self, id: TimesheetId) -> Result<Timesheet, WorkflowError>;

    /// Cascade a decision onto the timesheet and all attached entries as one
    /// atomic unit: either every row changes or none does. The timesheet
    /// write is guarded on `pending`.
    async fn apply_decision(
        &self,
        id: TimesheetId,
        decision: &Decision,
    ) -> Result<(Timesheet, Vec<TimeEntry>), WorkflowError>;

    /// Delete the timesheet, detaching (never destroying) its entries.
    async fn delete_detaching_entries(&self, id: TimesheetId) -> Result<(), WorkflowError>;
}
