use async_trait::async_trait;

use crate::domain::{
    error::WorkflowError,
    models::{NewTimeEntry, TimeEntry, TimeEntryId, TimeEntryPatch, UserId},
};

/// Use cases of the time entry lifecycle, as invoked by HTTP handlers and
/// the bulk coordinator.
#[async_trait]
pub trait TimeEntryWorkflow: Send + Sync + 'static {
    /// Admit and persist a candidate entry; it always enters `pending`.
    async fn create(&self, new: NewTimeEntry) -> Result<TimeEntry, WorkflowError>;

    /// Owner-only edit; re-runs admission and enforces the approved-entry
    /// immutability invariant.
    async fn update(
        &self,
        id: TimeEntryId,
        actor: UserId,
        patch: TimeEntryPatch,
    ) -> Result<TimeEntry, WorkflowError>;

    async fn approve(&self, id: TimeEntryId, approver: UserId)
        -> Result<TimeEntry, WorkflowError>;

    async fn reject(
        &self,
        id: TimeEntryId,
        approver: UserId,
        reason: String,
    ) -> Result<TimeEntry, WorkflowError>;

    /// Owner-only, and only while the entry is still pending.
    async fn delete(&self, id: TimeEntryId, actor: UserId) -> Result<(), WorkflowError>;
}
