use async_trait::async_trait;
use time::Date;

use crate::domain::{
    error::WorkflowError,
    models::{Decision, NewTimeEntry, TimeEntry, TimeEntryId, UserId},
};

/// The capacity ceilings a write must still satisfy at commit time.
///
/// Validation reads the current day aggregate without a lock; two concurrent
/// admits could both see room. The store re-checks these limits inside its
/// own serialization point (user-day lock) so the pair cannot jointly exceed
/// capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapacityLimits {
    /// Allocation-derived daily ceiling; `None` for full-capacity users.
    pub allocation: Option<AllocationCeiling>,
    /// Global per-day ceiling; `None` when unlimited.
    pub global_max_hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationCeiling {
    pub max_hours: f64,
    pub percentage: f64,
}

#[async_trait]
pub trait TimeEntryStore: Send + Sync + 'static {
    async fn get(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, WorkflowError>;

    /// Sum of hours logged by the user on `day` across all projects,
    /// excluding `exclude` when re-validating an update.
    async fn hours_for_user_on(
        &self,
        user_id: UserId,
        day: Date,
        exclude: Option<TimeEntryId>,
    ) -> Result<f64, WorkflowError>;

    /// Insert an admitted entry, re-checking `limits` under the user-day
    /// serialization point.
    async fn insert(
        &self,
        entry: &NewTimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError>;

    /// Persist an updated entry, re-checking `limits` the same way.
    async fn update(
        &self,
        entry: &TimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError>;

    /// Apply an approval/rejection to a single pending entry. The write is
    /// guarded on the current status; a lost race surfaces as a state
    /// conflict, never a double transition.
    async fn apply_decision(
        &self,
        id: TimeEntryId,
        decision: &Decision,
    ) -> Result<TimeEntry, WorkflowError>;

    async fn delete(&self, id: TimeEntryId) -> Result<(), WorkflowError>;
}
