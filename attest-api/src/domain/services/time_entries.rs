use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    error::{AuthorizationError, ValidationError, WorkflowError},
    models::{
        normalize_hours, Capability, Decision, EntryStatus, NewTimeEntry, ProjectId, TimeEntry,
        TimeEntryId, TimeEntryPatch, UserId, WorkflowEvent,
    },
    ports::{
        inbound::TimeEntryWorkflow,
        outbound::{
            AllocationRegistry, AuthorizationOracle, Clock, NotificationSink, TimeEntryStore,
            TimesheetStore,
        },
    },
    services::capacity::{CandidateEntry, CapacityValidator},
};

/// State machine for a single loggable unit of time.
///
/// Creation and update run through the capacity validator; approval and
/// rejection are terminal transitions guarded against self-approval and
/// missing capabilities. Successful transitions emit events; event delivery
/// never unwinds a transition.
pub struct TimeEntryService<A, E, T, O, N, C> {
    validator: CapacityValidator<A, E>,
    entries: Arc<E>,
    timesheets: Arc<T>,
    oracle: Arc<O>,
    sink: Arc<N>,
    clock: Arc<C>,
}

impl<A, E, T, O, N, C> TimeEntryService<A, E, T, O, N, C>
where
    A: AllocationRegistry,
    E: TimeEntryStore,
    T: TimesheetStore,
    O: AuthorizationOracle,
    N: NotificationSink,
    C: Clock,
{
    pub fn new(
        validator: CapacityValidator<A, E>,
        entries: Arc<E>,
        timesheets: Arc<T>,
        oracle: Arc<O>,
        sink: Arc<N>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            validator,
            entries,
            timesheets,
            oracle,
            sink,
            clock,
        }
    }

    async fn can_approve(
        &self,
        approver: UserId,
        project_id: ProjectId,
    ) -> Result<bool, WorkflowError> {
        if self
            .oracle
            .has_capability(approver, Capability::ApproveAllTimeEntries, None)
            .await?
        {
            return Ok(true);
        }
        self.oracle
            .has_capability(approver, Capability::ApproveTimeEntries, Some(project_id))
            .await
    }

    async fn load(&self, id: TimeEntryId) -> Result<TimeEntry, WorkflowError> {
        self.entries
            .get(id)
            .await?
            .ok_or(WorkflowError::NotFound("time entry"))
    }

    /// Shared approve/reject guards, in order: self-approval, state,
    /// capability.
    async fn guard_decision(&self, entry: &TimeEntry, approver: UserId) -> Result<(), WorkflowError> {
        if approver == entry.user_id {
            return Err(AuthorizationError::SelfApproval.into());
        }
        if entry.status != EntryStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "time entry",
                "decide",
                entry.status,
            ));
        }
        if !self.can_approve(approver, entry.project_id).await? {
            return Err(
                AuthorizationError::MissingCapability(Capability::ApproveTimeEntries).into(),
            );
        }
        Ok(())
    }

    /// Entries attached to a submitted or approved sheet are frozen along
    /// with it; drafts and rejected sheets accept changes.
    async fn guard_parent_editable(&self, entry: &TimeEntry) -> Result<(), WorkflowError> {
        if let Some(timesheet_id) = entry.timesheet_id {
            let timesheet = self
                .timesheets
                .get(timesheet_id)
                .await?
                .ok_or(WorkflowError::NotFound("timesheet"))?;
            if !timesheet.accepts_entry_changes() {
                return Err(WorkflowError::state_conflict(
                    "timesheet",
                    "modify entries of",
                    timesheet.status,
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<A, E, T, O, N, C> TimeEntryWorkflow for TimeEntryService<A, E, T, O, N, C>
where
    A: AllocationRegistry,
    E: TimeEntryStore,
    T: TimesheetStore,
    O: AuthorizationOracle,
    N: NotificationSink,
    C: Clock,
{
    async fn create(&self, new: NewTimeEntry) -> Result<TimeEntry, WorkflowError> {
        let mut new = new;
        new.hours = normalize_hours(new.hours);

        if !self
            .oracle
            .has_capability(new.author_id, Capability::LogTime, Some(new.project_id))
            .await?
        {
            return Err(AuthorizationError::MissingCapability(Capability::LogTime).into());
        }
        if new.user_id != new.author_id
            && !self
                .oracle
                .has_capability(
                    new.author_id,
                    Capability::LogTimeForOtherUsers,
                    Some(new.project_id),
                )
                .await?
        {
            return Err(
                AuthorizationError::MissingCapability(Capability::LogTimeForOtherUsers).into(),
            );
        }

        if let Some(timesheet_id) = new.timesheet_id {
            let timesheet = self
                .timesheets
                .get(timesheet_id)
                .await?
                .ok_or(WorkflowError::NotFound("timesheet"))?;
            if timesheet.user_id != new.user_id {
                return Err(AuthorizationError::NotOwner.into());
            }
            if !timesheet.accepts_entry_changes() {
                return Err(WorkflowError::state_conflict(
                    "timesheet",
                    "attach entries to",
                    timesheet.status,
                ));
            }
        }

        let limits = self
            .validator
            .admit(&CandidateEntry::from(&new), self.clock.today())
            .await?;
        let entry = self.entries.insert(&new, &limits).await?;

        self.sink
            .publish(WorkflowEvent::TimeEntryPending {
                entry: entry.clone(),
            })
            .await;
        Ok(entry)
    }

    async fn update(
        &self,
        id: TimeEntryId,
        actor: UserId,
        patch: TimeEntryPatch,
    ) -> Result<TimeEntry, WorkflowError> {
        let current = self.load(id).await?;
        if current.user_id != actor {
            return Err(AuthorizationError::NotOwner.into());
        }
        self.guard_parent_editable(&current).await?;

        let mut updated = current.clone();
        if let Some(project_id) = patch.project_id {
            updated.project_id = project_id;
        }
        if let Some(issue_id) = patch.issue_id {
            updated.issue_id = issue_id;
        }
        if let Some(activity_id) = patch.activity_id {
            updated.activity_id = activity_id;
        }
        if let Some(spent_on) = patch.spent_on {
            updated.spent_on = spent_on;
        }
        if let Some(hours) = patch.hours {
            updated.hours = normalize_hours(hours);
        }
        if let Some(comments) = patch.comments {
            updated.comments = comments;
        }

        // Approved entries never change shape; reject loudly instead of
        // silently reverting.
        let shape_changed = updated.hours != current.hours
            || updated.spent_on != current.spent_on
            || updated.project_id != current.project_id
            || updated.issue_id != current.issue_id
            || updated.activity_id != current.activity_id;
        if current.status == EntryStatus::Approved && shape_changed {
            return Err(ValidationError::ApprovedEntryImmutable.into());
        }

        let limits = self
            .validator
            .admit(&CandidateEntry::from(&updated), self.clock.today())
            .await?;
        self.entries.update(&updated, &limits).await
    }

    async fn approve(
        &self,
        id: TimeEntryId,
        approver: UserId,
    ) -> Result<TimeEntry, WorkflowError> {
        let entry = self.load(id).await?;
        self.guard_decision(&entry, approver).await?;

        let decision = Decision::approve(approver, self.clock.now());
        let entry = self.entries.apply_decision(id, &decision).await?;

        self.sink
            .publish(WorkflowEvent::TimeEntryApproved {
                entry: entry.clone(),
            })
            .await;
        Ok(entry)
    }

    async fn reject(
        &self,
        id: TimeEntryId,
        approver: UserId,
        reason: String,
    ) -> Result<TimeEntry, WorkflowError> {
        let entry = self.load(id).await?;
        self.guard_decision(&entry, approver).await?;
        if reason.trim().is_empty() {
            return Err(ValidationError::ReasonRequired.into());
        }

        let decision = Decision::reject(approver, self.clock.now(), reason);
        let entry = self.entries.apply_decision(id, &decision).await?;

        self.sink
            .publish(WorkflowEvent::TimeEntryRejected {
                entry: entry.clone(),
            })
            .await;
        Ok(entry)
    }

    async fn delete(&self, id: TimeEntryId, actor: UserId) -> Result<(), WorkflowError> {
        let entry = self.load(id).await?;
        if entry.user_id != actor {
            return Err(AuthorizationError::NotOwner.into());
        }
        if entry.status != EntryStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "time entry",
                "delete",
                entry.status,
            ));
        }
        self.guard_parent_editable(&entry).await?;
        self.entries.delete(id).await
    }
}
