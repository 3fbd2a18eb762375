use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use time::Date;

use crate::domain::{
    error::{AuthorizationError, ValidationError, ValidationErrors, WorkflowError},
    models::{
        Capability, Decision, TimeEntry, Timesheet, TimesheetId, TimesheetPeriod,
        TimesheetStatus, UserId, Verdict, WorkflowEvent,
    },
    ports::{
        inbound::TimesheetWorkflow,
        outbound::{
            AllocationRegistry, AuthorizationOracle, Clock, NotificationSink, TimeEntryStore,
            TimesheetStore,
        },
    },
    services::capacity::{CandidateEntry, CapacityValidator},
};

/// State machine for the weekly aggregate.
///
/// draft → pending → {approved, rejected}, with rejected → pending for
/// resubmission. Approval and rejection cascade onto every attached entry in
/// one atomic store operation; a failed cascade leaves nothing changed.
pub struct TimesheetService<A, E, T, O, N, C> {
    validator: CapacityValidator<A, E>,
    timesheets: Arc<T>,
    oracle: Arc<O>,
    sink: Arc<N>,
    clock: Arc<C>,
}

impl<A, E, T, O, N, C> TimesheetService<A, E, T, O, N, C>
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
        timesheets: Arc<T>,
        oracle: Arc<O>,
        sink: Arc<N>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            validator,
            timesheets,
            oracle,
            sink,
            clock,
        }
    }

    async fn load(&self, id: TimesheetId) -> Result<Timesheet, WorkflowError> {
        self.timesheets
            .get(id)
            .await?
            .ok_or(WorkflowError::NotFound("timesheet"))
    }

    /// The approver must hold the capability on at least one project the
    /// sheet touches, or a global approve-all grant.
    async fn can_approve(
        &self,
        approver: UserId,
        entries: &[TimeEntry],
    ) -> Result<bool, WorkflowError> {
        if self
            .oracle
            .has_capability(approver, Capability::ApproveAllTimeEntries, None)
            .await?
        {
            return Ok(true);
        }
        let project_ids: Vec<_> = entries.iter().map(|e| e.project_id).unique().collect();
        for project_id in project_ids {
            if self
                .oracle
                .has_capability(approver, Capability::ApproveTimeEntries, Some(project_id))
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn guard_decision(
        &self,
        timesheet: &Timesheet,
        approver: UserId,
    ) -> Result<Vec<TimeEntry>, WorkflowError> {
        if approver == timesheet.user_id {
            return Err(AuthorizationError::SelfApproval.into());
        }
        if timesheet.status != TimesheetStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "decide",
                timesheet.status,
            ));
        }
        let entries = self.timesheets.entries_of(timesheet.id).await?;
        if !self.can_approve(approver, &entries).await? {
            return Err(
                AuthorizationError::MissingCapability(Capability::ApproveTimeEntries).into(),
            );
        }
        Ok(entries)
    }

    async fn decide(
        &self,
        id: TimesheetId,
        approver: UserId,
        verdict: Verdict,
        reason: Option<String>,
    ) -> Result<Timesheet, WorkflowError> {
        let timesheet = self.load(id).await?;
        self.guard_decision(&timesheet, approver).await?;

        let decision = match verdict {
            Verdict::Approved => Decision::approve(approver, self.clock.now()),
            Verdict::Rejected => {
                let reason = reason.unwrap_or_default();
                if reason.trim().is_empty() {
                    return Err(ValidationError::ReasonRequired.into());
                }
                Decision::reject(approver, self.clock.now(), reason)
            }
        };

        let (timesheet, cascaded) = self.timesheets.apply_decision(id, &decision).await?;

        for entry in cascaded {
            let event = match verdict {
                Verdict::Approved => WorkflowEvent::TimeEntryApproved { entry },
                Verdict::Rejected => WorkflowEvent::TimeEntryRejected { entry },
            };
            self.sink.publish(event).await;
        }
        Ok(timesheet)
    }
}

#[async_trait]
impl<A, E, T, O, N, C> TimesheetWorkflow for TimesheetService<A, E, T, O, N, C>
where
    A: AllocationRegistry,
    E: TimeEntryStore,
    T: TimesheetStore,
    O: AuthorizationOracle,
    N: NotificationSink,
    C: Clock,
{
    async fn create(
        &self,
        user_id: UserId,
        start_date: Date,
    ) -> Result<Timesheet, WorkflowError> {
        let period = TimesheetPeriod::week_starting(start_date);
        if self
            .timesheets
            .overlapping_exists(user_id, &period, None)
            .await?
        {
            return Err(ValidationError::OverlappingPeriod.into());
        }
        self.timesheets.insert(user_id, &period).await
    }

    async fn get(&self, id: TimesheetId) -> Result<(Timesheet, Vec<TimeEntry>), WorkflowError> {
        let timesheet = self.load(id).await?;
        let entries = self.timesheets.entries_of(id).await?;
        Ok((timesheet, entries))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Timesheet>, WorkflowError> {
        self.timesheets.list_for_user(user_id).await
    }

    async fn update_period(
        &self,
        id: TimesheetId,
        actor: UserId,
        start_date: Date,
    ) -> Result<Timesheet, WorkflowError> {
        let timesheet = self.load(id).await?;
        if timesheet.user_id != actor {
            return Err(AuthorizationError::NotOwner.into());
        }
        if !timesheet.is_editable() {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "edit",
                timesheet.status,
            ));
        }

        let period = TimesheetPeriod::week_starting(start_date);
        if self
            .timesheets
            .overlapping_exists(actor, &period, Some(id))
            .await?
        {
            return Err(ValidationError::OverlappingPeriod.into());
        }
        self.timesheets.update_period(id, &period).await
    }

    async fn submit(&self, id: TimesheetId, actor: UserId) -> Result<Timesheet, WorkflowError> {
        let timesheet = self.load(id).await?;
        if timesheet.user_id != actor {
            return Err(AuthorizationError::NotOwner.into());
        }
        if !timesheet.is_submittable() {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "submit",
                timesheet.status,
            ));
        }
        let entries = self.timesheets.entries_of(id).await?;
        if entries.is_empty() {
            return Err(ValidationError::NoEntries.into());
        }

        // Resubmission re-admits every entry before anything flips back to
        // pending; the world may have changed since the original admission.
        if timesheet.status == TimesheetStatus::Rejected {
            let today = self.clock.today();
            let mut errors = ValidationErrors::new();
            for entry in &entries {
                if let Err(WorkflowError::Validation(entry_errors)) = self
                    .validator
                    .admit(&CandidateEntry::from(entry), today)
                    .await
                {
                    for error in entry_errors {
                        errors.push(error);
                    }
                }
            }
            errors.into_result()?;
        }

        let projects = entries.iter().map(|e| e.project_id).unique().collect();
        let timesheet = self.timesheets.mark_submitted(id).await?;
        self.sink
            .publish(WorkflowEvent::TimesheetPending {
                timesheet: timesheet.clone(),
                projects,
            })
            .await;
        Ok(timesheet)
    }

    async fn approve(
        &self,
        id: TimesheetId,
        approver: UserId,
    ) -> Result<Timesheet, WorkflowError> {
        self.decide(id, approver, Verdict::Approved, None).await
    }

    async fn reject(
        &self,
        id: TimesheetId,
        approver: UserId,
        reason: String,
    ) -> Result<Timesheet, WorkflowError> {
        self.decide(id, approver, Verdict::Rejected, Some(reason))
            .await
    }

    async fn delete(&self, id: TimesheetId, actor: UserId) -> Result<(), WorkflowError> {
        let timesheet = self.load(id).await?;
        if timesheet.user_id != actor {
            return Err(AuthorizationError::NotOwner.into());
        }
        if !timesheet.is_editable() {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "delete",
                timesheet.status,
            ));
        }
        self.timesheets.delete_detaching_entries(id).await
    }
}
