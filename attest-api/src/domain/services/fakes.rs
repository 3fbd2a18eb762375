//! In-memory fakes of the outbound ports, shared by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::domain::{
    error::{ValidationError, WorkflowError},
    models::{
        Allocation, Capability, Decision, EntryStatus, NewTimeEntry, Principal, ProjectId,
        TimeEntry, TimeEntryId, Timesheet, TimesheetId, TimesheetPeriod, TimesheetStatus, UserId,
        WorkflowEvent,
    },
    ports::outbound::{
        AllocationRegistry, ApproverDirectory, AuthorizationOracle, CapacityLimits, Clock,
        NotificationDelivery, NotificationSink, TimeEntryStore, TimesheetStore,
    },
};

// ---------------------------------------------------------------------------
// Allocations
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAllocations {
    allocations: Mutex<HashMap<(i32, i32), Allocation>>,
}

impl FakeAllocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocation(
        self,
        user_id: i32,
        project_id: i32,
        percentage: f64,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Self {
        self.allocations.lock().unwrap().insert(
            (user_id, project_id),
            Allocation {
                user_id: UserId::new(user_id),
                project_id: ProjectId::new(project_id),
                allocation_percentage: percentage,
                start_date,
                end_date,
                billable: true,
            },
        );
        self
    }
}

#[async_trait]
impl AllocationRegistry for FakeAllocations {
    async fn find(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Allocation>, WorkflowError> {
        Ok(self
            .allocations
            .lock()
            .unwrap()
            .get(&(user_id.as_i32(), project_id.as_i32()))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Combined entry + timesheet store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    entries: HashMap<i32, TimeEntry>,
    timesheets: HashMap<i32, Timesheet>,
    next_entry_id: i32,
    next_timesheet_id: i32,
}

/// One store for both aggregates so cascades can see the entries.
///
/// `fail_on_entry_write` injects a write failure for a specific entry inside
/// the cascade, to exercise the all-or-nothing contract.
#[derive(Default)]
pub struct FakeWorkflowStore {
    state: Mutex<StoreState>,
    fail_on_entry_write: Mutex<Option<TimeEntryId>>,
}

impl FakeWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_entry_write(&self, id: TimeEntryId) {
        *self.fail_on_entry_write.lock().unwrap() = Some(id);
    }

    pub fn entry(&self, id: TimeEntryId) -> Option<TimeEntry> {
        self.state.lock().unwrap().entries.get(&id.as_i32()).cloned()
    }

    pub fn timesheet(&self, id: TimesheetId) -> Option<Timesheet> {
        self.state
            .lock()
            .unwrap()
            .timesheets
            .get(&id.as_i32())
            .cloned()
    }

    fn check_limits(
        state: &StoreState,
        user_id: UserId,
        spent_on: Date,
        hours: f64,
        exclude: Option<TimeEntryId>,
        limits: &CapacityLimits,
    ) -> Result<(), WorkflowError> {
        let other: f64 = state
            .entries
            .values()
            .filter(|e| {
                e.user_id == user_id && e.spent_on == spent_on && Some(e.id) != exclude
            })
            .map(|e| e.hours)
            .sum();
        let total_hours = other + hours;
        if let Some(ceiling) = limits.allocation {
            if total_hours > ceiling.max_hours {
                return Err(ValidationError::ExceedsAllocationCapacity {
                    total_hours,
                    max_hours: ceiling.max_hours,
                    allocation: ceiling.percentage,
                }
                .into());
            }
        }
        if let Some(max_hours) = limits.global_max_hours {
            if total_hours > max_hours {
                return Err(ValidationError::ExceedsDailyMaximum {
                    total_hours,
                    max_hours,
                }
                .into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TimeEntryStore for FakeWorkflowStore {
    async fn get(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, WorkflowError> {
        Ok(self.entry(id))
    }

    async fn hours_for_user_on(
        &self,
        user_id: UserId,
        day: Date,
        exclude: Option<TimeEntryId>,
    ) -> Result<f64, WorkflowError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.spent_on == day && Some(e.id) != exclude)
            .map(|e| e.hours)
            .sum())
    }

    async fn insert(
        &self,
        entry: &NewTimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        Self::check_limits(&state, entry.user_id, entry.spent_on, entry.hours, None, limits)?;

        state.next_entry_id += 1;
        let id = TimeEntryId::new(state.next_entry_id);
        let stored = TimeEntry {
            id,
            user_id: entry.user_id,
            author_id: entry.author_id,
            project_id: entry.project_id,
            issue_id: entry.issue_id,
            activity_id: entry.activity_id,
            timesheet_id: entry.timesheet_id,
            spent_on: entry.spent_on,
            hours: entry.hours,
            comments: entry.comments.clone(),
            status: EntryStatus::Pending,
            approved_by_id: None,
            approved_on: None,
            rejection_reason: None,
        };
        state.entries.insert(id.as_i32(), stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        entry: &TimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        if !state.entries.contains_key(&entry.id.as_i32()) {
            return Err(WorkflowError::NotFound("time entry"));
        }
        Self::check_limits(
            &state,
            entry.user_id,
            entry.spent_on,
            entry.hours,
            Some(entry.id),
            limits,
        )?;
        state.entries.insert(entry.id.as_i32(), entry.clone());
        Ok(entry.clone())
    }

    async fn apply_decision(
        &self,
        id: TimeEntryId,
        decision: &Decision,
    ) -> Result<TimeEntry, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .get_mut(&id.as_i32())
            .ok_or(WorkflowError::NotFound("time entry"))?;
        if entry.status != EntryStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "time entry",
                "decide",
                entry.status,
            ));
        }
        entry.status = decision.entry_status();
        entry.approved_by_id = Some(decision.decided_by);
        entry.approved_on = Some(decision.decided_on);
        entry.rejection_reason = decision.reason.clone();
        Ok(entry.clone())
    }

    async fn delete(&self, id: TimeEntryId) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().unwrap();
        state
            .entries
            .remove(&id.as_i32())
            .map(|_| ())
            .ok_or(WorkflowError::NotFound("time entry"))
    }
}

#[async_trait]
impl TimesheetStore for FakeWorkflowStore {
    async fn get(&self, id: TimesheetId) -> Result<Option<Timesheet>, WorkflowError> {
        Ok(self.timesheet(id))
    }

    async fn entries_of(&self, id: TimesheetId) -> Result<Vec<TimeEntry>, WorkflowError> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<_> = state
            .entries
            .values()
            .filter(|e| e.timesheet_id == Some(id))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.id.as_i32());
        Ok(entries)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Timesheet>, WorkflowError> {
        let state = self.state.lock().unwrap();
        let mut sheets: Vec<_> = state
            .timesheets
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        sheets.sort_by_key(|t| std::cmp::Reverse(t.start_date));
        Ok(sheets)
    }

    async fn overlapping_exists(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
        exclude: Option<TimesheetId>,
    ) -> Result<bool, WorkflowError> {
        let state = self.state.lock().unwrap();
        Ok(state.timesheets.values().any(|t| {
            t.user_id == user_id && Some(t.id) != exclude && t.period().overlaps(period)
        }))
    }

    async fn insert(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        if state
            .timesheets
            .values()
            .any(|t| t.user_id == user_id && t.period().overlaps(period))
        {
            return Err(ValidationError::OverlappingPeriod.into());
        }

        state.next_timesheet_id += 1;
        let id = TimesheetId::new(state.next_timesheet_id);
        let sheet = Timesheet {
            id,
            user_id,
            start_date: period.start_date,
            end_date: period.end_date,
            status: TimesheetStatus::Draft,
            approved_by_id: None,
            approved_on: None,
            rejection_reason: None,
        };
        state.timesheets.insert(id.as_i32(), sheet.clone());
        Ok(sheet)
    }

    async fn update_period(
        &self,
        id: TimesheetId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        let user_id = state
            .timesheets
            .get(&id.as_i32())
            .ok_or(WorkflowError::NotFound("timesheet"))?
            .user_id;
        if state
            .timesheets
            .values()
            .any(|t| t.user_id == user_id && t.id != id && t.period().overlaps(period))
        {
            return Err(ValidationError::OverlappingPeriod.into());
        }
        let sheet = state.timesheets.get_mut(&id.as_i32()).unwrap();
        sheet.start_date = period.start_date;
        sheet.end_date = period.end_date;
        Ok(sheet.clone())
    }

    async fn mark_submitted(&self, id: TimesheetId) -> Result<Timesheet, WorkflowError> {
        let mut state = self.state.lock().unwrap();
        let sheet = state
            .timesheets
            .get(&id.as_i32())
            .ok_or(WorkflowError::NotFound("timesheet"))?
            .clone();
        if !sheet.is_submittable() {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "submit",
                sheet.status,
            ));
        }
        if !state.entries.values().any(|e| e.timesheet_id == Some(id)) {
            return Err(ValidationError::NoEntries.into());
        }

        for entry in state
            .entries
            .values_mut()
            .filter(|e| e.timesheet_id == Some(id))
        {
            entry.status = EntryStatus::Pending;
            entry.approved_by_id = None;
            entry.approved_on = None;
            entry.rejection_reason = None;
        }
        let sheet = state.timesheets.get_mut(&id.as_i32()).unwrap();
        sheet.status = TimesheetStatus::Pending;
        Ok(sheet.clone())
    }

    async fn apply_decision(
        &self,
        id: TimesheetId,
        decision: &Decision,
    ) -> Result<(Timesheet, Vec<TimeEntry>), WorkflowError> {
        let mut state = self.state.lock().unwrap();
        let sheet = state
            .timesheets
            .get(&id.as_i32())
            .ok_or(WorkflowError::NotFound("timesheet"))?
            .clone();
        if sheet.status != TimesheetStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "decide",
                sheet.status,
            ));
        }

        // Simulated transaction: bail out before touching anything if a
        // cascade write is configured to fail.
        let fail_on = *self.fail_on_entry_write.lock().unwrap();
        if let Some(fail_id) = fail_on {
            if state
                .entries
                .values()
                .any(|e| e.timesheet_id == Some(id) && e.id == fail_id)
            {
                return Err(WorkflowError::Storage(format!(
                    "write conflict on time entry {fail_id}"
                )));
            }
        }

        let mut cascaded = Vec::new();
        for entry in state
            .entries
            .values_mut()
            .filter(|e| e.timesheet_id == Some(id))
        {
            entry.status = decision.entry_status();
            entry.approved_by_id = Some(decision.decided_by);
            entry.approved_on = Some(decision.decided_on);
            entry.rejection_reason = decision.reason.clone();
            cascaded.push(entry.clone());
        }
        cascaded.sort_by_key(|e| e.id.as_i32());

        let sheet = state.timesheets.get_mut(&id.as_i32()).unwrap();
        sheet.status = decision.timesheet_status();
        sheet.approved_by_id = Some(decision.decided_by);
        sheet.approved_on = Some(decision.decided_on);
        sheet.rejection_reason = decision.reason.clone();
        Ok((sheet.clone(), cascaded))
    }

    async fn delete_detaching_entries(&self, id: TimesheetId) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().unwrap();
        if state.timesheets.remove(&id.as_i32()).is_none() {
            return Err(WorkflowError::NotFound("timesheet"));
        }
        for entry in state
            .entries
            .values_mut()
            .filter(|e| e.timesheet_id == Some(id))
        {
            entry.timesheet_id = None;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeOracle {
    grants: Mutex<Vec<(UserId, Capability, Option<ProjectId>)>>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(self, user_id: i32, capability: Capability, project_id: Option<i32>) -> Self {
        self.grants.lock().unwrap().push((
            UserId::new(user_id),
            capability,
            project_id.map(ProjectId::new),
        ));
        self
    }
}

#[async_trait]
impl AuthorizationOracle for FakeOracle {
    async fn has_capability(
        &self,
        user_id: UserId,
        capability: Capability,
        project: Option<ProjectId>,
    ) -> Result<bool, WorkflowError> {
        let grants = self.grants.lock().unwrap();
        Ok(grants.iter().any(|(u, c, p)| {
            *u == user_id && *c == capability && (p.is_none() || *p == project)
        }))
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    approvers: Mutex<HashMap<i32, Vec<Principal>>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_approvers(self, project_id: i32, principals: Vec<Principal>) -> Self {
        self.approvers
            .lock()
            .unwrap()
            .insert(project_id, principals);
        self
    }
}

#[async_trait]
impl ApproverDirectory for FakeDirectory {
    async fn approvers_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Principal>, WorkflowError> {
        Ok(self
            .approvers
            .lock()
            .unwrap()
            .get(&project_id.as_i32())
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Notifications and time
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, event: WorkflowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingDelivery {
    deliveries: Mutex<Vec<(UserId, &'static str)>>,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(UserId, &'static str)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDelivery for RecordingDelivery {
    async fn deliver(&self, recipient: UserId, event: &WorkflowEvent) {
        self.deliveries.lock().unwrap().push((recipient, event.kind()));
    }
}

pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
