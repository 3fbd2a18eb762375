use crate::domain::models::{ProjectId, TimeEntry, Timesheet};

/// Observable side effects of successful lifecycle transitions.
///
/// Lifecycle services emit these after the state change commits; a dispatcher
/// turns them into notifications. Delivery failure never unwinds the
/// transition that produced the event.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    TimeEntryPending { entry: TimeEntry },
    TimeEntryApproved { entry: TimeEntry },
    TimeEntryRejected { entry: TimeEntry },
    TimesheetPending {
        timesheet: Timesheet,
        /// Projects touched by the sheet's entries; approver resolution
        /// fans out over these.
        projects: Vec<ProjectId>,
    },
}

impl WorkflowEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowEvent::TimeEntryPending { .. } => "time_entry_pending",
            WorkflowEvent::TimeEntryApproved { .. } => "time_entry_approved",
            WorkflowEvent::TimeEntryRejected { .. } => "time_entry_rejected",
            WorkflowEvent::TimesheetPending { .. } => "timesheet_pending",
        }
    }
}
