use time::OffsetDateTime;

use crate::domain::models::{EntryStatus, TimesheetStatus, UserId};

/// The two terminal verdicts an approver can hand down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

/// An approval or rejection, applied to one entry or cascaded across a
/// timesheet. Carries everything the decided records must agree on.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub decided_by: UserId,
    pub decided_on: OffsetDateTime,
    /// Present iff the verdict is a rejection.
    pub reason: Option<String>,
}

impl Decision {
    pub fn approve(decided_by: UserId, decided_on: OffsetDateTime) -> Self {
        Self {
            verdict: Verdict::Approved,
            decided_by,
            decided_on,
            reason: None,
        }
    }

    pub fn reject(decided_by: UserId, decided_on: OffsetDateTime, reason: String) -> Self {
        Self {
            verdict: Verdict::Rejected,
            decided_by,
            decided_on,
            reason: Some(reason),
        }
    }

    pub fn entry_status(&self) -> EntryStatus {
        match self.verdict {
            Verdict::Approved => EntryStatus::Approved,
            Verdict::Rejected => EntryStatus::Rejected,
        }
    }

    pub fn timesheet_status(&self) -> TimesheetStatus {
        match self.verdict {
            Verdict::Approved => TimesheetStatus::Approved,
            Verdict::Rejected => TimesheetStatus::Rejected,
        }
    }
}
