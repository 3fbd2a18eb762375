use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::{Date, Duration, OffsetDateTime, Weekday};

use crate::domain::error::ValidationError;
use crate::domain::models::{TimesheetId, UserId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimesheetStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

/// An inclusive seven-day range covered by one timesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetPeriod {
    pub start_date: Date,
    pub end_date: Date,
}

impl TimesheetPeriod {
    /// The week beginning on `start_date`.
    pub fn week_starting(start_date: Date) -> Self {
        Self {
            start_date,
            end_date: start_date + Duration::days(6),
        }
    }

    /// The Monday-pinned week containing `date`.
    pub fn week_containing(date: Date) -> Self {
        let days_from_monday = date.weekday().number_days_from_monday();
        Self::week_starting(date - Duration::days(days_from_monday as i64))
    }

    /// Build a period from explicit bounds, rejecting anything that is not
    /// exactly one week.
    pub fn from_bounds(start_date: Date, end_date: Date) -> Result<Self, ValidationError> {
        if end_date - start_date != Duration::days(6) {
            return Err(ValidationError::InvalidDuration);
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Inclusive intersection test.
    pub fn overlaps(&self, other: &TimesheetPeriod) -> bool {
        self.start_date <= other.end_date && self.end_date >= other.start_date
    }

    pub fn starts_on_monday(&self) -> bool {
        self.start_date.weekday() == Weekday::Monday
    }
}

/// A weekly aggregate of time entries moving through the approval workflow.
///
/// Once non-draft, the timesheet's status is the source of truth; attached
/// entries are kept in lock-step by the cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: TimesheetId,
    pub user_id: UserId,
    pub start_date: Date,
    pub end_date: Date,
    pub status: TimesheetStatus,
    pub approved_by_id: Option<UserId>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_on: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
}

impl Timesheet {
    pub fn period(&self) -> TimesheetPeriod {
        TimesheetPeriod {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Drafts are the only editable state; rejected sheets re-enter the
    /// workflow through resubmission instead.
    pub fn is_editable(&self) -> bool {
        self.status == TimesheetStatus::Draft
    }

    pub fn is_submittable(&self) -> bool {
        matches!(
            self.status,
            TimesheetStatus::Draft | TimesheetStatus::Rejected
        )
    }

    /// Whether entries may be attached, edited or removed. Rejected sheets
    /// accept changes so the owner can fix entries before resubmitting;
    /// submitted and approved sheets are frozen.
    pub fn accepts_entry_changes(&self) -> bool {
        matches!(
            self.status,
            TimesheetStatus::Draft | TimesheetStatus::Rejected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn week_starting_spans_seven_days() {
        let period = TimesheetPeriod::week_starting(date!(2024 - 06 - 03));
        assert_eq!(period.end_date, date!(2024 - 06 - 09));
        assert!(period.starts_on_monday());
    }

    #[test]
    fn week_containing_pins_to_monday() {
        // Thursday
        let period = TimesheetPeriod::week_containing(date!(2024 - 06 - 06));
        assert_eq!(period.start_date, date!(2024 - 06 - 03));
        assert_eq!(period.end_date, date!(2024 - 06 - 09));

        // Monday maps to itself
        let monday = TimesheetPeriod::week_containing(date!(2024 - 06 - 03));
        assert_eq!(monday.start_date, date!(2024 - 06 - 03));
    }

    #[test]
    fn bounds_must_span_exactly_one_week() {
        assert!(TimesheetPeriod::from_bounds(date!(2024 - 06 - 03), date!(2024 - 06 - 09)).is_ok());
        assert_eq!(
            TimesheetPeriod::from_bounds(date!(2024 - 06 - 03), date!(2024 - 06 - 08)),
            Err(ValidationError::InvalidDuration)
        );
        assert_eq!(
            TimesheetPeriod::from_bounds(date!(2024 - 06 - 03), date!(2024 - 06 - 10)),
            Err(ValidationError::InvalidDuration)
        );
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let a = TimesheetPeriod::week_starting(date!(2024 - 06 - 03));
        let b = TimesheetPeriod::week_starting(date!(2024 - 06 - 09)); // starts on a's last day
        let c = TimesheetPeriod::week_starting(date!(2024 - 06 - 10));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }
}
