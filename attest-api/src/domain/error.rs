use std::fmt;

use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::domain::models::Capability;

/// A single violated admission or consistency rule, scoped to a field so the
/// caller can render it next to the offending input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("user is not allocated to this project")]
    NotAllocated,
    #[error("date is before the allocation starts on {start}")]
    BeforeAllocationStart { start: Date },
    #[error("date is after the allocation ends on {end}")]
    AfterAllocationEnd { end: Date },
    #[error("user is not allocated to this project on this date")]
    OutsideAllocationWindow,
    #[error(
        "total of {total_hours:.2} h exceeds the {allocation:.0}% allocation ({max_hours:.2} h/day)"
    )]
    ExceedsAllocationCapacity {
        total_hours: f64,
        max_hours: f64,
        allocation: f64,
    },
    #[error("total of {total_hours:.2} h exceeds the daily maximum of {max_hours:.2} h")]
    ExceedsDailyMaximum { total_hours: f64, max_hours: f64 },
    #[error("hours must be greater than zero")]
    InvalidHours,
    #[error("cannot log time on a future date")]
    FutureDate,
    #[error("comments are limited to {max} characters")]
    CommentsTooLong { max: usize },
    #[error("approved entries cannot be modified")]
    ApprovedEntryImmutable,
    #[error("a timesheet must cover exactly one week")]
    InvalidDuration,
    #[error("the period overlaps another timesheet for this user")]
    OverlappingPeriod,
    #[error("a rejection reason is required")]
    ReasonRequired,
    #[error("the allocation window ends before it starts")]
    InvalidAllocationWindow,
    #[error("the allocation percentage must be between 0 and 100")]
    InvalidPercentage,
    #[error("a timesheet needs at least one time entry before it can be submitted")]
    NoEntries,
}

impl ValidationError {
    /// The input field the error should be rendered against.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::NotAllocated | ValidationError::OutsideAllocationWindow => "base",
            ValidationError::BeforeAllocationStart { .. }
            | ValidationError::AfterAllocationEnd { .. }
            | ValidationError::FutureDate => "spent_on",
            ValidationError::ExceedsAllocationCapacity { .. }
            | ValidationError::ExceedsDailyMaximum { .. }
            | ValidationError::InvalidHours => "hours",
            ValidationError::CommentsTooLong { .. } => "comments",
            ValidationError::ApprovedEntryImmutable | ValidationError::NoEntries => "base",
            ValidationError::InvalidDuration
            | ValidationError::OverlappingPeriod
            | ValidationError::InvalidAllocationWindow => "end_date",
            ValidationError::InvalidPercentage => "allocation_percentage",
            ValidationError::ReasonRequired => "rejection_reason",
        }
    }
}

/// Every rule violated by one record, collected rather than short-circuited
/// so the caller sees all problems at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    /// `Ok(())` when nothing was collected, otherwise the collection itself.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for ValidationErrors {}

/// Authorization failures, kept apart from validation so callers can render
/// 403-style responses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthorizationError {
    #[error("own time cannot be approved by its owner")]
    SelfApproval,
    #[error("missing the {0} capability")]
    MissingCapability(Capability),
    #[error("only the owner may perform this action")]
    NotOwner,
}

/// Everything a lifecycle operation can fail with.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Authorization(#[from] AuthorizationError),
    #[error("cannot {action} {entity} in {status} state")]
    StateConflict {
        entity: &'static str,
        action: &'static str,
        status: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn state_conflict(
        entity: &'static str,
        action: &'static str,
        status: impl fmt::Display,
    ) -> Self {
        Self::StateConflict {
            entity,
            action,
            status: status.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::Validation(_) => ErrorCategory::Validation,
            WorkflowError::Authorization(_) => ErrorCategory::Authorization,
            WorkflowError::StateConflict { .. } => ErrorCategory::StateConflict,
            WorkflowError::NotFound(_) => ErrorCategory::NotFound,
            WorkflowError::Storage(_) => ErrorCategory::Storage,
        }
    }
}

impl From<ValidationError> for WorkflowError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.into())
    }
}

/// Coarse error class, reported per item by bulk operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    Authorization,
    StateConflict,
    NotFound,
    Storage,
}
