use std::sync::Arc;

use time::Date;

use crate::config::WorkflowSettings;
use crate::domain::{
    error::{ValidationError, ValidationErrors, WorkflowError},
    models::{NewTimeEntry, ProjectId, TimeEntry, TimeEntryId, UserId, MAX_COMMENT_LENGTH},
    ports::outbound::{AllocationCeiling, AllocationRegistry, CapacityLimits, TimeEntryStore},
};

/// Standard workday used to derive per-day capacity from an allocation
/// percentage.
pub const DAILY_BASELINE_HOURS: f64 = 8.0;

/// The slice of an entry that admission control looks at.
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub spent_on: Date,
    pub hours: f64,
    pub comments: Option<String>,
    /// Set when re-validating an update, so the entry's own stored hours do
    /// not count against it.
    pub exclude: Option<TimeEntryId>,
}

impl From<&NewTimeEntry> for CandidateEntry {
    fn from(new: &NewTimeEntry) -> Self {
        Self {
            user_id: new.user_id,
            project_id: new.project_id,
            spent_on: new.spent_on,
            hours: new.hours,
            comments: new.comments.clone(),
            exclude: None,
        }
    }
}

impl From<&TimeEntry> for CandidateEntry {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            user_id: entry.user_id,
            project_id: entry.project_id,
            spent_on: entry.spent_on,
            hours: entry.hours,
            comments: entry.comments.clone(),
            exclude: Some(entry.id),
        }
    }
}

/// Admission control for candidate time entries.
///
/// Violations are collected across rule groups rather than short-circuited,
/// so a caller sees every problem at once. The capacity sum spans the user's
/// entries on that day across ALL projects, matching the accounting the
/// allocation check has always used.
pub struct CapacityValidator<A, E> {
    allocations: Arc<A>,
    entries: Arc<E>,
    settings: WorkflowSettings,
}

impl<A, E> CapacityValidator<A, E>
where
    A: AllocationRegistry,
    E: TimeEntryStore,
{
    pub fn new(allocations: Arc<A>, entries: Arc<E>, settings: WorkflowSettings) -> Self {
        Self {
            allocations,
            entries,
            settings,
        }
    }

    /// Admit or reject a candidate. On success, returns the ceilings the
    /// store must re-check under its write-time serialization point.
    pub async fn admit(
        &self,
        candidate: &CandidateEntry,
        today: Date,
    ) -> Result<CapacityLimits, WorkflowError> {
        let mut errors = ValidationErrors::new();

        if candidate.hours < 0.0
            || (candidate.hours == 0.0 && !self.settings.accept_zero_hours)
        {
            errors.push(ValidationError::InvalidHours);
        }

        if !self.settings.accept_future_dates && candidate.spent_on > today {
            errors.push(ValidationError::FutureDate);
        }

        if let Some(comments) = &candidate.comments {
            if comments.chars().count() > MAX_COMMENT_LENGTH {
                errors.push(ValidationError::CommentsTooLong {
                    max: MAX_COMMENT_LENGTH,
                });
            }
        }

        let other_hours = self
            .entries
            .hours_for_user_on(candidate.user_id, candidate.spent_on, candidate.exclude)
            .await?;

        let mut allocation_ceiling = None;
        match self
            .allocations
            .find(candidate.user_id, candidate.project_id)
            .await?
        {
            None => errors.push(ValidationError::NotAllocated),
            Some(allocation) => {
                if !allocation.active_on(candidate.spent_on) {
                    errors.push(Self::window_error(&allocation, candidate.spent_on));
                } else if allocation.allocation_percentage < 100.0 {
                    let max_hours =
                        DAILY_BASELINE_HOURS * allocation.allocation_percentage / 100.0;
                    allocation_ceiling = Some(AllocationCeiling {
                        max_hours,
                        percentage: allocation.allocation_percentage,
                    });
                    let total_hours = other_hours + candidate.hours;
                    if total_hours > max_hours {
                        errors.push(ValidationError::ExceedsAllocationCapacity {
                            total_hours,
                            max_hours,
                            allocation: allocation.allocation_percentage,
                        });
                    }
                }
            }
        }

        let global_max_hours =
            (self.settings.max_hours_per_day > 0.0).then_some(self.settings.max_hours_per_day);
        if let Some(max_hours) = global_max_hours {
            let total_hours = other_hours + candidate.hours;
            if total_hours > max_hours {
                errors.push(ValidationError::ExceedsDailyMaximum {
                    total_hours,
                    max_hours,
                });
            }
        }

        errors.into_result()?;
        Ok(CapacityLimits {
            allocation: allocation_ceiling,
            global_max_hours,
        })
    }

    fn window_error(
        allocation: &crate::domain::models::Allocation,
        spent_on: Date,
    ) -> ValidationError {
        if let Some(start) = allocation.start_date {
            if spent_on < start {
                return ValidationError::BeforeAllocationStart { start };
            }
        }
        if let Some(end) = allocation.end_date {
            if spent_on > end {
                return ValidationError::AfterAllocationEnd { end };
            }
        }
        ValidationError::OutsideAllocationWindow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ValidationError;
    use crate::domain::services::fakes::{FakeAllocations, FakeWorkflowStore};
    use crate::domain::models::{ActivityId, NewTimeEntry};
    use time::macros::date;

    const TODAY: Date = date!(2024 - 06 - 05);

    fn settings() -> WorkflowSettings {
        WorkflowSettings {
            max_hours_per_day: 24.0,
            accept_zero_hours: false,
            accept_future_dates: true,
        }
    }

    fn candidate(hours: f64) -> CandidateEntry {
        CandidateEntry {
            user_id: UserId::new(1),
            project_id: ProjectId::new(10),
            spent_on: date!(2024 - 06 - 03),
            hours,
            comments: None,
            exclude: None,
        }
    }

    fn validator(
        allocations: Arc<FakeAllocations>,
        entries: Arc<FakeWorkflowStore>,
        settings: WorkflowSettings,
    ) -> CapacityValidator<FakeAllocations, FakeWorkflowStore> {
        CapacityValidator::new(allocations, entries, settings)
    }

    async fn seed_entry(store: &FakeWorkflowStore, user: i32, day: Date, hours: f64) {
        let new = NewTimeEntry {
            user_id: UserId::new(user),
            author_id: UserId::new(user),
            project_id: ProjectId::new(99),
            issue_id: None,
            activity_id: ActivityId::new(1),
            timesheet_id: None,
            spent_on: day,
            hours,
            comments: None,
        };
        store.insert(&new, &CapacityLimits::default()).await.unwrap();
    }

    fn expect_validation(result: Result<CapacityLimits, WorkflowError>) -> Vec<ValidationError> {
        match result {
            Err(WorkflowError::Validation(errors)) => errors.into_iter().collect(),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_allocation_is_rejected() {
        let v = validator(
            Arc::new(FakeAllocations::new()),
            Arc::new(FakeWorkflowStore::new()),
            settings(),
        );

        let errors = expect_validation(v.admit(&candidate(2.0), TODAY).await);
        assert_eq!(errors, vec![ValidationError::NotAllocated]);
    }

    #[tokio::test]
    async fn half_allocation_caps_the_day_at_four_hours() {
        let allocations =
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 50.0, None, None));
        let store = Arc::new(FakeWorkflowStore::new());
        let v = validator(allocations, store.clone(), settings());

        // 0 prior hours: exactly 4.0 fits
        let limits = v.admit(&candidate(4.0), TODAY).await.unwrap();
        assert_eq!(limits.allocation.map(|a| a.max_hours), Some(4.0));

        // with 4.0 already logged (on any project), 0.5 more no longer fits
        seed_entry(&store, 1, date!(2024 - 06 - 03), 4.0).await;
        let errors = expect_validation(v.admit(&candidate(0.5), TODAY).await);
        assert!(matches!(
            errors[0],
            ValidationError::ExceedsAllocationCapacity { .. }
        ));
    }

    #[tokio::test]
    async fn full_allocation_skips_the_percentage_cap() {
        let allocations =
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 100.0, None, None));
        let store = Arc::new(FakeWorkflowStore::new());
        seed_entry(&store, 1, date!(2024 - 06 - 03), 10.0).await;
        let v = validator(allocations, store, settings());

        // 12 hours on top of 10 is fine at 100% (only the global ceiling applies)
        let limits = v.admit(&candidate(12.0), TODAY).await.unwrap();
        assert_eq!(limits.allocation, None);
        assert_eq!(limits.global_max_hours, Some(24.0));
    }

    #[tokio::test]
    async fn global_ceiling_applies_independently_of_allocation() {
        let allocations =
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 100.0, None, None));
        let store = Arc::new(FakeWorkflowStore::new());
        seed_entry(&store, 1, date!(2024 - 06 - 03), 6.0).await;

        let mut s = settings();
        s.max_hours_per_day = 8.0;
        let v = validator(allocations, store, s);

        let errors = expect_validation(v.admit(&candidate(3.0), TODAY).await);
        assert_eq!(
            errors,
            vec![ValidationError::ExceedsDailyMaximum {
                total_hours: 9.0,
                max_hours: 8.0
            }]
        );

        // ceiling of 0 disables the check
        let mut unlimited = settings();
        unlimited.max_hours_per_day = 0.0;
        let v = validator(
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 100.0, None, None)),
            Arc::new(FakeWorkflowStore::new()),
            unlimited,
        );
        assert!(v.admit(&candidate(20.0), TODAY).await.is_ok());
    }

    #[tokio::test]
    async fn window_violations_name_the_offending_bound() {
        let allocations = Arc::new(FakeAllocations::new().with_allocation(
            1,
            10,
            100.0,
            Some(date!(2024 - 06 - 10)),
            Some(date!(2024 - 06 - 20)),
        ));
        let v = validator(allocations, Arc::new(FakeWorkflowStore::new()), settings());

        let mut before = candidate(2.0);
        before.spent_on = date!(2024 - 06 - 03);
        let errors = expect_validation(v.admit(&before, TODAY).await);
        assert_eq!(
            errors,
            vec![ValidationError::BeforeAllocationStart {
                start: date!(2024 - 06 - 10)
            }]
        );

        let mut after = candidate(2.0);
        after.spent_on = date!(2024 - 06 - 25);
        let errors = expect_validation(v.admit(&after, TODAY).await);
        assert_eq!(
            errors,
            vec![ValidationError::AfterAllocationEnd {
                end: date!(2024 - 06 - 20)
            }]
        );
    }

    #[tokio::test]
    async fn zero_hours_honours_the_setting() {
        let allocations =
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 100.0, None, None));

        let strict = validator(
            allocations.clone(),
            Arc::new(FakeWorkflowStore::new()),
            settings(),
        );
        let errors = expect_validation(strict.admit(&candidate(0.0), TODAY).await);
        assert_eq!(errors, vec![ValidationError::InvalidHours]);

        let mut s = settings();
        s.accept_zero_hours = true;
        let lenient = validator(allocations, Arc::new(FakeWorkflowStore::new()), s);
        assert!(lenient.admit(&candidate(0.0), TODAY).await.is_ok());
    }

    #[tokio::test]
    async fn future_dates_honour_the_setting() {
        let allocations =
            Arc::new(FakeAllocations::new().with_allocation(1, 10, 100.0, None, None));
        let mut s = settings();
        s.accept_future_dates = false;
        let v = validator(allocations, Arc::new(FakeWorkflowStore::new()), s);

        let mut tomorrow = candidate(2.0);
        tomorrow.spent_on = date!(2024 - 06 - 06);
        let errors = expect_validation(v.admit(&tomorrow, TODAY).await);
        assert_eq!(errors, vec![ValidationError::FutureDate]);
    }

    #[tokio::test]
    async fn all_violations_are_reported_together() {
        // no allocation, negative hours, future date: all three at once
        let mut s = settings();
        s.accept_future_dates = false;
        let v = validator(
            Arc::new(FakeAllocations::new()),
            Arc::new(FakeWorkflowStore::new()),
            s,
        );

        let mut bad = candidate(-1.0);
        bad.spent_on = date!(2024 - 06 - 09);
        let errors = expect_validation(v.admit(&bad, TODAY).await);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::InvalidHours));
        assert!(errors.contains(&ValidationError::FutureDate));
        assert!(errors.contains(&ValidationError::NotAllocated));
    }
}
