use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::domain::{
    error::{ErrorCategory, ValidationError, WorkflowError},
    models::{TimeEntryId, TimesheetId, UserId},
    ports::inbound::{TimeEntryWorkflow, TimesheetWorkflow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BulkKind {
    TimeEntries,
    Timesheets,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: i32,
    pub error: String,
    pub category: ErrorCategory,
}

/// Per-item outcome of a bulk transition: committed items stay committed no
/// matter what happened to their siblings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub succeeded: Vec<i32>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    fn record(&mut self, id: i32, result: Result<(), WorkflowError>) {
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(error) => self.failures.push(BulkFailure {
                id,
                category: error.category(),
                error: error.to_string(),
            }),
        }
    }
}

/// Applies a lifecycle transition to a list of records, isolating each
/// item's failure. This is deliberately the opposite of the cascade inside
/// one timesheet, which is atomic.
pub struct BulkCoordinator {
    entries: Arc<dyn TimeEntryWorkflow>,
    timesheets: Arc<dyn TimesheetWorkflow>,
}

impl BulkCoordinator {
    pub fn new(
        entries: Arc<dyn TimeEntryWorkflow>,
        timesheets: Arc<dyn TimesheetWorkflow>,
    ) -> Self {
        Self {
            entries,
            timesheets,
        }
    }

    pub async fn bulk_approve(
        &self,
        kind: BulkKind,
        ids: &[i32],
        approver: UserId,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = match kind {
                BulkKind::TimeEntries => self
                    .entries
                    .approve(TimeEntryId::new(id), approver)
                    .await
                    .map(|_| ()),
                BulkKind::Timesheets => self
                    .timesheets
                    .approve(TimesheetId::new(id), approver)
                    .await
                    .map(|_| ()),
            };
            outcome.record(id, result);
        }
        outcome
    }

    /// A blank reason fails the whole batch before any item is touched.
    pub async fn bulk_reject(
        &self,
        kind: BulkKind,
        ids: &[i32],
        approver: UserId,
        reason: String,
    ) -> Result<BulkOutcome, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::ReasonRequired.into());
        }

        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = match kind {
                BulkKind::TimeEntries => self
                    .entries
                    .reject(TimeEntryId::new(id), approver, reason.clone())
                    .await
                    .map(|_| ()),
                BulkKind::Timesheets => self
                    .timesheets
                    .reject(TimesheetId::new(id), approver, reason.clone())
                    .await
                    .map(|_| ()),
            };
            outcome.record(id, result);
        }
        Ok(outcome)
    }

    pub async fn bulk_submit(&self, ids: &[i32], actor: UserId) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            let result = self
                .timesheets
                .submit(TimesheetId::new(id), actor)
                .await
                .map(|_| ());
            outcome.record(id, result);
        }
        outcome
    }
}
