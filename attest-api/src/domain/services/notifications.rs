use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;

use crate::domain::{
    models::{ProjectId, UserId, WorkflowEvent},
    ports::outbound::{ApproverDirectory, NotificationDelivery, NotificationSink},
};

/// Turns domain events into per-user notifications.
///
/// Pending events fan out to everyone who may approve time on the touched
/// projects; decision events go to the entry owner. Directory principals are
/// flattened to users once, deduplicated, and the owner is excluded.
/// Failures are logged and swallowed.
pub struct NotificationDispatcher<D, V> {
    directory: Arc<D>,
    delivery: Arc<V>,
}

impl<D, V> NotificationDispatcher<D, V>
where
    D: ApproverDirectory,
    V: NotificationDelivery,
{
    pub fn new(directory: Arc<D>, delivery: Arc<V>) -> Self {
        Self {
            directory,
            delivery,
        }
    }

    async fn notify_approvers(&self, projects: &[ProjectId], owner: UserId, event: &WorkflowEvent) {
        let mut principals = Vec::new();
        for &project_id in projects {
            match self.directory.approvers_for_project(project_id).await {
                Ok(found) => principals.extend(found),
                Err(err) => {
                    tracing::warn!(%project_id, "approver lookup failed: {err}");
                }
            }
        }

        let recipients: Vec<_> = principals
            .iter()
            .flat_map(|p| p.user_ids())
            .unique()
            .filter(|&user_id| user_id != owner)
            .collect();
        for recipient in recipients {
            self.delivery.deliver(recipient, event).await;
        }
    }
}

#[async_trait]
impl<D, V> NotificationSink for NotificationDispatcher<D, V>
where
    D: ApproverDirectory,
    V: NotificationDelivery,
{
    async fn publish(&self, event: WorkflowEvent) {
        match &event {
            WorkflowEvent::TimeEntryPending { entry } => {
                self.notify_approvers(&[entry.project_id], entry.user_id, &event)
                    .await;
            }
            WorkflowEvent::TimesheetPending {
                timesheet,
                projects,
            } => {
                self.notify_approvers(projects, timesheet.user_id, &event)
                    .await;
            }
            WorkflowEvent::TimeEntryApproved { entry }
            | WorkflowEvent::TimeEntryRejected { entry } => {
                self.delivery.deliver(entry.user_id, &event).await;
            }
        }
    }
}
