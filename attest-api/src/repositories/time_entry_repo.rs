use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};

use super::repo_error::RepositoryError;
use crate::domain::{
    error::{ValidationError, WorkflowError},
    models::{
        ActivityId, Decision, EntryStatus, IssueId, NewTimeEntry, ProjectId, TimeEntry,
        TimeEntryId, TimesheetId, UserId,
    },
    ports::outbound::{CapacityLimits, TimeEntryStore},
};

const ENTRY_COLUMNS: &str = "id, user_id, author_id, project_id, issue_id, activity_id, \
     timesheet_id, spent_on, hours, comments, status, approved_by_id, approved_on, \
     rejection_reason";

#[derive(sqlx::FromRow)]
pub(super) struct TimeEntryRow {
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
    pub project_id: i32,
    pub issue_id: Option<i32>,
    pub activity_id: i32,
    pub timesheet_id: Option<i32>,
    pub spent_on: Date,
    pub hours: f64,
    pub comments: Option<String>,
    pub status: String,
    pub approved_by_id: Option<i32>,
    pub approved_on: Option<OffsetDateTime>,
    pub rejection_reason: Option<String>,
}

impl TryFrom<TimeEntryRow> for TimeEntry {
    type Error = RepositoryError;

    fn try_from(row: TimeEntryRow) -> Result<Self, Self::Error> {
        let status = EntryStatus::from_str(&row.status)
            .map_err(|_| RepositoryError::Decode(format!("entry status '{}'", row.status)))?;
        Ok(TimeEntry {
            id: TimeEntryId::new(row.id),
            user_id: UserId::new(row.user_id),
            author_id: UserId::new(row.author_id),
            project_id: ProjectId::new(row.project_id),
            issue_id: row.issue_id.map(IssueId::new),
            activity_id: ActivityId::new(row.activity_id),
            timesheet_id: row.timesheet_id.map(TimesheetId::new),
            spent_on: row.spent_on,
            hours: row.hours,
            comments: row.comments,
            status,
            approved_by_id: row.approved_by_id.map(UserId::new),
            approved_on: row.approved_on,
            rejection_reason: row.rejection_reason,
        })
    }
}

pub struct TimeEntryRepository {
    pool: PgPool,
}

impl TimeEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serialize all writers touching the same user-day aggregate. Two
    /// concurrent admits both saw spare capacity; only one may keep it.
    async fn lock_user_day(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        day: Date,
    ) -> Result<(), WorkflowError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(user_id.as_i32())
            .bind(day.to_julian_day())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn other_hours(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        day: Date,
        exclude: Option<TimeEntryId>,
    ) -> Result<f64, WorkflowError> {
        let hours = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(hours), 0)
            FROM time_entries
            WHERE user_id = $1 AND spent_on = $2 AND ($3::int IS NULL OR id <> $3)
            "#,
        )
        .bind(user_id.as_i32())
        .bind(day)
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_one(&mut **tx)
        .await?;
        Ok(hours)
    }

    fn check_limits(
        other_hours: f64,
        hours: f64,
        limits: &CapacityLimits,
    ) -> Result<(), WorkflowError> {
        let total_hours = other_hours + hours;
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
impl TimeEntryStore for TimeEntryRepository {
    async fn get(&self, id: TimeEntryId) -> Result<Option<TimeEntry>, WorkflowError> {
        let row = sqlx::query_as::<_, TimeEntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TimeEntry::try_from).transpose().map_err(Into::into)
    }

    async fn hours_for_user_on(
        &self,
        user_id: UserId,
        day: Date,
        exclude: Option<TimeEntryId>,
    ) -> Result<f64, WorkflowError> {
        let hours = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT COALESCE(SUM(hours), 0)
            FROM time_entries
            WHERE user_id = $1 AND spent_on = $2 AND ($3::int IS NULL OR id <> $3)
            "#,
        )
        .bind(user_id.as_i32())
        .bind(day)
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_one(&self.pool)
        .await?;
        Ok(hours)
    }

    async fn insert(
        &self,
        entry: &NewTimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_user_day(&mut tx, entry.user_id, entry.spent_on).await?;

        let other_hours =
            Self::other_hours(&mut tx, entry.user_id, entry.spent_on, None).await?;
        Self::check_limits(other_hours, entry.hours, limits)?;

        let row = sqlx::query_as::<_, TimeEntryRow>(&format!(
            r#"
            INSERT INTO time_entries
                (user_id, author_id, project_id, issue_id, activity_id, timesheet_id, spent_on, hours, comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(entry.user_id.as_i32())
        .bind(entry.author_id.as_i32())
        .bind(entry.project_id.as_i32())
        .bind(entry.issue_id.map(|id| id.as_i32()))
        .bind(entry.activity_id.as_i32())
        .bind(entry.timesheet_id.map(|id| id.as_i32()))
        .bind(entry.spent_on)
        .bind(entry.hours)
        .bind(entry.comments.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        TimeEntry::try_from(row).map_err(Into::into)
    }

    async fn update(
        &self,
        entry: &TimeEntry,
        limits: &CapacityLimits,
    ) -> Result<TimeEntry, WorkflowError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_user_day(&mut tx, entry.user_id, entry.spent_on).await?;

        let other_hours =
            Self::other_hours(&mut tx, entry.user_id, entry.spent_on, Some(entry.id)).await?;
        Self::check_limits(other_hours, entry.hours, limits)?;

        let row = sqlx::query_as::<_, TimeEntryRow>(&format!(
            r#"
            UPDATE time_entries
            SET project_id = $2, issue_id = $3, activity_id = $4, spent_on = $5,
                hours = $6, comments = $7
            WHERE id = $1
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(entry.id.as_i32())
        .bind(entry.project_id.as_i32())
        .bind(entry.issue_id.map(|id| id.as_i32()))
        .bind(entry.activity_id.as_i32())
        .bind(entry.spent_on)
        .bind(entry.hours)
        .bind(entry.comments.as_deref())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("time entry"))?;

        tx.commit().await?;
        TimeEntry::try_from(row).map_err(Into::into)
    }

    async fn apply_decision(
        &self,
        id: TimeEntryId,
        decision: &Decision,
    ) -> Result<TimeEntry, WorkflowError> {
        // Guarded on the current status: the losing side of a race observes
        // a conflict instead of double-applying the transition.
        let row = sqlx::query_as::<_, TimeEntryRow>(&format!(
            r#"
            UPDATE time_entries
            SET status = $2, approved_by_id = $3, approved_on = $4, rejection_reason = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(decision.entry_status().to_string())
        .bind(decision.decided_by.as_i32())
        .bind(decision.decided_on)
        .bind(decision.reason.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => TimeEntry::try_from(row).map_err(Into::into),
            None => {
                let status = sqlx::query_scalar::<_, String>(
                    "SELECT status FROM time_entries WHERE id = $1",
                )
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;
                match status {
                    Some(status) => {
                        Err(WorkflowError::state_conflict("time entry", "decide", status))
                    }
                    None => Err(WorkflowError::NotFound("time entry")),
                }
            }
        }
    }

    async fn delete(&self, id: TimeEntryId) -> Result<(), WorkflowError> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound("time entry"));
        }
        Ok(())
    }
}
