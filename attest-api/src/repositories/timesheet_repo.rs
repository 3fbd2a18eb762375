use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};

use super::repo_error::RepositoryError;
use super::time_entry_repo::TimeEntryRow;
use crate::domain::{
    error::{ValidationError, WorkflowError},
    models::{
        Decision, TimeEntry, Timesheet, TimesheetId, TimesheetPeriod, TimesheetStatus, UserId,
    },
    ports::outbound::TimesheetStore,
};

const SHEET_COLUMNS: &str =
    "id, user_id, start_date, end_date, status, approved_by_id, approved_on, rejection_reason";

const ENTRY_COLUMNS: &str = "id, user_id, author_id, project_id, issue_id, activity_id, \
     timesheet_id, spent_on, hours, comments, status, approved_by_id, approved_on, \
     rejection_reason";

#[derive(sqlx::FromRow)]
struct TimesheetRow {
    id: i32,
    user_id: i32,
    start_date: Date,
    end_date: Date,
    status: String,
    approved_by_id: Option<i32>,
    approved_on: Option<OffsetDateTime>,
    rejection_reason: Option<String>,
}

impl TryFrom<TimesheetRow> for Timesheet {
    type Error = RepositoryError;

    fn try_from(row: TimesheetRow) -> Result<Self, Self::Error> {
        let status = TimesheetStatus::from_str(&row.status)
            .map_err(|_| RepositoryError::Decode(format!("timesheet status '{}'", row.status)))?;
        Ok(Timesheet {
            id: TimesheetId::new(row.id),
            user_id: UserId::new(row.user_id),
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            approved_by_id: row.approved_by_id.map(UserId::new),
            approved_on: row.approved_on,
            rejection_reason: row.rejection_reason,
        })
    }
}

pub struct TimesheetRepository {
    pool: PgPool,
}

impl TimesheetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The gist exclusion constraint is the write-time serialization point
    /// for the overlap invariant; losing a race surfaces as the same
    /// validation error the pre-check produces.
    fn map_overlap(err: sqlx::Error) -> WorkflowError {
        if let sqlx::Error::Database(db) = &err {
            if db.constraint() == Some("timesheets_no_overlap") {
                return ValidationError::OverlappingPeriod.into();
            }
            if db.constraint() == Some("timesheets_one_week") {
                return ValidationError::InvalidDuration.into();
            }
        }
        err.into()
    }

    fn entries_from_rows(rows: Vec<TimeEntryRow>) -> Result<Vec<TimeEntry>, WorkflowError> {
        rows.into_iter()
            .map(|row| TimeEntry::try_from(row).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl TimesheetStore for TimesheetRepository {
    async fn get(&self, id: TimesheetId) -> Result<Option<Timesheet>, WorkflowError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            "SELECT {SHEET_COLUMNS} FROM timesheets WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Timesheet::try_from).transpose().map_err(Into::into)
    }

    async fn entries_of(&self, id: TimesheetId) -> Result<Vec<TimeEntry>, WorkflowError> {
        let rows = sqlx::query_as::<_, TimeEntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries WHERE timesheet_id = $1 ORDER BY spent_on, id"
        ))
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Self::entries_from_rows(rows)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Timesheet>, WorkflowError> {
        let rows = sqlx::query_as::<_, TimesheetRow>(&format!(
            "SELECT {SHEET_COLUMNS} FROM timesheets WHERE user_id = $1 ORDER BY start_date DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Timesheet::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn overlapping_exists(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
        exclude: Option<TimesheetId>,
    ) -> Result<bool, WorkflowError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM timesheets
                WHERE user_id = $1
                  AND start_date <= $3 AND end_date >= $2
                  AND ($4::int IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(user_id.as_i32())
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(
        &self,
        user_id: UserId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            INSERT INTO timesheets (user_id, start_date, end_date)
            VALUES ($1, $2, $3)
            RETURNING {SHEET_COLUMNS}
            "#
        ))
        .bind(user_id.as_i32())
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_overlap)?;

        Timesheet::try_from(row).map_err(Into::into)
    }

    async fn update_period(
        &self,
        id: TimesheetId,
        period: &TimesheetPeriod,
    ) -> Result<Timesheet, WorkflowError> {
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            UPDATE timesheets
            SET start_date = $2, end_date = $3, updated_at = now()
            WHERE id = $1
            RETURNING {SHEET_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_overlap)?
        .ok_or(WorkflowError::NotFound("timesheet"))?;

        Timesheet::try_from(row).map_err(Into::into)
    }

    async fn mark_submitted(&self, id: TimesheetId) -> Result<Timesheet, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            "SELECT {SHEET_COLUMNS} FROM timesheets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("timesheet"))?;
        let sheet = Timesheet::try_from(row).map_err(WorkflowError::from)?;
        if !sheet.is_submittable() {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "submit",
                sheet.status,
            ));
        }

        let attached = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM time_entries WHERE timesheet_id = $1",
        )
        .bind(id.as_i32())
        .fetch_one(&mut *tx)
        .await?;
        if attached == 0 {
            return Err(ValidationError::NoEntries.into());
        }

        sqlx::query(
            r#"
            UPDATE time_entries
            SET status = 'pending', approved_by_id = NULL, approved_on = NULL,
                rejection_reason = NULL
            WHERE timesheet_id = $1
            "#,
        )
        .bind(id.as_i32())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            UPDATE timesheets
            SET status = 'pending', updated_at = now()
            WHERE id = $1
            RETURNING {SHEET_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Timesheet::try_from(row).map_err(Into::into)
    }

    async fn apply_decision(
        &self,
        id: TimesheetId,
        decision: &Decision,
    ) -> Result<(Timesheet, Vec<TimeEntry>), WorkflowError> {
        // One transaction around the sheet and every attached entry: a
        // partial cascade must be impossible.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            "SELECT {SHEET_COLUMNS} FROM timesheets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::NotFound("timesheet"))?;
        let sheet = Timesheet::try_from(row).map_err(WorkflowError::from)?;
        if sheet.status != TimesheetStatus::Pending {
            return Err(WorkflowError::state_conflict(
                "timesheet",
                "decide",
                sheet.status,
            ));
        }

        let status = decision.timesheet_status().to_string();
        let row = sqlx::query_as::<_, TimesheetRow>(&format!(
            r#"
            UPDATE timesheets
            SET status = $2, approved_by_id = $3, approved_on = $4,
                rejection_reason = $5, updated_at = now()
            WHERE id = $1
            RETURNING {SHEET_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(&status)
        .bind(decision.decided_by.as_i32())
        .bind(decision.decided_on)
        .bind(decision.reason.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let entry_rows = sqlx::query_as::<_, TimeEntryRow>(&format!(
            r#"
            UPDATE time_entries
            SET status = $2, approved_by_id = $3, approved_on = $4, rejection_reason = $5
            WHERE timesheet_id = $1
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(decision.entry_status().to_string())
        .bind(decision.decided_by.as_i32())
        .bind(decision.decided_on)
        .bind(decision.reason.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let sheet = Timesheet::try_from(row).map_err(WorkflowError::from)?;
        let entries = Self::entries_from_rows(entry_rows)?;
        Ok((sheet, entries))
    }

    async fn delete_detaching_entries(&self, id: TimesheetId) -> Result<(), WorkflowError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE time_entries SET timesheet_id = NULL WHERE timesheet_id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM timesheets WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound("timesheet"));
        }

        tx.commit().await?;
        Ok(())
    }
}
