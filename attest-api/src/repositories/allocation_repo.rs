use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;

use crate::domain::{
    error::{ValidationError, WorkflowError},
    models::{Allocation, ProjectId, UserId},
    ports::outbound::AllocationRegistry,
};

pub struct AllocationRepository {
    pool: PgPool,
}

impl AllocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace the single allocation of a user on a project.
    /// Membership management is the only caller.
    pub async fn upsert(&self, allocation: &Allocation) -> Result<Allocation, WorkflowError> {
        if let (Some(start), Some(end)) = (allocation.start_date, allocation.end_date) {
            if start > end {
                return Err(ValidationError::InvalidAllocationWindow.into());
            }
        }
        if !(0.0..=100.0).contains(&allocation.allocation_percentage) {
            return Err(ValidationError::InvalidPercentage.into());
        }

        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            INSERT INTO allocations (user_id, project_id, allocation_percentage, start_date, end_date, billable)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, project_id) DO UPDATE
            SET allocation_percentage = EXCLUDED.allocation_percentage,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                billable = EXCLUDED.billable
            RETURNING user_id, project_id, allocation_percentage, start_date, end_date, billable
            "#,
        )
        .bind(allocation.user_id.as_i32())
        .bind(allocation.project_id.as_i32())
        .bind(allocation.allocation_percentage)
        .bind(allocation.start_date)
        .bind(allocation.end_date)
        .bind(allocation.billable)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn remove(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<(), WorkflowError> {
        let result = sqlx::query(
            r#"
            DELETE FROM allocations WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id.as_i32())
        .bind(project_id.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound("allocation"));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AllocationRow {
    user_id: i32,
    project_id: i32,
    allocation_percentage: f64,
    start_date: Option<Date>,
    end_date: Option<Date>,
    billable: bool,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Allocation {
            user_id: UserId::new(row.user_id),
            project_id: ProjectId::new(row.project_id),
            allocation_percentage: row.allocation_percentage,
            start_date: row.start_date,
            end_date: row.end_date,
            billable: row.billable,
        }
    }
}

#[async_trait]
impl AllocationRegistry for AllocationRepository {
    async fn find(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Allocation>, WorkflowError> {
        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT user_id, project_id, allocation_percentage, start_date, end_date, billable
            FROM allocations
            WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id.as_i32())
        .bind(project_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
