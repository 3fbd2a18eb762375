use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{
    error::WorkflowError,
    models::{Capability, GroupId, Principal, ProjectId, UserId},
    ports::outbound::{ApproverDirectory, AuthorizationOracle},
};

/// Reads the flat capability-grant projection maintained by the external
/// permission-role system.
pub struct CapabilityRepository {
    pool: PgPool,
}

impl CapabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationOracle for CapabilityRepository {
    async fn has_capability(
        &self,
        user_id: UserId,
        capability: Capability,
        project: Option<ProjectId>,
    ) -> Result<bool, WorkflowError> {
        // A global grant (project_id NULL) also answers project-scoped
        // questions; the reverse does not hold.
        let granted = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM capability_grants g
                WHERE g.capability = $2
                  AND (g.project_id IS NULL OR g.project_id = $3)
                  AND (
                        (g.principal_type = 'user' AND g.principal_id = $1)
                     OR (g.principal_type = 'group' AND g.principal_id IN (
                            SELECT group_id FROM group_members WHERE user_id = $1))
                  )
            )
            "#,
        )
        .bind(user_id.as_i32())
        .bind(capability.to_string())
        .bind(project.map(|p| p.as_i32()))
        .fetch_one(&self.pool)
        .await?;
        Ok(granted)
    }
}

#[derive(sqlx::FromRow)]
struct GrantRow {
    principal_type: String,
    principal_id: i32,
}

#[async_trait]
impl ApproverDirectory for CapabilityRepository {
    async fn approvers_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Principal>, WorkflowError> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT DISTINCT principal_type, principal_id
            FROM capability_grants
            WHERE capability IN ('approve_time_entries', 'approve_all_time_entries')
              AND (project_id IS NULL OR project_id = $1)
            "#,
        )
        .bind(project_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        let mut principals = Vec::with_capacity(rows.len());
        for row in rows {
            if row.principal_type == "group" {
                let members = sqlx::query_scalar::<_, i32>(
                    "SELECT user_id FROM group_members WHERE group_id = $1",
                )
                .bind(row.principal_id)
                .fetch_all(&self.pool)
                .await?;
                principals.push(Principal::Group {
                    id: GroupId::new(row.principal_id),
                    members: members.into_iter().map(UserId::new).collect(),
                });
            } else {
                principals.push(Principal::User(UserId::new(row.principal_id)));
            }
        }
        Ok(principals)
    }
}
