use async_trait::async_trait;

use crate::domain::{
    error::WorkflowError,
    models::{Capability, Principal, ProjectId, UserId},
};

/// Opaque capability oracle backed by the external permission-role model.
///
/// `project: None` asks about a global grant; project-scoped questions are
/// also satisfied by a global grant of the same capability.
#[async_trait]
pub trait AuthorizationOracle: Send + Sync + 'static {
    async fn has_capability(
        &self,
        user_id: UserId,
        capability: Capability,
        project: Option<ProjectId>,
    ) -> Result<bool, WorkflowError>;
}

/// Resolves who may approve time on a project, as principals (users or
/// groups) to be flattened once by the caller.
#[async_trait]
pub trait ApproverDirectory: Send + Sync + 'static {
    async fn approvers_for_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Principal>, WorkflowError>;
}
