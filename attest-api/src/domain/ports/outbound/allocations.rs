use async_trait::async_trait;

use crate::domain::{
    error::WorkflowError,
    models::{Allocation, ProjectId, UserId},
};

/// Read side of the allocation registry.
///
/// Allocations are created and mutated by membership management, an external
/// collaborator; this engine only resolves them.
#[async_trait]
pub trait AllocationRegistry: Send + Sync + 'static {
    /// The user's allocation on the project, if one exists. A user has at
    /// most one allocation per project.
    async fn find(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Allocation>, WorkflowError>;
}
