use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::{
    ports::inbound::{TimeEntryWorkflow, TimesheetWorkflow},
    services::BulkCoordinator,
};
use crate::repositories::AllocationRepository;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<PgPool>,
    pub time_entries: Arc<dyn TimeEntryWorkflow>,
    pub timesheets: Arc<dyn TimesheetWorkflow>,
    pub bulk: Arc<BulkCoordinator>,
    pub allocations: Arc<AllocationRepository>,
}
