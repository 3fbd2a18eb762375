//! Composition root: the only place that wires concrete Postgres adapters
//! into the workflow services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    app_state::AppState,
    config::Settings,
    domain::{
        ports::{
            inbound::{TimeEntryWorkflow, TimesheetWorkflow},
            outbound::{LoggingDelivery, SystemClock},
        },
        services::{
            BulkCoordinator, CapacityValidator, NotificationDispatcher, TimeEntryService,
            TimesheetService,
        },
    },
    repositories::{
        AllocationRepository, CapabilityRepository, TimeEntryRepository, TimesheetRepository,
    },
};

pub fn build_app_state(pool: PgPool, config: &Settings) -> AppState {
    let allocations = Arc::new(AllocationRepository::new(pool.clone()));
    let entry_store = Arc::new(TimeEntryRepository::new(pool.clone()));
    let timesheet_store = Arc::new(TimesheetRepository::new(pool.clone()));
    let capabilities = Arc::new(CapabilityRepository::new(pool.clone()));
    let clock = Arc::new(SystemClock);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        capabilities.clone(),
        Arc::new(LoggingDelivery),
    ));
    let workflow = config.workflow;

    let time_entries: Arc<dyn TimeEntryWorkflow> = Arc::new(TimeEntryService::new(
        CapacityValidator::new(allocations.clone(), entry_store.clone(), workflow),
        entry_store.clone(),
        timesheet_store.clone(),
        capabilities.clone(),
        dispatcher.clone(),
        clock.clone(),
    ));
    let timesheets: Arc<dyn TimesheetWorkflow> = Arc::new(TimesheetService::new(
        CapacityValidator::new(allocations.clone(), entry_store, workflow),
        timesheet_store,
        capabilities,
        dispatcher,
        clock,
    ));
    let bulk = Arc::new(BulkCoordinator::new(
        time_entries.clone(),
        timesheets.clone(),
    ));

    AppState {
        db_pool: Arc::new(pool),
        time_entries,
        timesheets,
        bulk,
        allocations,
    }
}
