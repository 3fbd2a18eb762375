pub(crate) mod allocations;
pub(crate) mod approvals;
pub(crate) mod error;
pub(crate) mod time_entries;
pub(crate) mod timesheets;

pub(crate) use error::ApiError;
