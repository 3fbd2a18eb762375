mod allocation;
mod capability;
mod decision;
mod event;
mod ids;
mod principal;
mod time_entry;
mod timesheet;

pub use allocation::*;
pub use capability::*;
pub use decision::*;
pub use event::*;
pub use ids::*;
pub use principal::*;
pub use time_entry::*;
pub use timesheet::*;
