mod allocations;
mod authorization;
mod clock;
mod notifications;
mod time_entries;
mod timesheets;

pub use allocations::*;
pub use authorization::*;
pub use clock::*;
pub use notifications::*;
pub use time_entries::*;
pub use timesheets::*;
