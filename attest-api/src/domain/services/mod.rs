mod bulk;
mod capacity;
mod notifications;
mod time_entries;
mod timesheets;

#[cfg(test)]
pub(crate) mod fakes;

pub use bulk::*;
pub use capacity::*;
pub use notifications::*;
pub use time_entries::*;
pub use timesheets::*;
