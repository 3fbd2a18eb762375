mod time_entries;
mod timesheets;

pub use time_entries::*;
pub use timesheets::*;
