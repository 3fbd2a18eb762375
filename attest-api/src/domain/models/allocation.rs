use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::models::{ProjectId, UserId};

/// A user's permitted capacity and validity window on a single project.
///
/// At most one allocation exists per user and project; missing window bounds
/// mean the allocation is open on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub user_id: UserId,
    pub project_id: ProjectId,
    /// 0–100. Full-capacity users (100) are not hour-capped by allocation.
    pub allocation_percentage: f64,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub billable: bool,
}

impl Allocation {
    /// Whether `date` falls within the allocation's validity window.
    pub fn active_on(&self, date: Date) -> bool {
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn allocation(start: Option<Date>, end: Option<Date>) -> Allocation {
        Allocation {
            user_id: UserId::new(1),
            project_id: ProjectId::new(1),
            allocation_percentage: 100.0,
            start_date: start,
            end_date: end,
            billable: true,
        }
    }

    #[test]
    fn open_window_is_always_active() {
        let a = allocation(None, None);
        assert!(a.active_on(date!(2024 - 06 - 03)));
    }

    #[test]
    fn bounded_window_includes_both_ends() {
        let a = allocation(Some(date!(2024 - 06 - 01)), Some(date!(2024 - 06 - 30)));
        assert!(a.active_on(date!(2024 - 06 - 01)));
        assert!(a.active_on(date!(2024 - 06 - 30)));
        assert!(!a.active_on(date!(2024 - 05 - 31)));
        assert!(!a.active_on(date!(2024 - 07 - 01)));
    }

    #[test]
    fn half_open_windows() {
        let from = allocation(Some(date!(2024 - 06 - 01)), None);
        assert!(!from.active_on(date!(2024 - 05 - 31)));
        assert!(from.active_on(date!(2030 - 01 - 01)));

        let until = allocation(None, Some(date!(2024 - 06 - 30)));
        assert!(until.active_on(date!(2000 - 01 - 01)));
        assert!(!until.active_on(date!(2024 - 07 - 01)));
    }
}
