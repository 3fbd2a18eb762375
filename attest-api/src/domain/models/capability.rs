use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The boolean capabilities this engine asks the authorization oracle about.
///
/// The permission-role model behind them lives outside this service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    LogTime,
    LogTimeForOtherUsers,
    ApproveTimeEntries,
    /// Global-only grant that short-circuits per-project approval checks.
    ApproveAllTimeEntries,
}
