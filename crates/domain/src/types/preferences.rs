//! User preferences, persisted locally and mirrored by the remote
//! `/settings/` endpoint.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HOURLY_RATE, DEFAULT_NOTIFICATION_INTERVAL_HOURS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub hourly_rate: f64,
    /// Exclude break laps from earnings aggregates.
    pub breaks_impact_amount: bool,
    /// Exclude break laps from time aggregates.
    pub breaks_impact_time: bool,
    pub show_amount: bool,
    pub show_stats_before_laps: bool,
    pub minimalist_mode: bool,
    pub notifications_enabled: bool,
    pub notification_interval_hours: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            hourly_rate: DEFAULT_HOURLY_RATE,
            breaks_impact_amount: false,
            breaks_impact_time: false,
            show_amount: true,
            show_stats_before_laps: false,
            minimalist_mode: false,
            notifications_enabled: true,
            notification_interval_hours: DEFAULT_NOTIFICATION_INTERVAL_HOURS,
        }
    }
}
