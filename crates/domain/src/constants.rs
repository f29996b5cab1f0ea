//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Local storage keys
pub const ACCESS_TOKEN_KEY: &str = "clockwork_access_token";
pub const REFRESH_TOKEN_KEY: &str = "clockwork_refresh_token";
pub const USERNAME_KEY: &str = "clockwork_username";
/// Epoch milliseconds at which the current access token expires.
pub const TOKEN_EXPIRY_KEY: &str = "clockwork_token_expiry";
/// Sessions queued for sync while the backend was unreachable.
pub const SYNC_QUEUE_KEY: &str = "clockwork_sync_queue";
/// Local session ids already confirmed pushed.
pub const SYNCED_SESSIONS_KEY: &str = "clockwork_synced_session_ids";
pub const SESSIONS_KEY: &str = "clockwork_sessions";
pub const LIVE_SESSION_KEY: &str = "clockwork_live_session";
pub const LIVE_BACKUP_KEY: &str = "clockwork_live_session_backup";
pub const PREFERENCES_KEY: &str = "clockwork_preferences";
pub const IMAGE_KEY_PREFIX: &str = "clockwork_img_";

// Token lifecycle. Access tokens are server-issued with a 30-minute
// lifetime; the local expiry stamp keeps a 2-minute safety margin.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 28;
pub const TOKEN_REFRESH_MARGIN_MINUTES: i64 = 5;

// Background sync cadence
pub const TOKEN_SWEEP_INTERVAL_SECS: u64 = 25 * 60;
pub const QUEUE_DRAIN_INTERVAL_SECS: u64 = 5 * 60;
pub const LIVE_BACKUP_INTERVAL_SECS: u64 = 3 * 60;

// Rate limiting between remote operations
pub const QUEUE_DRAIN_ITEM_DELAY_MS: u64 = 500;
pub const IMAGE_UPLOAD_DELAY_MS: u64 = 150;

pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A lap must span at least this many seconds before it can be split.
pub const MIN_SPLIT_SECONDS: u64 = 2;

pub const DEFAULT_HOURLY_RATE: f64 = 450.0;
pub const DEFAULT_NOTIFICATION_INTERVAL_HOURS: u32 = 2;
