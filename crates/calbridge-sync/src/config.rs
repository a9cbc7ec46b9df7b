//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default listing lookahead, in days, applied when a caller supplies no
/// explicit window.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 90;

/// Default timeout for each outbound provider call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the sync service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// How far ahead the default listing window reaches.
    pub lookahead_days: i64,
    /// Timeout applied to each outbound provider call.
    pub request_timeout: Duration,
    /// Where the mirror database lives.
    pub database_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            database_path: default_database_path(),
        }
    }
}

impl SyncConfig {
    pub fn with_lookahead_days(mut self, days: i64) -> Self {
        self.lookahead_days = days;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calbridge")
        .join("calbridge.db")
}
