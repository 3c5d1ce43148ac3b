use std::time::Duration;

/// Default number of analysis requests in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Quiet period after the last edit before the duplicate check runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Image the page shows when no cover is known.
pub const DEFAULT_PLACEHOLDER_COVER: &str = "/static/img/default.png";

/// Tuning for an upload session.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub concurrency: usize,
    pub debounce: Duration,
    pub placeholder_cover: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            debounce: DEFAULT_DEBOUNCE,
            placeholder_cover: DEFAULT_PLACEHOLDER_COVER.to_string(),
        }
    }
}
