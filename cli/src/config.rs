//! Configuration for the command line tool.
//!
//! Everything is read once from environment variables (after an optional
//! `.env` file) so missing settings fail before any file is uploaded.

use std::time::Duration;

use anyhow::Context;
use tunedrop::UploadConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Upload backend base URL (required)
    pub backend_url: String,
    /// Per-request timeout for the backend (default: 120s)
    pub timeout: Duration,
    pub upload: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = UploadConfig::default();
        let backend_url = var("TUNEDROP_URL")
            .filter(|url| !url.trim().is_empty())
            .context("Missing required TUNEDROP_URL env var")?;

        Ok(Self {
            backend_url,
            timeout: Duration::from_secs(
                var("TUNEDROP_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(120),
            ),
            upload: UploadConfig {
                concurrency: var("TUNEDROP_CONCURRENCY")
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.concurrency),
                debounce: var("TUNEDROP_DEBOUNCE_MS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.debounce),
                placeholder_cover: var("TUNEDROP_PLACEHOLDER_COVER")
                    .filter(|path| !path.trim().is_empty())
                    .unwrap_or(defaults.placeholder_cover),
            },
        })
    }
}
