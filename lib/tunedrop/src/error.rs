use shared::upload::AnalysisFailure;
use thiserror::Error;

use crate::session::Phase;

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("backend error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("client is not configured")]
    NotConfigured,

    #[error("metadata lookup failed: {0}")]
    Lookup(String),

    #[error("no file could be analyzed ({} failed)", .0.len())]
    NoTracks(Vec<AnalysisFailure>),

    #[error("a cover image is required")]
    MissingCover,

    #[error("cannot {action} while {phase:?}")]
    InvalidState { action: &'static str, phase: Phase },

    #[error("no track with source index {0}")]
    UnknownTrack(usize),
}

impl UploadError {
    /// Human readable reason used in per-file failure reports.
    pub fn reason(&self) -> String {
        match self {
            UploadError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
