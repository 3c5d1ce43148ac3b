use serde::{Deserialize, Serialize};

use crate::album::CoverImage;
use crate::upload::FinalTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// One file, edited field by field.
    Single,
    /// Several files committed together as one album.
    Batch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub mode: SessionMode,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub release_date: String,
    pub cover_file: Option<CoverImage>,
    pub tracks: Vec<FinalTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    #[serde(default, alias = "detail")]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CommitResponse {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}
