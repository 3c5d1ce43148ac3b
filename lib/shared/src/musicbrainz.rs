use serde::{Deserialize, Serialize};

/// A recording offered by the metadata lookup as a fill-in for the album form.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, Default)]
pub struct MetadataCandidate {
    pub recording_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub release_id: Option<String>,
    pub release_date: Option<String>,
    pub genre: Option<String>,
}
