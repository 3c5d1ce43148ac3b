use async_trait::async_trait;
use shared::{
    album::CoverImage,
    commit::{CommitRequest, CommitResponse},
    library::{DuplicateQuery, LibraryAlbum, LibraryArtist},
    musicbrainz::MetadataCandidate,
    upload::{AnalyzedFile, FileBlob},
};

use crate::error::Result;

/// Temp-upload endpoint: stores one file and extracts its tags.
#[async_trait]
pub trait AnalyzeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, file: &FileBlob) -> Result<AnalyzedFile>;
}

/// Titles already in the library for an artist (and title, when given).
#[async_trait]
pub trait DuplicateSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_duplicates(&self, query: &DuplicateQuery) -> Result<Vec<String>>;
}

#[async_trait]
pub trait CommitBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn commit(&self, request: &CommitRequest) -> Result<CommitResponse>;
}

#[async_trait]
pub trait CoverArtSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_cover(&self, release_id: &str) -> Result<CoverImage>;
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_recordings(
        &self,
        title: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<MetadataCandidate>>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn artists(&self) -> Result<Vec<LibraryArtist>>;
    async fn albums(&self) -> Result<Vec<String>>;
    async fn genres(&self) -> Result<Vec<String>>;
    async fn albums_by_artist(&self, artist_id: &str) -> Result<Vec<LibraryAlbum>>;

    /// Reference the backend serves a library cover under.
    fn cover_url(&self, cover_id: &str) -> String {
        format!("/api/albums/cover/{cover_id}?size=150")
    }
}
