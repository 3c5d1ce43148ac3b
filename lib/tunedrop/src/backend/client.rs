use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Method, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    album::CoverImage,
    commit::{CommitRequest, CommitResponse, SessionMode},
    library::{CatalogEntry, DuplicateQuery, LibraryAlbum, LibraryArtist},
    upload::{AnalyzedFile, FileBlob},
};
use tracing::{debug, info};
use url::Url;

use super::models::{entry_names, BatchTrack, DuplicatesResponse, ErrorBody};
use crate::{
    error::{Result, UploadError},
    normalize::format_duration,
    AnalyzeBackend, CatalogSource, CommitBackend, DuplicateSource,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the upload backend: temp storage, duplicate search, commit
/// and the media server catalog.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    client: Client,
}

#[derive(Default)]
pub struct BackendClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl BackendClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<BackendClient> {
        let base_url_str = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(UploadError::NotConfigured)?;
        let base_url = Url::parse(&format!("{}/", base_url_str.trim().trim_end_matches('/')))?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(BackendClient { base_url, client })
    }
}

impl BackendClient {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        form: Option<Form>,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!("Request: {} {}", method, url);
        let mut request = self.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(form) = form {
            request = request.multipart(form);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            let body = if text.trim().is_empty() { "null" } else { text.as_str() };
            serde_json::from_str(body).map_err(|e| UploadError::Api {
                status: status.as_u16(),
                message: format!("JSON parse error: {e}"),
            })
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.message())
                .unwrap_or(text);
            Err(UploadError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn file_part(bytes: Vec<u8>, file_name: &str, content_type: Option<&str>) -> Result<Part> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        Ok(match content_type {
            Some(mime) => part.mime_str(mime)?,
            None => part,
        })
    }

    fn with_cover(form: Form, cover: Option<&CoverImage>) -> Result<Form> {
        Ok(match cover {
            Some(image) => form.part(
                "cover",
                Self::file_part(
                    image.bytes.clone(),
                    &image.file_name,
                    Some(image.content_type.as_str()).filter(|c| !c.is_empty()),
                )?,
            ),
            None => form,
        })
    }

    fn single_form(request: &CommitRequest) -> Result<Form> {
        let track = request
            .tracks
            .first()
            .ok_or_else(|| UploadError::NoTracks(Vec::new()))?;
        let form = Form::new()
            .text("temp_file", track.temp_token.clone())
            .text("title", track.title.clone())
            .text("artist", request.artist.clone())
            .text("album", request.album.clone())
            .text("genre", request.genre.clone())
            .text("duration", format_duration(track.duration_seconds))
            .text("release_date", request.release_date.clone())
            .text("track_number", track.track_number.to_string());
        Self::with_cover(form, request.cover_file.as_ref())
    }

    fn batch_form(request: &CommitRequest) -> Result<Form> {
        let tracks: Vec<BatchTrack> = request.tracks.iter().map(BatchTrack::from).collect();
        let form = Form::new()
            .text("artist", request.artist.clone())
            .text("album", request.album.clone())
            .text("genre", request.genre.clone())
            .text("release_date", request.release_date.clone())
            .text("tracks", serde_json::to_string(&tracks)?);
        Self::with_cover(form, request.cover_file.as_ref())
    }

    /// Whether the backend answers its genre listing.
    pub async fn check_connection(&self) -> bool {
        self.make_request::<serde_json::Value>(Method::GET, &["genres"], &[], None)
            .await
            .is_ok()
    }
}

#[async_trait]
impl AnalyzeBackend for BackendClient {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn analyze(&self, file: &FileBlob) -> Result<AnalyzedFile> {
        let part = Self::file_part(
            file.bytes.clone(),
            &file.file_name,
            file.content_type.as_deref(),
        )?;
        let form = Form::new().part("file", part);
        self.make_request(Method::POST, &["upload-temp"], &[], Some(form))
            .await
    }
}

#[async_trait]
impl DuplicateSource for BackendClient {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn find_duplicates(&self, query: &DuplicateQuery) -> Result<Vec<String>> {
        let mut params = vec![("artist", query.artist.as_str())];
        if let Some(title) = query.title.as_deref() {
            params.push(("title", title));
        }
        let response: DuplicatesResponse = self
            .make_request(Method::GET, &["search-duplicates"], &params, None)
            .await?;
        Ok(response.into_titles())
    }
}

#[async_trait]
impl CommitBackend for BackendClient {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn commit(&self, request: &CommitRequest) -> Result<CommitResponse> {
        let (endpoint, form) = match request.mode {
            SessionMode::Single => ("upload-final", Self::single_form(request)?),
            SessionMode::Batch => ("upload-final-batch", Self::batch_form(request)?),
        };
        info!(
            "Sending {} tracks to {} (cover attached: {})",
            request.tracks.len(),
            endpoint,
            request.cover_file.is_some()
        );
        self.make_request(Method::POST, &[endpoint], &[], Some(form))
            .await
    }
}

#[async_trait]
impl CatalogSource for BackendClient {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn artists(&self) -> Result<Vec<LibraryArtist>> {
        self.make_request(Method::GET, &["artists"], &[], None)
            .await
    }

    async fn albums(&self) -> Result<Vec<String>> {
        let entries: Vec<CatalogEntry> = self
            .make_request(Method::GET, &["albums"], &[], None)
            .await?;
        Ok(entry_names(entries))
    }

    async fn genres(&self) -> Result<Vec<String>> {
        let entries: Vec<CatalogEntry> = self
            .make_request(Method::GET, &["genres"], &[], None)
            .await?;
        Ok(entry_names(entries))
    }

    async fn albums_by_artist(&self, artist_id: &str) -> Result<Vec<LibraryAlbum>> {
        self.make_request(Method::GET, &["albums", "artist", artist_id], &[], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_a_url() {
        assert!(matches!(
            BackendClientBuilder::new().build(),
            Err(UploadError::NotConfigured)
        ));
        assert!(matches!(
            BackendClientBuilder::new().base_url("  ").build(),
            Err(UploadError::NotConfigured)
        ));
        assert!(matches!(
            BackendClientBuilder::new().base_url("not a url").build(),
            Err(UploadError::Url(_))
        ));
    }

    #[test]
    fn endpoints_keep_the_base_path() {
        let client = BackendClientBuilder::new()
            .base_url("http://media.local/upload/")
            .build()
            .unwrap();

        let url = client.endpoint(&["albums", "artist", "a b/c"]).unwrap();

        assert_eq!(
            url.as_str(),
            "http://media.local/upload/api/albums/artist/a%20b%2Fc"
        );
    }
}
