use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use shared::album::CoverImage;
use tracing::debug;
use url::Url;

use crate::{
    error::{Result, UploadError},
    CoverArtSource,
};

const COVER_ART_ARCHIVE: &str = "https://coverartarchive.org/";
const COVER_SIZE: u32 = 250;

/// Front covers from the Cover Art Archive, keyed by MusicBrainz release id.
#[derive(Debug, Clone)]
pub struct CoverArtArchive {
    base_url: Url,
    client: Client,
}

impl CoverArtArchive {
    pub fn new() -> Result<Self> {
        Self::with_base_url(COVER_ART_ARCHIVE)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { base_url, client })
    }

    fn front_url(&self, release_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["release", release_id, &format!("front-{COVER_SIZE}")]);
        Ok(url)
    }
}

#[async_trait]
impl CoverArtSource for CoverArtArchive {
    fn name(&self) -> &'static str {
        "Cover Art Archive"
    }

    async fn fetch_cover(&self, release_id: &str) -> Result<CoverImage> {
        let url = self.front_url(release_id)?;
        debug!("Fetching cover {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Api {
                status: status.as_u16(),
                message: format!("no front cover for release {release_id}"),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(CoverImage {
            file_name: "cover.jpg".to_string(),
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_cover_url() {
        let archive = CoverArtArchive::new().unwrap();

        let url = archive.front_url("76df3287-6cda-33eb-8e9a-044b5e15ffdd").unwrap();

        assert_eq!(
            url.as_str(),
            "https://coverartarchive.org/release/76df3287-6cda-33eb-8e9a-044b5e15ffdd/front-250"
        );
    }
}
