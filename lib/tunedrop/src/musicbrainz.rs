use async_trait::async_trait;
use itertools::Itertools;
use musicbrainz_rs::{
    entity::{
        artist_credit::ArtistCredit,
        recording::{Recording, RecordingSearchQuery},
    },
    MusicBrainzClient, Search,
};
use shared::musicbrainz::MetadataCandidate;
use std::{collections::HashSet, future::Future, sync::OnceLock, time::Duration};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    error::{Result, UploadError},
    MetadataProvider,
};

/// The API caps search results at 100.
const MAX_LIMIT: usize = 100;

/// How lookups are retried: per-attempt timeout and a doubling, capped delay.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    timeout: Duration,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    fn delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(1 << retry.min(16))
            .min(self.max_delay)
    }
}

const LOOKUP_RETRY: RetryPolicy = RetryPolicy {
    attempts: 3,
    timeout: Duration::from_secs(15),
    base_delay: Duration::from_millis(500),
    max_delay: Duration::from_secs(5),
};

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "service unavailable",
    "429",
    "500",
    "502",
    "503",
];

const PERMANENT_MARKERS: &[&str] = &[
    "400",
    "401",
    "403",
    "404",
    "bad request",
    "not found",
    "unauthorized",
];

fn musicbrainz_client() -> Result<&'static MusicBrainzClient> {
    static CLIENT: OnceLock<Option<MusicBrainzClient>> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            let version = env!("CARGO_PKG_VERSION");
            MusicBrainzClient::new(&format!("Tunedrop/{version} ( tunedrop@localhost )")).ok()
        })
        .as_ref()
        .ok_or_else(|| UploadError::Lookup("invalid MusicBrainz user agent".to_string()))
}

fn artist_names(credits: Option<&[ArtistCredit]>) -> String {
    credits
        .into_iter()
        .flatten()
        .map(|credit| credit.name.as_str())
        .join(", ")
}

/// Unknown failures count as transient; only clear client errors are final.
fn is_transient(message: &str) -> bool {
    let message = message.to_lowercase();
    let mentions = |markers: &[&str]| markers.iter().any(|m| message.contains(m));
    mentions(TRANSIENT_MARKERS) || !mentions(PERMANENT_MARKERS)
}

async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, musicbrainz_rs::Error>>,
{
    let mut attempt = 0;
    loop {
        let failure = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !is_transient(&format!("{e:?}")) => {
                warn!("{} rejected: {:?}", label, e);
                return Err(UploadError::Lookup(e.to_string()));
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no answer within {:?}", policy.timeout),
        };

        attempt += 1;
        if attempt >= policy.attempts {
            return Err(UploadError::Lookup(failure));
        }
        let delay = policy.delay(attempt - 1);
        warn!(
            "{} attempt {}/{} failed ({}), next try in {:?}",
            label, attempt, policy.attempts, failure, delay
        );
        sleep(delay).await;
    }
}

/// Recordings matching a title and an artist, deduplicated on
/// (title, artist, album) and mapped to form fill-ins.
pub async fn search_recordings(
    title: &str,
    artist: &str,
    limit: usize,
) -> Result<Vec<MetadataCandidate>> {
    let client = musicbrainz_client()?;
    let limit = limit.clamp(1, MAX_LIMIT) as u8;

    info!("Searching recordings for '{}' by '{}'", title, artist);

    let search_results = with_retry(LOOKUP_RETRY, "MusicBrainz recording search", || {
        let mut recording_query = RecordingSearchQuery::query_builder();
        recording_query.artist_name(artist).and();
        let search_query = recording_query.recording(title).build();
        async move {
            Recording::search(search_query)
                .limit(limit)
                .with_releases()
                .execute_with_client(client)
                .await
        }
    })
    .await?;

    let mut unique = HashSet::new();
    let mut results = Vec::new();

    for recording in search_results.entities {
        let candidate = to_candidate(recording);
        let key = (
            candidate.title.to_lowercase(),
            candidate.artist.to_lowercase(),
            candidate.album.clone().unwrap_or_default().to_lowercase(),
        );
        if unique.insert(key) {
            results.push(candidate);
        }
    }

    info!("MusicBrainz returned {} candidates", results.len());
    Ok(results)
}

/// Album, date and cover come from the first release; genre from the first tag.
fn to_candidate(recording: Recording) -> MetadataCandidate {
    let first_release = recording.releases.as_ref().and_then(|r| r.first());
    let genre = recording
        .tags
        .as_ref()
        .and_then(|tags| tags.first())
        .map(|tag| tag.name.clone());

    MetadataCandidate {
        artist: artist_names(recording.artist_credit.as_deref()),
        album: first_release.map(|r| r.title.clone()),
        release_id: first_release.map(|r| r.id.clone()),
        release_date: first_release.and_then(|r| r.date.as_ref().map(|d| d.0.clone())),
        genre,
        recording_id: recording.id,
        title: recording.title,
    }
}

pub struct MusicBrainzProvider;

impl MusicBrainzProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MusicBrainzProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzProvider {
    fn name(&self) -> &'static str {
        "MusicBrainz"
    }

    async fn search_recordings(
        &self,
        title: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<MetadataCandidate>> {
        search_recordings(title, artist, limit).await
    }
}
