//! In-memory boundaries for unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    album::CoverImage,
    commit::{CommitRequest, CommitResponse},
    library::{DuplicateQuery, LibraryAlbum, LibraryArtist},
    upload::{AnalyzedFile, AnalyzedMetadata, FileBlob},
};
use tokio::time::Instant;

use crate::{
    error::{Result, UploadError},
    AnalyzeBackend, CatalogSource, CommitBackend, CoverArtSource, DuplicateSource,
};

pub fn blob(name: &str) -> FileBlob {
    FileBlob::new(name, name.as_bytes().to_vec())
}

#[derive(Default)]
pub struct FakeAnalyzer {
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    metadata: HashMap<String, AnalyzedMetadata>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn fail(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn metadata(mut self, name: &str, metadata: AnalyzedMetadata) -> Self {
        self.metadata.insert(name.to_string(), metadata);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzeBackend for FakeAnalyzer {
    fn name(&self) -> &'static str {
        "fake-analyzer"
    }

    async fn analyze(&self, file: &FileBlob) -> Result<AnalyzedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&file.file_name)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&file.file_name) {
            return Err(UploadError::Api {
                status: 400,
                message: format!("unsupported file {}", file.file_name),
            });
        }
        Ok(AnalyzedFile {
            temp_token: format!("tmp-{}", file.file_name),
            metadata: self
                .metadata
                .get(&file.file_name)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[derive(Default)]
pub struct FakeDuplicates {
    library: HashMap<String, Vec<String>>,
    latency: Duration,
    fail_next: AtomicBool,
    calls: Mutex<Vec<(Instant, DuplicateQuery)>>,
}

impl FakeDuplicates {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with(mut self, artist: &str, titles: &[&str]) -> Self {
        self.library.insert(
            artist.trim().to_lowercase(),
            titles.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Instant, DuplicateQuery)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DuplicateSource for FakeDuplicates {
    fn name(&self) -> &'static str {
        "fake-duplicates"
    }

    async fn find_duplicates(&self, query: &DuplicateQuery) -> Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), query.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(UploadError::Api {
                status: 503,
                message: "library offline".into(),
            });
        }
        Ok(self
            .library
            .get(&query.artist.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeCommit {
    responses: Mutex<VecDeque<Result<CommitResponse>>>,
    requests: Mutex<Vec<CommitRequest>>,
}

impl FakeCommit {
    pub fn new() -> Self {
        Default::default()
    }

    /// Queues the outcome of the next commit. Unqueued commits succeed.
    pub fn respond(&self, response: Result<CommitResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<CommitRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CommitBackend for FakeCommit {
    fn name(&self) -> &'static str {
        "fake-commit"
    }

    async fn commit(&self, request: &CommitRequest) -> Result<CommitResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let queued = self.responses.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(CommitResponse {
                message: "Album saved".into(),
                errors: Vec::new(),
            })
        })
    }
}

#[derive(Default)]
pub struct FakeCoverArt {
    releases: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeCoverArt {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn release(mut self, release_id: &str) -> Self {
        self.releases.insert(release_id.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoverArtSource for FakeCoverArt {
    fn name(&self) -> &'static str {
        "fake-cover-art"
    }

    async fn fetch_cover(&self, release_id: &str) -> Result<CoverImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.releases.contains(release_id) {
            return Err(UploadError::Api {
                status: 404,
                message: "no front cover".into(),
            });
        }
        Ok(CoverImage {
            file_name: format!("{release_id}.jpg"),
            content_type: "image/jpeg".into(),
            bytes: vec![0xff, 0xd8, 0xff],
        })
    }
}

/// One artist ("Band") with one album in the library.
pub struct FakeCatalog;

impl FakeCatalog {
    pub fn new() -> Self {
        FakeCatalog
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake-catalog"
    }

    async fn artists(&self) -> Result<Vec<LibraryArtist>> {
        Ok(vec![LibraryArtist {
            id: "ar-1".into(),
            name: "Band".into(),
        }])
    }

    async fn albums(&self) -> Result<Vec<String>> {
        Ok(vec!["Old LP".into()])
    }

    async fn genres(&self) -> Result<Vec<String>> {
        Ok(vec!["Rock".into(), "Jazz".into()])
    }

    async fn albums_by_artist(&self, artist_id: &str) -> Result<Vec<LibraryAlbum>> {
        if artist_id != "ar-1" {
            return Ok(Vec::new());
        }
        Ok(vec![LibraryAlbum {
            id: "al-1".into(),
            name: "Old LP".into(),
            year: Some(2004),
            genre: Some("Rock".into()),
            cover: Some("al-1".into()),
        }])
    }
}
