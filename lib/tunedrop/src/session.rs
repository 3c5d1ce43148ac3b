//! The per-page upload state machine.
//!
//! `Empty -> Analyzing -> Ready -> Committing -> Committed`, falling back to
//! `Empty` when no file could be analyzed and to `Ready` when a commit fails.
//! All state lives in one [`UploadSession`] value; every transition takes it
//! by `&mut self`, so nothing can observe it half-updated except through the
//! awaited network calls.

use std::collections::BTreeMap;

use shared::{
    album::{AlbumDraft, AlbumField, CoverRef},
    commit::{CommitRequest, SessionMode},
    library::{CatalogOptions, DuplicateQuery, LibraryAlbum},
    musicbrainz::MetadataCandidate,
    upload::{AnalysisFailure, FileBlob, FinalTrack, Progress, TrackCandidate, TrackEdit},
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    config::UploadConfig,
    duplicates::DuplicateIndex,
    error::{Result, UploadError},
    normalize::{format_duration, release_year},
    pool::UploadWorkerPool,
    reconcile::{apply_edits, build_draft},
    Services,
};

/// How many recordings a metadata search returns.
const METADATA_SEARCH_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Analyzing,
    Ready,
    Committing,
    Committed,
}

impl Phase {
    /// Commit and metadata search controls are disabled while a commit is in flight.
    pub fn controls_enabled(&self) -> bool {
        *self == Phase::Ready
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub mode: SessionMode,
    pub tracks: usize,
    pub failures: Vec<AnalysisFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Saved { message: String },
    /// Some tracks were rejected by the backend. Nothing is rolled back here.
    PartiallySaved { message: String, errors: Vec<String> },
}

impl CommitOutcome {
    /// Text for the user-facing alert.
    pub fn notice(&self) -> String {
        match self {
            CommitOutcome::Saved { message } => message.clone(),
            CommitOutcome::PartiallySaved { message, errors } => {
                format!("{}: {}", message, errors.join(", "))
            }
        }
    }
}

/// One line of the track list as the page shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    pub source_index: usize,
    pub file_name: String,
    pub track_number: u32,
    pub title: String,
    pub duration: String,
    pub duplicate: bool,
}

pub struct UploadSession {
    services: Services,
    config: UploadConfig,
    pool: UploadWorkerPool,
    duplicates: DuplicateIndex,
    phase: watch::Sender<Phase>,
    mode: Option<SessionMode>,
    candidates: Vec<TrackCandidate>,
    edits: BTreeMap<usize, TrackEdit>,
    draft: Option<AlbumDraft>,
    failures: Vec<AnalysisFailure>,
}

impl UploadSession {
    pub fn new(services: Services, config: UploadConfig) -> Self {
        let pool = UploadWorkerPool::new(services.analyzer().clone(), config.concurrency);
        let duplicates = DuplicateIndex::new(services.duplicates().clone(), config.debounce);
        let (phase, _) = watch::channel(Phase::Empty);
        Self {
            services,
            config,
            pool,
            duplicates,
            phase,
            mode: None,
            candidates: Vec::new(),
            edits: BTreeMap::new(),
            draft: None,
            failures: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.pool.subscribe()
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.mode
    }

    pub fn draft(&self) -> Option<&AlbumDraft> {
        self.draft.as_ref()
    }

    pub fn candidates(&self) -> &[TrackCandidate] {
        &self.candidates
    }

    pub fn failures(&self) -> &[AnalysisFailure] {
        &self.failures
    }

    pub fn duplicates(&self) -> &DuplicateIndex {
        &self.duplicates
    }

    /// Runs one analysis pass over the selected files.
    pub async fn select_files(&mut self, files: Vec<FileBlob>) -> Result<AnalysisReport> {
        self.expect_phase(Phase::Empty, "select files")?;
        if files.is_empty() {
            return Err(UploadError::NoTracks(Vec::new()));
        }

        let mode = if files.len() == 1 {
            SessionMode::Single
        } else {
            SessionMode::Batch
        };
        self.set_phase(Phase::Analyzing);

        let batch = self.pool.analyze_all(files).await;

        if batch.candidates.is_empty() {
            warn!("All {} files failed analysis", batch.failures.len());
            self.clear();
            self.set_phase(Phase::Empty);
            return Err(UploadError::NoTracks(batch.failures));
        }

        self.draft = Some(build_draft(&batch.candidates, &self.config.placeholder_cover));
        self.mode = Some(mode);
        self.candidates = batch.candidates;
        self.failures = batch.failures;
        self.set_phase(Phase::Ready);

        info!(
            "Session ready in {:?} mode with {} tracks ({} failed)",
            mode,
            self.candidates.len(),
            self.failures.len()
        );

        self.refresh_duplicates().await;

        Ok(AnalysisReport {
            mode,
            tracks: self.candidates.len(),
            failures: self.failures.clone(),
        })
    }

    /// Edits one album field. Artist edits schedule a debounced duplicate check.
    pub fn set_field(&mut self, field: AlbumField, value: impl Into<String>) -> Result<()> {
        self.expect_phase(Phase::Ready, "edit the album")?;
        let value = value.into();
        let draft = self.draft.get_or_insert_with(AlbumDraft::default);
        match field {
            AlbumField::Artist => draft.artist = value,
            AlbumField::Album => draft.album = value,
            AlbumField::Genre => draft.genre = value,
            AlbumField::ReleaseDate => draft.release_date = value,
        }
        if field == AlbumField::Artist {
            self.schedule_duplicates();
        }
        Ok(())
    }

    pub fn set_cover(&mut self, cover: CoverRef) -> Result<()> {
        self.expect_phase(Phase::Ready, "change the cover")?;
        self.draft.get_or_insert_with(AlbumDraft::default).cover = Some(cover);
        Ok(())
    }

    /// Retitles a track. In single mode this also re-checks duplicates.
    pub fn set_track_title(&mut self, source_index: usize, title: impl Into<String>) -> Result<()> {
        self.edit_for(source_index)?.title = Some(title.into());
        if self.mode == Some(SessionMode::Single) {
            self.schedule_duplicates();
        }
        Ok(())
    }

    /// Renumbers a track with whatever the user typed.
    pub fn set_track_number(&mut self, source_index: usize, typed: impl Into<String>) -> Result<()> {
        self.edit_for(source_index)?.track_number = Some(typed.into());
        Ok(())
    }

    pub fn edits(&self) -> impl Iterator<Item = &TrackEdit> {
        self.edits.values()
    }

    /// The tracks as they would be committed right now.
    pub fn tracks(&self) -> Result<Vec<FinalTrack>> {
        let edits: Vec<TrackEdit> = self.edits.values().cloned().collect();
        apply_edits(&self.candidates, &edits)
    }

    /// Track list with duplicate flags computed from the freshest index.
    pub fn track_rows(&self) -> Vec<TrackRow> {
        let Ok(tracks) = self.tracks() else {
            return Vec::new();
        };
        self.candidates
            .iter()
            .zip(tracks)
            .map(|(candidate, track)| TrackRow {
                source_index: candidate.source_index,
                file_name: candidate.original_file_name.clone(),
                track_number: track.track_number,
                duplicate: self.duplicates.is_duplicate(&track.title),
                duration: format_duration(track.duration_seconds),
                title: track.title,
            })
            .collect()
    }

    /// The query matching the current field contents.
    pub fn duplicate_query(&self) -> DuplicateQuery {
        let artist = self
            .draft
            .as_ref()
            .map(|d| d.artist.trim().to_string())
            .unwrap_or_default();
        let title = match self.mode {
            Some(SessionMode::Single) => self
                .tracks()
                .ok()
                .and_then(|tracks| tracks.into_iter().next())
                .map(|t| t.title.trim().to_string())
                .filter(|t| !t.is_empty()),
            _ => None,
        };
        DuplicateQuery { artist, title }
    }

    /// Re-checks duplicates right away, dropping any pending debounced check.
    pub async fn refresh_duplicates(&mut self) {
        let query = self.duplicate_query();
        self.duplicates.query(query).await;
    }

    /// Applies debounced duplicate checks that resolved since the last call.
    pub fn apply_duplicate_results(&mut self) -> usize {
        self.duplicates.apply_resolved()
    }

    /// Waits for the next debounced duplicate check to resolve.
    pub async fn wait_for_duplicates(&mut self) {
        self.duplicates.next_resolution().await;
    }

    pub fn can_commit(&self) -> bool {
        self.phase() == Phase::Ready
            && self
                .draft
                .as_ref()
                .is_some_and(|d| d.has_usable_cover(&self.config.placeholder_cover))
    }

    /// Submits the whole current draft. Refused without a real cover; a failed
    /// attempt leaves the session editable with the same temp tokens.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        self.expect_phase(Phase::Ready, "commit")?;
        let mode = self.mode.unwrap_or(SessionMode::Batch);
        let draft = self.draft.clone().unwrap_or_default();
        if !draft.has_usable_cover(&self.config.placeholder_cover) {
            warn!("Commit refused: no cover image");
            return Err(UploadError::MissingCover);
        }
        let tracks = self.tracks()?;

        let request = CommitRequest {
            mode,
            artist: draft.artist,
            album: draft.album,
            genre: draft.genre,
            release_date: draft.release_date,
            cover_file: draft.cover.as_ref().and_then(CoverRef::image).cloned(),
            tracks,
        };

        self.set_phase(Phase::Committing);
        info!(
            "Committing {} tracks of '{}' to {}",
            request.tracks.len(),
            request.album,
            self.services.committer().name()
        );

        let result = self.services.committer().commit(&request).await;
        match result {
            Ok(response) if response.is_partial() => {
                warn!(
                    "Commit partially rejected: {}",
                    response.errors.join(", ")
                );
                // Which tracks to drop from the draft is up to the backend;
                // the draft is kept as submitted.
                self.set_phase(Phase::Committed);
                Ok(CommitOutcome::PartiallySaved {
                    message: response.message,
                    errors: response.errors,
                })
            }
            Ok(response) => {
                info!("Commit accepted: {}", response.message);
                self.set_phase(Phase::Committed);
                self.clear();
                Ok(CommitOutcome::Saved {
                    message: response.message,
                })
            }
            Err(e) => {
                warn!("Commit failed: {}", e);
                self.set_phase(Phase::Ready);
                Err(e)
            }
        }
    }

    /// Searches the metadata provider with the current title and artist.
    pub async fn search_metadata(&self) -> Result<Vec<MetadataCandidate>> {
        self.expect_phase(Phase::Ready, "search metadata")?;
        let provider = self.services.metadata().ok_or(UploadError::NotConfigured)?;

        let artist = self
            .draft
            .as_ref()
            .map(|d| d.artist.trim().to_string())
            .unwrap_or_default();
        let title = self
            .tracks()?
            .into_iter()
            .next()
            .map(|t| t.title.trim().to_string())
            .unwrap_or_default();
        if artist.is_empty() || title.is_empty() {
            return Err(UploadError::Lookup(
                "a title and an artist are required".to_string(),
            ));
        }

        provider
            .search_recordings(&title, &artist, METADATA_SEARCH_LIMIT)
            .await
    }

    /// Fills album, genre and date from a lookup result and fetches its cover.
    pub async fn apply_metadata_candidate(&mut self, candidate: &MetadataCandidate) -> Result<()> {
        self.expect_phase(Phase::Ready, "apply metadata")?;
        {
            let draft = self.draft.get_or_insert_with(AlbumDraft::default);
            draft.album = candidate.album.clone().unwrap_or_default();
            draft.genre = candidate.genre.clone().unwrap_or_default();
            draft.release_date = candidate.release_date.clone().unwrap_or_default();
        }

        match candidate.release_id.as_deref() {
            Some(release_id) => {
                self.fetch_cover(release_id).await?;
            }
            None => self.set_placeholder_cover(),
        }
        Ok(())
    }

    /// Replaces the cover with the release's front image, or the placeholder
    /// when it cannot be fetched. Returns whether a real cover was set.
    pub async fn fetch_cover(&mut self, release_id: &str) -> Result<bool> {
        self.expect_phase(Phase::Ready, "fetch a cover")?;
        let Some(source) = self.services.cover_art().cloned() else {
            warn!("No cover art source configured");
            self.set_placeholder_cover();
            return Ok(false);
        };

        match source.fetch_cover(release_id).await {
            Ok(image) => {
                info!("Fetched cover for release {} from {}", release_id, source.name());
                self.draft.get_or_insert_with(AlbumDraft::default).cover =
                    Some(CoverRef::Image(image));
                Ok(true)
            }
            Err(e) => {
                warn!("Cover for release {} unavailable: {}", release_id, e);
                self.set_placeholder_cover();
                Ok(false)
            }
        }
    }

    pub async fn catalog_options(&self) -> Result<CatalogOptions> {
        let catalog = self.services.catalog().ok_or(UploadError::NotConfigured)?;
        Ok(CatalogOptions {
            artists: catalog.artists().await?,
            albums: catalog.albums().await?,
            genres: catalog.genres().await?,
        })
    }

    /// Albums the library already has for the artist currently typed.
    pub async fn artist_albums(&self) -> Result<Vec<LibraryAlbum>> {
        let catalog = self.services.catalog().ok_or(UploadError::NotConfigured)?;
        let Some(artist) = self.draft.as_ref().map(|d| d.artist.as_str()) else {
            return Ok(Vec::new());
        };

        let known = catalog.artists().await?;
        match known.iter().find(|a| a.name == artist) {
            Some(found) => catalog.albums_by_artist(&found.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Copies an existing library album's details into the draft.
    pub fn apply_library_album(&mut self, album: &LibraryAlbum) -> Result<()> {
        self.expect_phase(Phase::Ready, "apply an album")?;
        let cover = match (self.services.catalog(), album.cover.as_deref()) {
            (Some(catalog), Some(cover_id)) => catalog.cover_url(cover_id),
            _ => self.config.placeholder_cover.clone(),
        };
        let year = album
            .year
            .map(|y| release_year(&y.to_string()))
            .unwrap_or_default();

        let draft = self.draft.get_or_insert_with(AlbumDraft::default);
        draft.album = album.name.clone();
        draft.genre = album.genre.clone().unwrap_or_default();
        draft.release_date = year;
        draft.cover = Some(CoverRef::Reference(cover));
        Ok(())
    }

    /// Drops everything, as when the page is left. Nothing reaches the backend.
    pub fn reset(&mut self) {
        self.clear();
        self.set_phase(Phase::Empty);
    }

    fn clear(&mut self) {
        self.mode = None;
        self.candidates.clear();
        self.edits.clear();
        self.draft = None;
        self.failures.clear();
        self.duplicates.clear();
    }

    fn edit_for(&mut self, source_index: usize) -> Result<&mut TrackEdit> {
        self.expect_phase(Phase::Ready, "edit a track")?;
        if !self.candidates.iter().any(|c| c.source_index == source_index) {
            return Err(UploadError::UnknownTrack(source_index));
        }
        Ok(self
            .edits
            .entry(source_index)
            .or_insert_with(|| TrackEdit::new(source_index)))
    }

    fn schedule_duplicates(&mut self) {
        let query = self.duplicate_query();
        self.duplicates.schedule(query);
    }

    fn set_placeholder_cover(&mut self) {
        let placeholder = CoverRef::Reference(self.config.placeholder_cover.clone());
        self.draft.get_or_insert_with(AlbumDraft::default).cover = Some(placeholder);
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<()> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(UploadError::InvalidState { action, phase })
        }
    }
}
