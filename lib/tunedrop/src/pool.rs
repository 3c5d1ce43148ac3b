use std::sync::Arc;

use futures::stream::{self, StreamExt};
use itertools::{Either, Itertools};
use shared::upload::{AnalysisFailure, AnalyzedFile, FileBlob, Progress, TrackCandidate};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{config::DEFAULT_CONCURRENCY, normalize::file_stem_title, AnalyzeBackend};

/// Outcome of one analysis pass, both lists ordered by `source_index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisBatch {
    pub candidates: Vec<TrackCandidate>,
    pub failures: Vec<AnalysisFailure>,
}

/// Sends files to the analyze boundary with a bounded number in flight.
pub struct UploadWorkerPool {
    analyzer: Arc<dyn AnalyzeBackend>,
    concurrency: usize,
    progress: watch::Sender<Progress>,
}

impl UploadWorkerPool {
    pub fn new(analyzer: Arc<dyn AnalyzeBackend>, concurrency: usize) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            analyzer,
            concurrency: concurrency.max(1),
            progress,
        }
    }

    pub fn with_default_concurrency(analyzer: Arc<dyn AnalyzeBackend>) -> Self {
        Self::new(analyzer, DEFAULT_CONCURRENCY)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Completed/total counter, updated after every settled request.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Analyzes every file. A failing file is recorded and never aborts its
    /// siblings. Results only become visible once the whole batch settled.
    pub async fn analyze_all(&self, files: Vec<FileBlob>) -> AnalysisBatch {
        let total = files.len();
        self.progress.send_replace(Progress {
            completed: 0,
            total,
        });
        info!(
            "Analyzing {} files through {} ({} at a time)",
            total,
            self.analyzer.name(),
            self.concurrency
        );

        // Files are pulled in index order, so the lowest pending index is
        // always the next one dispatched when a slot frees up.
        let settled: Vec<_> = stream::iter(files.into_iter().enumerate())
            .map(|(source_index, file)| async move {
                debug!("Analyzing #{} '{}'", source_index, file.file_name);
                let result = self.analyzer.analyze(&file).await;
                self.progress.send_modify(|p| p.completed += 1);
                debug!("Analysis {}", self.progress());
                (source_index, file.file_name, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let (mut candidates, mut failures): (Vec<_>, Vec<_>) = settled
            .into_iter()
            .partition_map(|(source_index, file_name, result)| match result {
                Ok(analyzed) => Either::Left(to_candidate(source_index, file_name, analyzed)),
                Err(e) => {
                    warn!("Analysis of '{}' failed: {}", file_name, e);
                    Either::Right(AnalysisFailure {
                        source_index,
                        file_name,
                        reason: e.reason(),
                    })
                }
            });

        // Completion order is whatever the network gave us.
        candidates.sort_by_key(|c| c.source_index);
        failures.sort_by_key(|f| f.source_index);

        info!(
            "Analysis finished: {} ok, {} failed",
            candidates.len(),
            failures.len()
        );
        AnalysisBatch {
            candidates,
            failures,
        }
    }
}

fn to_candidate(source_index: usize, file_name: String, analyzed: AnalyzedFile) -> TrackCandidate {
    let metadata = analyzed.metadata;
    let title = metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| file_stem_title(&file_name));

    TrackCandidate {
        source_index,
        temp_token: analyzed.temp_token,
        title,
        duration_seconds: metadata.duration_seconds,
        track_number: metadata.track_number,
        original_file_name: file_name,
        metadata,
    }
}
