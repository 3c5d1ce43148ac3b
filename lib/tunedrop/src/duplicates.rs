//! Library duplicate detection for the titles being uploaded.
//!
//! The index holds the normalized titles the library already has for the
//! current artist. Lookups are synchronous against the last resolved set;
//! refreshing it goes through the boundary, either immediately
//! ([`DuplicateIndex::query`]) or debounced behind a [`DebounceTimer`]
//! ([`DuplicateIndex::schedule`]). Each resolution replaces the whole set,
//! so the last query to resolve wins. [`DuplicateIndex::clear`] starts a new
//! epoch; debounced queries still in flight from an older one are discarded
//! when they resolve.

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use shared::library::DuplicateQuery;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{normalize::normalize_title, DuplicateSource};

/// Runs a task once no newer task has been scheduled for `delay`.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels the pending task, if any, and arms the timer for `task`.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });
        self.pending = Some(token);
    }

    /// A task that already started running is not interrupted.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
struct Resolution {
    epoch: u64,
    query: DuplicateQuery,
    titles: HashSet<String>,
}

pub struct DuplicateIndex {
    source: Arc<dyn DuplicateSource>,
    titles: HashSet<String>,
    last_query: Option<DuplicateQuery>,
    epoch: u64,
    timer: DebounceTimer,
    resolved_tx: mpsc::UnboundedSender<Resolution>,
    resolved_rx: mpsc::UnboundedReceiver<Resolution>,
}

impl DuplicateIndex {
    pub fn new(source: Arc<dyn DuplicateSource>, debounce: Duration) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        Self {
            source,
            titles: HashSet::new(),
            last_query: None,
            epoch: 0,
            timer: DebounceTimer::new(debounce),
            resolved_tx,
            resolved_rx,
        }
    }

    /// Queries right away, replacing the index. Any debounced query still
    /// waiting for its delay is dropped.
    pub async fn query(&mut self, query: DuplicateQuery) -> &HashSet<String> {
        self.timer.cancel();
        let titles = resolve(self.source.as_ref(), &query).await;
        self.replace(Resolution {
            epoch: self.epoch,
            query,
            titles,
        });
        &self.titles
    }

    /// Queries after the debounce delay, restarting the delay if called again
    /// before it elapses. The result is picked up by [`Self::apply_resolved`]
    /// or [`Self::next_resolution`].
    pub fn schedule(&mut self, query: DuplicateQuery) {
        debug!(
            "Duplicate check for '{}' scheduled in {:?}",
            query.artist,
            self.timer.delay()
        );
        let source = self.source.clone();
        let tx = self.resolved_tx.clone();
        let epoch = self.epoch;
        self.timer.schedule(async move {
            let titles = resolve(source.as_ref(), &query).await;
            // The receiver lives as long as the index; a send error only
            // means the session was discarded.
            let _ = tx.send(Resolution {
                epoch,
                query,
                titles,
            });
        });
    }

    /// Applies every current-epoch resolution that has arrived so far.
    /// Returns how many were applied.
    pub fn apply_resolved(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(resolution) = self.resolved_rx.try_recv() {
            if self.replace(resolution) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next current-epoch debounced resolution and applies it.
    pub async fn next_resolution(&mut self) -> &HashSet<String> {
        // The index owns a sender, so the channel never closes.
        while let Some(resolution) = self.resolved_rx.recv().await {
            if self.replace(resolution) {
                break;
            }
        }
        &self.titles
    }

    pub fn is_duplicate(&self, title: &str) -> bool {
        self.titles.contains(&normalize_title(title))
    }

    pub fn titles(&self) -> &HashSet<String> {
        &self.titles
    }

    pub fn last_query(&self) -> Option<&DuplicateQuery> {
        self.last_query.as_ref()
    }

    pub fn clear(&mut self) {
        self.timer.cancel();
        self.epoch += 1;
        while self.resolved_rx.try_recv().is_ok() {}
        self.titles.clear();
        self.last_query = None;
    }

    fn replace(&mut self, resolution: Resolution) -> bool {
        if resolution.epoch != self.epoch {
            debug!(
                "Dropping duplicate check for '{}' from a cleared session",
                resolution.query.artist
            );
            return false;
        }
        self.titles = resolution.titles;
        self.last_query = Some(resolution.query);
        true
    }
}

/// Resolves a query into normalized titles. Failures count as "no duplicates".
async fn resolve(source: &dyn DuplicateSource, query: &DuplicateQuery) -> HashSet<String> {
    if query.artist.trim().is_empty() {
        return HashSet::new();
    }
    match source.find_duplicates(query).await {
        Ok(titles) => {
            let titles: HashSet<String> = titles.iter().map(|t| normalize_title(t)).collect();
            info!(
                "{} reports {} existing titles for '{}'",
                source.name(),
                titles.len(),
                query.artist
            );
            titles
        }
        Err(e) => {
            warn!(
                "Duplicate check for '{}' failed, clearing flags: {}",
                query.artist, e
            );
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDuplicates;
    use tokio::time::{sleep, Instant};

    fn query(artist: &str) -> DuplicateQuery {
        DuplicateQuery {
            artist: artist.to_string(),
            title: None,
        }
    }

    #[tokio::test]
    async fn matching_ignores_case_and_outer_whitespace() {
        let source = Arc::new(FakeDuplicates::new().with("Band", &[" Hello", "Héllo "]));
        let mut index = DuplicateIndex::new(source, Duration::from_millis(500));

        index.query(query("Band")).await;

        assert!(index.is_duplicate("hello "));
        assert!(index.is_duplicate("HELLO"));
        assert!(index.is_duplicate("héllo"));
        assert!(!index.is_duplicate("hello world"));
    }

    #[tokio::test]
    async fn failed_query_clears_flags() {
        let source = Arc::new(FakeDuplicates::new().with("Band", &["Song"]));
        let mut index = DuplicateIndex::new(source.clone(), Duration::from_millis(500));

        index.query(query("Band")).await;
        assert!(index.is_duplicate("song"));

        source.fail_next();
        index.query(query("Band")).await;
        assert!(!index.is_duplicate("song"));
        assert!(index.titles().is_empty());
    }

    #[tokio::test]
    async fn blank_artist_never_reaches_the_backend() {
        let source = Arc::new(FakeDuplicates::new().with("Band", &["Song"]));
        let mut index = DuplicateIndex::new(source.clone(), Duration::from_millis(500));

        index.query(query("   ")).await;

        assert_eq!(source.call_count(), 0);
        assert!(index.titles().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_fires_once_with_latest_input() {
        let source = Arc::new(FakeDuplicates::new().with("Band", &["Song"]));
        let mut index = DuplicateIndex::new(source.clone(), Duration::from_millis(500));
        let start = Instant::now();

        index.schedule(query("Ban"));
        sleep(Duration::from_millis(300)).await;
        index.schedule(query("Band"));

        index.next_resolution().await;
        sleep(Duration::from_secs(2)).await;

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.artist, "Band");
        assert_eq!(calls[0].0 - start, Duration::from_millis(800));
        assert!(index.is_duplicate("song"));
        assert_eq!(index.apply_resolved(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_query_drops_pending_debounce() {
        let source = Arc::new(FakeDuplicates::new().with("Band", &["Song"]));
        let mut index = DuplicateIndex::new(source.clone(), Duration::from_millis(500));

        index.schedule(query("Other"));
        index.query(query("Band")).await;
        sleep(Duration::from_secs(1)).await;

        assert_eq!(index.apply_resolved(), 0);
        assert_eq!(source.call_count(), 1);
        assert_eq!(index.last_query().map(|q| q.artist.as_str()), Some("Band"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_checks_already_in_flight() {
        let source = Arc::new(
            FakeDuplicates::new()
                .with("Old Artist", &["Old Song"])
                .latency(Duration::from_secs(1)),
        );
        let mut index = DuplicateIndex::new(source.clone(), Duration::from_millis(500));

        index.schedule(query("Old Artist"));
        sleep(Duration::from_millis(600)).await;
        assert_eq!(source.call_count(), 1);

        index.clear();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(index.apply_resolved(), 0);
        assert!(index.titles().is_empty());
        assert!(index.last_query().is_none());
        assert!(!index.is_duplicate("old song"));
    }

    #[tokio::test(start_paused = true)]
    async fn next_resolution_skips_cleared_checks() {
        let source = Arc::new(
            FakeDuplicates::new()
                .with("Old Artist", &["Old Song"])
                .with("Band", &["Song"])
                .latency(Duration::from_secs(1)),
        );
        let mut index = DuplicateIndex::new(source, Duration::from_millis(500));

        index.schedule(query("Old Artist"));
        sleep(Duration::from_millis(600)).await;
        index.clear();
        index.schedule(query("Band"));

        index.next_resolution().await;

        assert_eq!(index.last_query().map(|q| q.artist.as_str()), Some("Band"));
        assert!(index.is_duplicate("song"));
        assert!(!index.is_duplicate("old song"));
    }
}
