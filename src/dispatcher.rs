//! Sequential processing of watch events
//!
//! The dispatcher is the single consumer of the [`WatchEvent`] channel. Each
//! completed-download event is one batch: the new entry is walked, and if the
//! batch published anything the library is refreshed exactly once. Dropped
//! torrents go to the [`TorrentDropHandler`]. Nothing runs concurrently, so
//! two batches never race on the library.

use crate::error::Result;
use crate::notifier::LibraryNotifier;
use crate::torrent_drop::{DropOutcome, TorrentDropHandler};
use crate::types::{BatchReport, WatchEvent, WatchSource};
use crate::walker::ContentWalker;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumes watch events and drives the pipeline
pub struct Dispatcher {
    walker: Arc<ContentWalker>,
    drop_handler: Option<TorrentDropHandler>,
    notifier: Arc<dyn LibraryNotifier>,
    settle_delay: Duration,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// `settle_delay` is waited before walking a new completed entry or
    /// tracking a dropped torrent, giving the writer time to finish.
    pub fn new(
        walker: Arc<ContentWalker>,
        drop_handler: Option<TorrentDropHandler>,
        notifier: Arc<dyn LibraryNotifier>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            walker,
            drop_handler,
            notifier,
            settle_delay,
        }
    }

    /// The walker batches are processed with
    pub fn walker(&self) -> &ContentWalker {
        &self.walker
    }

    /// Process events until the channel closes or `cancel` fires.
    ///
    /// An event already being processed is finished before shutdown.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<WatchEvent>, cancel: CancellationToken) {
        info!("Dispatcher started");

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            self.dispatch(event).await;
        }

        info!("Dispatcher stopped");
    }

    /// Handle one event
    pub async fn dispatch(&self, event: WatchEvent) {
        match event.source {
            WatchSource::Completed => self.handle_completed(&event.path).await,
            WatchSource::TorrentDrop => self.handle_drop(&event.path).await,
        }
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    async fn handle_completed(&self, path: &Path) {
        self.settle().await;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!(?path, "completed entry disappeared before processing");
            return;
        }

        info!(?path, "torrent completed");
        let _ = self.process_batch(&[path.to_path_buf()]).await;
    }

    async fn handle_drop(&self, path: &Path) {
        let Some(handler) = &self.drop_handler else {
            debug!(?path, "torrent drop handling disabled");
            return;
        };

        self.settle().await;

        match handler.handle(path).await {
            Ok(DropOutcome::Tracked(tracked)) => debug!(?path, ?tracked, "drop handled"),
            Ok(DropOutcome::Duplicate) | Ok(DropOutcome::Ignored) => {}
            Err(e) => warn!(?path, error = %e, "failed to handle dropped torrent"),
        }
    }

    /// Walk every root as one batch and refresh the library once if anything
    /// was published.
    ///
    /// A root that cannot be walked at all counts as one failure; it never
    /// stops the rest of the batch.
    pub async fn process_batch(&self, roots: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for root in roots {
            match self.walker.walk(root, false).await {
                Ok(outcome) => report.merge(outcome),
                Err(e) => {
                    warn!(path = ?root, error = %e, "failed to process entry");
                    report.failures += 1;
                }
            }
        }

        info!(
            entries = roots.len(),
            published_files = report.published_files,
            already_published = report.already_published,
            skipped_samples = report.skipped_samples,
            archives_expanded = report.archives_expanded,
            failures = report.failures,
            "done processing: {}",
            if report.published {
                "new content published"
            } else {
                "no new content"
            }
        );

        if report.published {
            self.notify().await;
        }

        report
    }

    /// Process everything already sitting in `completed_dir` as one batch
    pub async fn initial_scan(&self, completed_dir: &Path) -> Result<BatchReport> {
        let mut entries = tokio::fs::read_dir(completed_dir).await?;
        let mut roots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            roots.push(entry.path());
        }
        roots.sort();

        info!(path = ?completed_dir, entries = roots.len(), "scanning existing content");
        Ok(self.process_batch(&roots).await)
    }

    async fn notify(&self) {
        match self.notifier.refresh().await {
            Ok(()) => info!(notifier = self.notifier.name(), "library refresh requested"),
            Err(e) => warn!(notifier = self.notifier.name(), error = %e, "library refresh failed"),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("walker", &self.walker)
            .field("drop_handler", &self.drop_handler)
            .field("notifier", &self.notifier.name())
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}
