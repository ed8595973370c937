//! Recursive traversal of completed content
//!
//! The walker visits every file under a root (or the root itself when it is a
//! file), skips samples, publishes videos and expands archives. Archive
//! contents are walked by the same walker, so nesting recurses naturally; the
//! show/movie decision for an archive is handed down as `forced_show`.

use crate::classifier::Classifier;
use crate::error::Result;
use crate::extraction::ArchiveExpander;
use crate::publisher::Publisher;
use crate::types::{BatchReport, ContentPath, PathKind};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Walks directories and files, feeding them through the pipeline
#[derive(Debug)]
pub struct ContentWalker {
    classifier: Arc<Classifier>,
    publisher: Arc<Publisher>,
    expander: ArchiveExpander,
}

impl ContentWalker {
    /// Create a walker from its collaborators
    pub fn new(
        classifier: Arc<Classifier>,
        publisher: Arc<Publisher>,
        expander: ArchiveExpander,
    ) -> Self {
        Self {
            classifier,
            publisher,
            expander,
        }
    }

    /// The classifier used for every file
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Process a directory tree or single file.
    ///
    /// Failures on individual files are logged and counted in the report;
    /// an error is returned only when `root` itself cannot be inspected.
    pub async fn walk(&self, root: &Path, forced_show: bool) -> Result<BatchReport> {
        self.walk_at_depth(root, forced_show, 0).await
    }

    /// Walk at a given archive nesting depth.
    ///
    /// Boxed because archive expansion recurses back into the walker.
    pub(crate) fn walk_at_depth<'a>(
        &'a self,
        root: &'a Path,
        forced_show: bool,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Result<BatchReport>> + Send + 'a>> {
        Box::pin(async move {
            let content = ContentPath::inspect(root).await?;
            let mut report = BatchReport::default();

            let files = match content.kind {
                PathKind::File => vec![content.path],
                PathKind::Directory => {
                    let (files, unreadable) = collect_files(content.path).await?;
                    report.failures += unreadable;
                    files
                }
            };

            debug!(?root, files = files.len(), forced_show, depth, "walking content");

            for file in files {
                match self.process_file(&file, forced_show, depth).await {
                    Ok(outcome) => report.merge(outcome),
                    Err(e) => {
                        warn!(path = ?file, error = %e, "failed to process file");
                        report.failures += 1;
                    }
                }
            }

            Ok(report)
        })
    }

    async fn process_file(&self, file: &Path, forced_show: bool, depth: u32) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        let classification = self.classifier.classify(file, forced_show);
        let Some(kind) = classification.media_kind() else {
            info!(path = ?file, "skipping sample");
            report.skipped_samples += 1;
            return Ok(report);
        };

        if self.classifier.is_video(file) {
            if self.publisher.publish(file, kind).await? {
                report.record_published();
            } else {
                report.already_published += 1;
            }
        } else if self.classifier.is_archive(file) {
            let nested = self
                .expander
                .expand(self, file, kind.is_show(), depth)
                .await?;
            report.archives_expanded += 1;
            report.merge(nested);
        } else {
            debug!(path = ?file, "ignoring non-media file");
        }

        Ok(report)
    }
}

/// Every file reachable below `root`, in a stable order, plus the number of
/// entries that could not be read
async fn collect_files(root: PathBuf) -> Result<(Vec<PathBuf>, usize)> {
    let collected = tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        let mut unreadable = 0;

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    warn!(?root, error = %e, "failed to read directory entry");
                    unreadable += 1;
                }
            }
        }

        (files, unreadable)
    })
    .await
    .map_err(|e| std::io::Error::other(format!("directory walk failed: {}", e)))?;

    Ok(collected)
}
