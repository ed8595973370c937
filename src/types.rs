//! Core types shared across the pipeline

use crate::error::{PublishError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of classifying a single path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Sample or reference clip, never published
    Sample,
    /// Episode of a show
    Show,
    /// Movie
    Movie,
}

impl Classification {
    /// The library category this classification publishes into, if any
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            Classification::Sample => None,
            Classification::Show => Some(MediaKind::Show),
            Classification::Movie => Some(MediaKind::Movie),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Sample => f.write_str("sample"),
            Classification::Show => f.write_str("show"),
            Classification::Movie => f.write_str("movie"),
        }
    }
}

/// Library category a video is published into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Published under `Shows/`
    Show,
    /// Published under `Movies/`
    Movie,
}

impl MediaKind {
    /// Whether this kind forces show classification onto extracted content
    pub fn is_show(self) -> bool {
        matches!(self, MediaKind::Show)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Show => f.write_str("Show"),
            MediaKind::Movie => f.write_str("Movie"),
        }
    }
}

/// Whether a content path is a file or a directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file (or symlink to one)
    File,
    /// Directory
    Directory,
}

/// A filesystem path under processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPath {
    /// Path as handed to the walker
    pub path: PathBuf,
    /// File or directory
    pub kind: PathKind,
}

impl ContentPath {
    /// Inspect `path` on disk and record its kind
    pub async fn inspect(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;

        let kind = if metadata.is_dir() {
            PathKind::Directory
        } else if metadata.is_file() {
            PathKind::File
        } else {
            return Err(PublishError::InvalidPath {
                path: path.to_path_buf(),
                reason: "neither a file nor a directory".to_string(),
            }
            .into());
        };

        Ok(Self {
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// Which watched folder an event came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchSource {
    /// The finished-downloads folder
    Completed,
    /// The `.torrent` drop folder
    TorrentDrop,
}

/// A discrete change posted onto the dispatch channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    /// Folder the change happened in
    pub source: WatchSource,
    /// The new entry
    pub path: PathBuf,
}

impl WatchEvent {
    /// New entry in the finished-downloads folder
    pub fn completed(path: impl Into<PathBuf>) -> Self {
        Self {
            source: WatchSource::Completed,
            path: path.into(),
        }
    }

    /// New entry in the `.torrent` drop folder
    pub fn torrent_drop(path: impl Into<PathBuf>) -> Self {
        Self {
            source: WatchSource::TorrentDrop,
            path: path.into(),
        }
    }
}

/// Aggregate result of processing one batch of content
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Whether anything new landed in the library
    pub published: bool,
    /// Number of files newly copied into the library
    pub published_files: usize,
    /// Number of video files skipped because they were already published
    pub already_published: usize,
    /// Number of files skipped as samples
    pub skipped_samples: usize,
    /// Number of archives extracted and walked
    pub archives_expanded: usize,
    /// Number of files whose processing failed
    pub failures: usize,
}

impl BatchReport {
    /// Count one newly published file
    pub fn record_published(&mut self) {
        self.published = true;
        self.published_files += 1;
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: BatchReport) {
        self.published |= other.published;
        self.published_files += other.published_files;
        self.already_published += other.already_published;
        self.skipped_samples += other.skipped_samples;
        self.archives_expanded += other.archives_expanded;
        self.failures += other.failures;
    }
}
