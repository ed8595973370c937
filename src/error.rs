//! Error types for torrent-to-plex
//!
//! This module provides the error taxonomy for the library:
//! - Startup errors (`Config`) that terminate the process
//! - Per-item errors (`Extraction`, `Publish`, `ExternalTool`, `Io`) that the
//!   content walker logs and counts before moving on to the next file
//! - Collaborator errors (`LibraryRefresh`, `Launch`, `FolderWatch`) from the
//!   thin I/O wrappers around the pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for torrent-to-plex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for torrent-to-plex
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "completed_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive extraction error
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Publishing error (copy into the library, ledger update)
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// External tool execution failed (7z, xdg-open, etc.)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Folder watching error
    #[error("folder watch error: {0}")]
    FolderWatch(String),

    /// The media server rejected or never answered the refresh request
    #[error("library refresh failed: {0}")]
    LibraryRefresh(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The torrent client could not be launched for a tracked `.torrent` file
    #[error("failed to launch torrent client for {path}: {reason}")]
    Launch {
        /// The tracked `.torrent` file
        path: PathBuf,
        /// The reason the launch failed
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The archive tool ran but could not extract the archive
    #[error("extraction failed for {archive}: {reason}")]
    Failed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// The configured backend cannot handle this archive format
    #[error("unsupported archive format: {archive}")]
    UnsupportedFormat {
        /// The archive whose format is not handled
        archive: PathBuf,
    },

    /// The external archive tool did not finish within the configured timeout
    #[error("archive tool timed out after {seconds}s extracting {archive}")]
    TimedOut {
        /// The archive being extracted
        archive: PathBuf,
        /// The timeout that elapsed, in seconds
        seconds: u64,
    },

    /// Archive nesting exceeded the configured recursion limit
    #[error("archive {archive} is nested {depth} levels deep, exceeding the limit")]
    TooDeep {
        /// The nested archive that was not extracted
        archive: PathBuf,
        /// Nesting depth at which it was found
        depth: u32,
    },

    /// No temporary extraction directory could be created
    #[error("failed to allocate temporary directory under {base}: {reason}")]
    TempDirUnavailable {
        /// The base path the numbered directories are derived from
        base: PathBuf,
        /// The reason allocation failed
        reason: String,
    },
}

/// Publishing errors
#[derive(Debug, Error)]
pub enum PublishError {
    /// Copying the source file into the library failed
    #[error("failed to copy {source_path} to {dest_path}: {reason}")]
    CopyFailed {
        /// The source video file
        source_path: PathBuf,
        /// The library destination
        dest_path: PathBuf,
        /// The reason the copy failed
        reason: String,
    },

    /// Reading or writing the publish ledger failed
    #[error("publish ledger error at {path}: {reason}")]
    Ledger {
        /// The marker file or manifest path
        path: PathBuf,
        /// The reason the ledger operation failed
        reason: String,
    },

    /// Invalid path encountered while publishing
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The invalid path that was encountered
        path: PathBuf,
        /// The reason the path is invalid
        reason: String,
    },
}
