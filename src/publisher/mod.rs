//! Publishing video files into the media library
//!
//! A qualifying video is copied to `Shows/<name>` or `Movies/<name>` under the
//! media root. Each publication is recorded in a [`PublishLedger`] so the same
//! destination is never copied twice:
//!
//! - [`MarkerLedger`]: a `<destination>.meta` sentinel file per publication
//! - [`ManifestLedger`]: one JSON manifest with a timestamp per destination
//!
//! The copy and the ledger update are not transactional. A crash in between
//! leaves a file without a marker, which the next scan simply copies again.

mod manifest;
mod marker;

pub use manifest::ManifestLedger;
pub use marker::MarkerLedger;

use crate::config::{Config, LedgerKind};
use crate::error::{PublishError, Result};
use crate::types::MediaKind;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Record of which library destinations have already been published
#[async_trait]
pub trait PublishLedger: Send + Sync {
    /// Whether `destination` was published before
    async fn is_published(&self, destination: &Path) -> Result<bool>;

    /// Remember that `destination` has been published
    async fn record(&self, destination: &Path) -> Result<()>;

    /// Short ledger name for logs
    fn name(&self) -> &'static str;
}

/// Build the ledger selected by configuration
pub async fn ledger_from_config(config: &Config) -> Result<Arc<dyn PublishLedger>> {
    match config.publish.ledger {
        LedgerKind::Marker => Ok(Arc::new(MarkerLedger::new(
            config.publish.marker_suffix.clone(),
        ))),
        LedgerKind::Manifest => Ok(Arc::new(
            ManifestLedger::open(config.manifest_path()).await?,
        )),
    }
}

/// Copies videos into the library, at most once per destination
pub struct Publisher {
    shows_dir: PathBuf,
    movies_dir: PathBuf,
    ledger: Arc<dyn PublishLedger>,
}

impl Publisher {
    /// Create a publisher writing into the given library folders
    pub fn new(shows_dir: PathBuf, movies_dir: PathBuf, ledger: Arc<dyn PublishLedger>) -> Self {
        Self {
            shows_dir,
            movies_dir,
            ledger,
        }
    }

    /// Create a publisher for the configured media root and ledger
    pub async fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.folders.shows_dir(),
            config.folders.movies_dir(),
            ledger_from_config(config).await?,
        ))
    }

    /// Create the `Shows` and `Movies` folders if they are missing
    pub async fn ensure_library(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.shows_dir).await?;
        tokio::fs::create_dir_all(&self.movies_dir).await?;
        Ok(())
    }

    /// Library path a source file publishes to
    pub fn destination_for(&self, source: &Path, kind: MediaKind) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| PublishError::InvalidPath {
            path: source.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

        let dir = match kind {
            MediaKind::Show => &self.shows_dir,
            MediaKind::Movie => &self.movies_dir,
        };
        Ok(dir.join(file_name))
    }

    /// Publish `source` as `kind`.
    ///
    /// Returns `true` if the file was copied, `false` if the ledger already
    /// lists its destination. A stray destination file without a ledger entry
    /// is overwritten.
    pub async fn publish(&self, source: &Path, kind: MediaKind) -> Result<bool> {
        let destination = self.destination_for(source, kind)?;

        if self.ledger.is_published(&destination).await? {
            info!(?source, ?destination, "already published");
            return Ok(false);
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(?source, ?destination, %kind, "copying into library");
        tokio::fs::copy(source, &destination)
            .await
            .map_err(|e| PublishError::CopyFailed {
                source_path: source.to_path_buf(),
                dest_path: destination.clone(),
                reason: e.to_string(),
            })?;

        self.ledger.record(&destination).await?;

        info!(?source, ?destination, %kind, ledger = self.ledger.name(), "published");
        Ok(true)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("shows_dir", &self.shows_dir)
            .field("movies_dir", &self.movies_dir)
            .field("ledger", &self.ledger.name())
            .finish()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn marker_publisher(root: &Path) -> Publisher {
        Publisher::new(
            root.join("Shows"),
            root.join("Movies"),
            Arc::new(MarkerLedger::new(".meta")),
        )
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn publish_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");
        let source = write_source(&temp_dir.path().join("in"), "Movie.mkv", b"movie");
        let publisher = marker_publisher(&library);

        assert!(publisher.publish(&source, MediaKind::Movie).await.unwrap());
        assert!(!publisher.publish(&source, MediaKind::Movie).await.unwrap());

        let movies: Vec<_> = std::fs::read_dir(library.join("Movies"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(movies.len(), 2);
        assert_eq!(
            std::fs::read(library.join("Movies").join("Movie.mkv")).unwrap(),
            b"movie"
        );
        assert!(library.join("Movies").join("Movie.mkv.meta").is_file());
    }

    #[tokio::test]
    async fn stray_destination_without_marker_is_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");
        std::fs::create_dir_all(library.join("Shows")).unwrap();
        std::fs::write(library.join("Shows").join("Show.S01E01.mkv"), b"partial").unwrap();
        let source = write_source(&temp_dir.path().join("in"), "Show.S01E01.mkv", b"full episode");

        let published = marker_publisher(&library)
            .publish(&source, MediaKind::Show)
            .await
            .unwrap();

        assert!(published);
        assert_eq!(
            std::fs::read(library.join("Shows").join("Show.S01E01.mkv")).unwrap(),
            b"full episode"
        );
    }

    #[tokio::test]
    async fn same_name_from_different_sources_publishes_once() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");
        let first = write_source(&temp_dir.path().join("a"), "Movie.mkv", b"first");
        let second = write_source(&temp_dir.path().join("b"), "Movie.mkv", b"second");
        let publisher = marker_publisher(&library);

        assert!(publisher.publish(&first, MediaKind::Movie).await.unwrap());
        assert!(!publisher.publish(&second, MediaKind::Movie).await.unwrap());
        assert_eq!(
            std::fs::read(library.join("Movies").join("Movie.mkv")).unwrap(),
            b"first"
        );
    }

    #[tokio::test]
    async fn missing_source_is_copy_failure_without_marker() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");
        let publisher = marker_publisher(&library);

        let err = publisher
            .publish(&temp_dir.path().join("gone.mkv"), MediaKind::Movie)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Publish(PublishError::CopyFailed { .. })
        ));
        assert!(!library.join("Movies").join("gone.mkv.meta").exists());
    }

    #[tokio::test]
    async fn manifest_ledger_guards_republish() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");
        let source = write_source(&temp_dir.path().join("in"), "Movie.mkv", b"movie");
        let ledger = ManifestLedger::open(library.join(".published.json"))
            .await
            .unwrap();
        let publisher = Publisher::new(library.join("Shows"), library.join("Movies"), Arc::new(ledger));

        assert!(publisher.publish(&source, MediaKind::Movie).await.unwrap());
        assert!(!publisher.publish(&source, MediaKind::Movie).await.unwrap());
        assert!(!library.join("Movies").join("Movie.mkv.meta").exists());
    }

    #[tokio::test]
    async fn ensure_library_creates_shows_and_movies_only() {
        let temp_dir = TempDir::new().unwrap();
        let library = temp_dir.path().join("PlexMedia");

        marker_publisher(&library).ensure_library().await.unwrap();

        assert!(library.join("Shows").is_dir());
        assert!(library.join("Movies").is_dir());
        assert!(!library.join("Other").exists());
    }

    #[test]
    fn destination_follows_media_kind() {
        let publisher = marker_publisher(Path::new("/lib"));
        assert_eq!(
            publisher
                .destination_for(Path::new("/in/dir/Show.S01E01.mkv"), MediaKind::Show)
                .unwrap(),
            PathBuf::from("/lib/Shows/Show.S01E01.mkv")
        );
        assert_eq!(
            publisher
                .destination_for(Path::new("/in/Movie.mkv"), MediaKind::Movie)
                .unwrap(),
            PathBuf::from("/lib/Movies/Movie.mkv")
        );
        assert!(publisher.destination_for(Path::new("/"), MediaKind::Movie).is_err());
    }
}
