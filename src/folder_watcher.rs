//! Folder watching for finished downloads and dropped torrents
//!
//! This module turns filesystem notifications into [`WatchEvent`]s:
//! - New entries (folders or loose files) in the completed-downloads folder
//!   become [`WatchSource::Completed`] events
//! - New files in the torrent drop folder become [`WatchSource::TorrentDrop`]
//!   events
//! - Watching is non-recursive; only direct children of a watched folder count
//!
//! Events are posted onto a channel consumed by the
//! [`Dispatcher`](crate::dispatcher::Dispatcher), so both folders feed the same
//! sequential processing loop.
//!
//! # Example
//!
//! ```no_run
//! use torrent_to_plex::config::Config;
//! use torrent_to_plex::folder_watcher::FolderWatcher;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let mut watcher = FolderWatcher::from_config(&Config::default(), tx)?;
//! watcher.start()?;
//!
//! let cancel = CancellationToken::new();
//! tokio::spawn(watcher.run(cancel.clone()));
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{:?} {}", event.source, event.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{WatchEvent, WatchSource};
use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A folder being watched and the kind of events it produces
#[derive(Debug, Clone)]
struct WatchedFolder {
    path: PathBuf,
    source: WatchSource,
}

/// Watches the completed and drop folders and forwards new entries
pub struct FolderWatcher {
    /// Filesystem watcher instance
    watcher: RecommendedWatcher,

    /// Channel for receiving raw filesystem events
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,

    /// Channel the translated events are posted to
    events: mpsc::UnboundedSender<WatchEvent>,

    /// Watched folders (canonicalized once `start` has run)
    folders: Vec<WatchedFolder>,
}

impl FolderWatcher {
    /// Create a folder watcher for the given folders
    ///
    /// # Errors
    /// Returns error if the filesystem watcher cannot be initialized
    pub fn new(
        folders: Vec<(WatchSource, PathBuf)>,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = tx.send(res) {
                    error!("Failed to send filesystem event: {}", e);
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::FolderWatch(e.to_string()))?;

        Ok(Self {
            watcher,
            rx,
            events,
            folders: folders
                .into_iter()
                .map(|(source, path)| WatchedFolder { path, source })
                .collect(),
        })
    }

    /// Create a watcher for the configured completed folder and, if set, the
    /// torrent drop folder
    pub fn from_config(config: &Config, events: mpsc::UnboundedSender<WatchEvent>) -> Result<Self> {
        let mut folders = vec![(WatchSource::Completed, config.folders.completed_dir.clone())];
        if let Some(drop_dir) = &config.folders.drop_dir {
            folders.push((WatchSource::TorrentDrop, drop_dir.clone()));
        }
        Self::new(folders, events)
    }

    /// Start watching all configured folders
    ///
    /// Missing folders are created first.
    ///
    /// # Errors
    /// Returns error if any folder cannot be watched (e.g., permission denied)
    pub fn start(&mut self) -> Result<()> {
        for folder in &mut self.folders {
            if !folder.path.exists() {
                std::fs::create_dir_all(&folder.path).map_err(|e| {
                    Error::FolderWatch(format!("Failed to create watch folder: {}", e))
                })?;
                info!(path = ?folder.path, "created watch folder");
            }

            // Event paths are reported relative to the registered path
            folder.path = folder.path.canonicalize().map_err(|e| {
                Error::FolderWatch(format!("Failed to resolve watch folder: {}", e))
            })?;

            self.watcher
                .watch(&folder.path, RecursiveMode::NonRecursive)
                .map_err(|e| Error::FolderWatch(format!("Failed to watch folder: {}", e)))?;

            info!(path = ?folder.path, source = ?folder.source, "watching folder");
        }

        Ok(())
    }

    /// Run the folder watcher event loop
    ///
    /// Runs until `cancel` fires or the receiving side of the event channel
    /// is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Folder watcher started");

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.rx.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
            };

            match result {
                Ok(event) => {
                    for watch_event in self.translate(event) {
                        debug!(source = ?watch_event.source, path = ?watch_event.path, "new entry");
                        if self.events.send(watch_event).is_err() {
                            info!("Event receiver dropped, stopping folder watcher");
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Filesystem watcher error: {}", e);
                }
            }
        }

        info!("Folder watcher stopped");
    }

    /// Map a raw notification to watch events for direct children of the
    /// watched folders.
    ///
    /// Completed content counts when it is created or renamed into place.
    /// Drop folder files also count on modification, since some browsers
    /// write downloads in place.
    fn translate(&self, event: Event) -> Vec<WatchEvent> {
        let mut translated = Vec::new();

        for path in event.paths {
            let Some(folder) = path
                .parent()
                .and_then(|parent| self.folders.iter().find(|f| f.path == parent))
            else {
                continue;
            };

            let relevant = match folder.source {
                WatchSource::Completed => matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
                ),
                WatchSource::TorrentDrop => {
                    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                }
            };

            if relevant {
                translated.push(WatchEvent {
                    source: folder.source,
                    path,
                });
            }
        }

        translated
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::time::{Duration, timeout};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event {
            kind,
            paths: vec![path.to_path_buf()],
            attrs: Default::default(),
        }
    }

    fn watcher_for(completed: &Path, drop: &Path) -> FolderWatcher {
        let (tx, _rx) = mpsc::unbounded_channel();
        FolderWatcher::new(
            vec![
                (WatchSource::Completed, completed.to_path_buf()),
                (WatchSource::TorrentDrop, drop.to_path_buf()),
            ],
            tx,
        )
        .unwrap()
    }

    #[test]
    fn created_folder_in_completed_dir_is_completed_event() {
        let watcher = watcher_for(Path::new("/done"), Path::new("/drop"));

        let events = watcher.translate(event(
            EventKind::Create(CreateKind::Folder),
            Path::new("/done/MovieX"),
        ));

        assert_eq!(events, vec![WatchEvent::completed("/done/MovieX")]);
    }

    #[test]
    fn rename_into_completed_dir_counts() {
        let watcher = watcher_for(Path::new("/done"), Path::new("/drop"));

        let events = watcher.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            Path::new("/done/ShowY.S01E01.zip"),
        ));

        assert_eq!(events.len(), 1);
    }

    #[test]
    fn content_writes_in_completed_dir_are_ignored() {
        let watcher = watcher_for(Path::new("/done"), Path::new("/drop"));

        let events = watcher.translate(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            Path::new("/done/MovieX.mkv"),
        ));

        assert!(events.is_empty());
    }

    #[test]
    fn modified_file_in_drop_dir_is_drop_event() {
        let watcher = watcher_for(Path::new("/done"), Path::new("/drop"));

        let events = watcher.translate(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            Path::new("/drop/ubuntu.torrent"),
        ));

        assert_eq!(events, vec![WatchEvent::torrent_drop("/drop/ubuntu.torrent")]);
    }

    #[test]
    fn removals_and_nested_paths_are_ignored() {
        let watcher = watcher_for(Path::new("/done"), Path::new("/drop"));

        assert!(
            watcher
                .translate(event(
                    EventKind::Remove(RemoveKind::Folder),
                    Path::new("/done/MovieX"),
                ))
                .is_empty()
        );
        assert!(
            watcher
                .translate(event(
                    EventKind::Create(CreateKind::File),
                    Path::new("/done/MovieX/MovieX.mkv"),
                ))
                .is_empty()
        );
        assert!(
            watcher
                .translate(event(
                    EventKind::Create(CreateKind::File),
                    Path::new("/elsewhere/file.mkv"),
                ))
                .is_empty()
        );
    }

    #[test]
    fn start_creates_missing_folders() {
        let temp_dir = TempDir::new().unwrap();
        let completed = temp_dir.path().join("TorrentsCompleted");
        let drop = temp_dir.path().join("TorrentDrop");

        let mut watcher = watcher_for(&completed, &drop);
        assert!(!drop.exists());
        watcher.start().unwrap();

        assert!(completed.is_dir());
        assert!(drop.is_dir());
    }

    #[tokio::test]
    async fn folder_created_on_disk_reaches_channel() {
        let temp_dir = TempDir::new().unwrap();
        let completed = temp_dir.path().join("TorrentsCompleted");
        std::fs::create_dir_all(&completed).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher =
            FolderWatcher::new(vec![(WatchSource::Completed, completed.clone())], tx).unwrap();
        watcher.start().unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::create_dir(completed.join("MovieX")).unwrap();

        let received = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no watch event within timeout")
            .unwrap();
        assert_eq!(received.source, WatchSource::Completed);
        assert_eq!(received.path.file_name().unwrap(), "MovieX");

        cancel.cancel();
        timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
