//! Handling `.torrent` files dropped into the watch folder
//!
//! A dropped descriptor is moved into the tracker folder and handed to the
//! configured [`TorrentLauncher`]. A descriptor whose name is already tracked
//! is a duplicate drop and is left where it is. An empty file is still being
//! written and is left for the next modify event.

use crate::error::{Error, Result};
use crate::launcher::TorrentLauncher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a dropped file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Moved into the tracker folder and launched
    Tracked(PathBuf),
    /// A file with the same name is already tracked
    Duplicate,
    /// Not a `.torrent` file, still empty, or gone before it could be handled
    Ignored,
}

/// Moves dropped `.torrent` files into the tracker folder
pub struct TorrentDropHandler {
    tracker_dir: PathBuf,
    launcher: Arc<dyn TorrentLauncher>,
}

impl TorrentDropHandler {
    /// Create a handler tracking into `tracker_dir`
    pub fn new(tracker_dir: PathBuf, launcher: Arc<dyn TorrentLauncher>) -> Self {
        Self {
            tracker_dir,
            launcher,
        }
    }

    /// Process one dropped file
    pub async fn handle(&self, path: &Path) -> Result<DropOutcome> {
        if !is_torrent_file(path) {
            debug!(?path, "ignoring non-torrent file in drop folder");
            return Ok(DropOutcome::Ignored);
        }

        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                debug!(?path, "dropped torrent no longer exists");
                return Ok(DropOutcome::Ignored);
            }
        };

        if metadata.len() == 0 {
            debug!(?path, "waiting for dropped torrent to be written");
            return Ok(DropOutcome::Ignored);
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| Error::FolderWatch("dropped file has no filename".to_string()))?;
        let tracked = self.tracker_dir.join(file_name);

        if tokio::fs::try_exists(&tracked).await? {
            info!(?path, ?tracked, "torrent already tracked, skipping duplicate drop");
            return Ok(DropOutcome::Duplicate);
        }

        tokio::fs::create_dir_all(&self.tracker_dir).await?;
        move_file(path, &tracked).await?;
        info!(?path, ?tracked, "tracked dropped torrent");

        self.launcher.launch(&tracked).await?;
        Ok(DropOutcome::Tracked(tracked))
    }
}

impl std::fmt::Debug for TorrentDropHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorrentDropHandler")
            .field("tracker_dir", &self.tracker_dir)
            .field("launcher", &self.launcher.name())
            .finish()
    }
}

/// Check if a file is a torrent descriptor (case-insensitive extension)
fn is_torrent_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("torrent"))
        .unwrap_or(false)
}

/// Rename, falling back to copy and delete when source and destination are
/// on different filesystems
async fn move_file(source: &Path, dest: &Path) -> Result<()> {
    match tokio::fs::rename(source, dest).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(?source, ?dest, error = %rename_err, "rename failed, copying instead");
            tokio::fs::copy(source, dest).await?;
            if let Err(e) = tokio::fs::remove_file(source).await {
                warn!(?source, error = %e, "copied torrent but failed to remove original");
            }
            Ok(())
        }
    }
}
