//! Numbered temporary extraction directories with guaranteed removal

use crate::error::{ExtractionError, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A temporary directory owned by exactly one extraction call.
///
/// The directory is named by appending the first free integer to the base
/// path (`Temp0`, `Temp1`, ...). It is removed recursively either through
/// [`TempExtractionDir::remove`] or, if that never runs (early return, error,
/// panic, cancelled future), when the value is dropped.
#[derive(Debug)]
pub struct TempExtractionDir {
    path: PathBuf,
    removed: bool,
}

impl TempExtractionDir {
    /// Allocate the first unused `<base><N>` directory.
    ///
    /// Creation itself is the check, so two allocations can never be handed
    /// the same directory.
    pub async fn create(base: &Path) -> Result<Self> {
        if let Some(parent) = base.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExtractionError::TempDirUnavailable {
                    base: base.to_path_buf(),
                    reason: format!("failed to create parent directory: {}", e),
                }
            })?;
        }

        let mut index: u32 = 0;
        loop {
            let candidate = numbered(base, index);
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => {
                    debug!(path = ?candidate, "allocated temporary extraction directory");
                    return Ok(Self {
                        path: candidate,
                        removed: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    index = index.checked_add(1).ok_or_else(|| {
                        ExtractionError::TempDirUnavailable {
                            base: base.to_path_buf(),
                            reason: "no free directory name left".to_string(),
                        }
                    })?;
                }
                Err(e) => {
                    return Err(ExtractionError::TempDirUnavailable {
                        base: base.to_path_buf(),
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }
    }

    /// Path of the allocated directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it.
    ///
    /// On failure the drop guard makes one more synchronous attempt.
    pub async fn remove(mut self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                self.removed = true;
                debug!(path = ?self.path, "removed temporary extraction directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.removed = true;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for TempExtractionDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = ?self.path, "removed temporary extraction directory on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = ?self.path,
                error = %e,
                "failed to remove temporary extraction directory"
            ),
        }
    }
}

fn numbered(base: &Path, index: u32) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(index.to_string());
    PathBuf::from(name)
}
