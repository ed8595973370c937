//! In-process archive extraction for ZIP, 7z, RAR and gzip-compressed tar

use super::{ArchiveTool, rar, sevenz, tar_gz, zip};
use crate::error::{ExtractionError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Archive formats the native backend can open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFormat {
    /// ZIP archive
    Zip,
    /// 7-Zip archive
    SevenZip,
    /// RAR archive
    Rar,
    /// gzip-compressed tarball (`.tar.gz`, `.tgz`)
    TarGz,
}

impl NativeFormat {
    /// Detect the format from the archive's file name
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".7z") {
            Some(Self::SevenZip)
        } else if name.ends_with(".rar") {
            Some(Self::Rar)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Archive tool backed by the `zip`, `sevenz-rust`, `unrar`, `tar` and
/// `flate2` crates
///
/// Needs no external binary. Other formats report
/// [`ExtractionError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeArchiveTool;

impl NativeArchiveTool {
    /// Create a native archive tool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveTool for NativeArchiveTool {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let format =
            NativeFormat::detect(archive).ok_or_else(|| ExtractionError::UnsupportedFormat {
                archive: archive.to_path_buf(),
            })?;

        let archive_path = archive.to_path_buf();
        let dest_path = dest.to_path_buf();
        let files = tokio::task::spawn_blocking(move || match format {
            NativeFormat::Zip => zip::extract(&archive_path, &dest_path),
            NativeFormat::SevenZip => sevenz::extract(&archive_path, &dest_path),
            NativeFormat::Rar => rar::extract(&archive_path, &dest_path),
            NativeFormat::TarGz => tar_gz::extract(&archive_path, &dest_path),
        })
        .await
        .map_err(|e| ExtractionError::Failed {
            archive: archive.to_path_buf(),
            reason: format!("extraction task failed: {}", e),
        })??;

        debug!(?archive, ?format, files = files.len(), "native extraction finished");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "native"
    }
}
