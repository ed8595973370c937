use crate::error::{Error, ExtractionError, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

fn failed(archive_path: &Path, reason: String) -> Error {
    Error::Extraction(ExtractionError::Failed {
        archive: archive_path.to_path_buf(),
        reason,
    })
}

/// Only plain relative paths may be written below the destination
fn is_enclosed(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Extract a gzip-compressed tarball into `dest_path`
///
/// Regular files and directories are extracted. Links and special entries
/// are skipped, as are entries whose path is absolute or climbs out with `..`.
pub(super) fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting tar.gz archive");

    std::fs::create_dir_all(dest_path)?;

    let file = std::fs::File::open(archive_path)?;
    let mut archive = tar::Archive::new(flate2::read::MultiGzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| failed(archive_path, format!("failed to read tar archive: {}", e)))?;

    let mut extracted_files = Vec::new();

    for entry in entries {
        let mut entry = entry
            .map_err(|e| failed(archive_path, format!("failed to read tar entry: {}", e)))?;

        let entry_path = entry
            .path()
            .map_err(|e| failed(archive_path, format!("invalid tar entry path: {}", e)))?
            .into_owned();

        if !is_enclosed(&entry_path) {
            warn!(?archive_path, ?entry_path, "skipping entry with unsafe path");
            continue;
        }

        let file_path = dest_path.join(&entry_path);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            std::fs::create_dir_all(&file_path)?;
            continue;
        }

        if !entry_type.is_file() {
            debug!(?archive_path, ?entry_path, "skipping non-file tar entry");
            continue;
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        entry
            .unpack(&file_path)
            .map_err(|e| failed(archive_path, format!("failed to extract entry: {}", e)))?;
        extracted_files.push(file_path);
    }

    Ok(extracted_files)
}
