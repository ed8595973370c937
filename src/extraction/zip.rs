use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn failed(archive_path: &Path, reason: String) -> Error {
    Error::Extraction(ExtractionError::Failed {
        archive: archive_path.to_path_buf(),
        reason,
    })
}

/// Extract a single ZIP entry to disk, creating directories as needed
fn extract_entry(
    mut file: zip::read::ZipFile,
    dest_path: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>> {
    // enclosed_name rejects absolute paths and ".." components
    let file_path = match file.enclosed_name() {
        Some(path) => dest_path.join(path),
        None => {
            warn!(?archive_path, "skipping entry with unsafe path");
            return Ok(None);
        }
    };

    if file.is_dir() {
        std::fs::create_dir_all(&file_path)?;
        return Ok(None);
    }

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut outfile = std::fs::File::create(&file_path)?;
    std::io::copy(&mut file, &mut outfile)
        .map_err(|e| failed(archive_path, format!("failed to extract entry: {}", e)))?;

    Ok(Some(file_path))
}

/// Extract every entry of a ZIP archive into `dest_path`
pub(super) fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting ZIP archive");

    std::fs::create_dir_all(dest_path)?;

    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| failed(archive_path, format!("failed to read ZIP archive: {}", e)))?;

    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| {
            let reason = e.to_string();
            if reason.contains("password") || reason.contains("encrypted") {
                failed(archive_path, "archive is password protected".to_string())
            } else {
                failed(archive_path, format!("failed to read ZIP entry: {}", reason))
            }
        })?;

        if let Some(file_path) = extract_entry(entry, dest_path, archive_path)? {
            extracted_files.push(file_path);
        }
    }

    Ok(extracted_files)
}
