use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extract a 7z archive into `dest_path`
pub(super) fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting 7z archive");

    std::fs::create_dir_all(dest_path)?;

    sevenz_rust::decompress_file(archive_path, dest_path).map_err(|e| {
        let reason = e.to_string();
        Error::Extraction(ExtractionError::Failed {
            archive: archive_path.to_path_buf(),
            reason: if reason.contains("password") || reason.contains("encrypted") {
                "archive is password protected".to_string()
            } else {
                format!("failed to extract 7z archive: {}", reason)
            },
        })
    })?;

    validate_extracted_paths(archive_path, dest_path)?;
    collect_extracted_files(dest_path)
}

/// Validate that all extracted files are within the destination directory.
/// This protects against path traversal in 7z archives.
fn validate_extracted_paths(archive_path: &Path, dest_path: &Path) -> Result<()> {
    let canonical_dest = dest_path.canonicalize()?;

    fn check_dir(dir: &Path, canonical_dest: &Path, archive_path: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let canonical = path.canonicalize()?;

            if !canonical.starts_with(canonical_dest) {
                return Err(Error::Extraction(ExtractionError::Failed {
                    archive: archive_path.to_path_buf(),
                    reason: format!(
                        "path traversal detected: extracted file {:?} is outside destination",
                        canonical
                    ),
                }));
            }

            if path.is_dir() {
                check_dir(&path, canonical_dest, archive_path)?;
            }
        }
        Ok(())
    }

    check_dir(dest_path, &canonical_dest, archive_path)
}

/// Recursively collect all files (not directories) from a directory
fn collect_extracted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                visit_dir(&path, files)?;
            } else {
                files.push(path);
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit_dir(dir, &mut files)?;
    Ok(files)
}
