use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

fn failed(archive_path: &Path, reason: impl Into<String>) -> Error {
    Error::Extraction(ExtractionError::Failed {
        archive: archive_path.to_path_buf(),
        reason: reason.into(),
    })
}

/// Check if an unrar error indicates a password problem
fn is_password_error(error_msg: &str) -> bool {
    error_msg.contains("password")
        || error_msg.contains("encrypted")
        || error_msg.contains("ERAR_BAD_PASSWORD")
        || error_msg.contains("ERAR_MISSING_PASSWORD")
}

fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> Error {
    let reason = e.to_string();
    if is_password_error(&reason) {
        failed(archive_path, "archive is password protected")
    } else {
        failed(archive_path, reason)
    }
}

/// Strip everything but normal components so entries cannot escape `dest_path`
fn sanitize_entry_name(name: &Path) -> PathBuf {
    name.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect()
}

/// Extract a RAR archive into `dest_path`
pub(super) fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting RAR archive");

    std::fs::create_dir_all(dest_path)?;

    let mut at_header = unrar::Archive::new(archive_path)
        .open_for_processing()
        .map_err(|e| convert_unrar_error(e, archive_path))?;

    let mut extracted_files = Vec::new();

    loop {
        let at_file = match at_header.read_header() {
            Ok(Some(entry_processor)) => entry_processor,
            Ok(None) => break,
            Err(e) => return Err(convert_unrar_error(e, archive_path)),
        };

        let header = at_file.entry();
        let sanitized = sanitize_entry_name(Path::new(&header.filename));

        if sanitized.as_os_str().is_empty() || header.is_directory() {
            at_header = at_file
                .skip()
                .map_err(|e| failed(archive_path, format!("failed to skip entry: {}", e)))?;
            continue;
        }

        let file_path = dest_path.join(&sanitized);
        at_header = at_file
            .extract_to(&file_path)
            .map_err(|e| convert_unrar_error(e, archive_path))?;
        extracted_files.push(file_path);
    }

    Ok(extracted_files)
}
