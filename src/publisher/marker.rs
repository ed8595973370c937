//! Marker-file publish ledger

use super::PublishLedger;
use crate::error::{PublishError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Placeholder written into every marker file
const MARKER_CONTENT: &[u8] = b"published";

/// Ledger that records a publication as a sentinel file next to the
/// destination (`Movie.mkv` → `Movie.mkv.meta`)
///
/// Deleting the marker makes the next scan publish the file again.
#[derive(Debug, Clone)]
pub struct MarkerLedger {
    suffix: String,
}

impl MarkerLedger {
    /// Create a ledger using `suffix` for marker file names
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Marker path for a library destination
    pub fn marker_path(&self, destination: &Path) -> PathBuf {
        let mut name = OsString::from(destination.as_os_str());
        name.push(&self.suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl PublishLedger for MarkerLedger {
    async fn is_published(&self, destination: &Path) -> Result<bool> {
        let marker = self.marker_path(destination);
        tokio::fs::try_exists(&marker).await.map_err(|e| {
            PublishError::Ledger {
                path: marker,
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn record(&self, destination: &Path) -> Result<()> {
        let marker = self.marker_path(destination);
        tokio::fs::write(&marker, MARKER_CONTENT)
            .await
            .map_err(|e| {
                PublishError::Ledger {
                    path: marker,
                    reason: e.to_string(),
                }
                .into()
            })
    }

    fn name(&self) -> &'static str {
        "marker"
    }
}
