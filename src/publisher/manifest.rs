//! JSON manifest publish ledger

use super::PublishLedger;
use crate::error::{PublishError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    published_at: DateTime<Utc>,
}

/// Ledger that keeps every published destination in one JSON file
///
/// The manifest is loaded once at startup and rewritten after every
/// publication. Writes are serialized by a mutex and land through a rename,
/// so a crash never leaves a half-written manifest behind. An entry only
/// becomes visible in memory once it has been written to disk.
#[derive(Debug)]
pub struct ManifestLedger {
    path: PathBuf,
    manifest: Mutex<Manifest>,
}

impl ManifestLedger {
    /// Open the manifest at `path`, starting empty if it does not exist yet
    pub async fn open(path: PathBuf) -> Result<Self> {
        let manifest = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| PublishError::Ledger {
                path: path.clone(),
                reason: format!("invalid manifest: {}", e),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Manifest::default(),
            Err(e) => {
                return Err(PublishError::Ledger {
                    path,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        debug!(?path, entries = manifest.entries.len(), "loaded publish manifest");

        Ok(Self {
            path,
            manifest: Mutex::new(manifest),
        })
    }

    /// Location of the manifest file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When `destination` was published, if ever
    pub async fn published_at(&self, destination: &Path) -> Option<DateTime<Utc>> {
        self.manifest
            .lock()
            .await
            .entries
            .get(&key(destination))
            .map(|entry| entry.published_at)
    }

    async fn persist(&self, manifest: &Manifest) -> Result<()> {
        let ledger_error = |reason: String| PublishError::Ledger {
            path: self.path.clone(),
            reason,
        };

        let json = serde_json::to_vec_pretty(manifest)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ledger_error(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ledger_error(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ledger_error(e.to_string()))?;
        Ok(())
    }
}

fn key(destination: &Path) -> String {
    destination.to_string_lossy().into_owned()
}

#[async_trait]
impl PublishLedger for ManifestLedger {
    async fn is_published(&self, destination: &Path) -> Result<bool> {
        Ok(self
            .manifest
            .lock()
            .await
            .entries
            .contains_key(&key(destination)))
    }

    async fn record(&self, destination: &Path) -> Result<()> {
        let mut manifest = self.manifest.lock().await;
        let mut updated = manifest.clone();
        updated.entries.insert(
            key(destination),
            ManifestEntry {
                published_at: Utc::now(),
            },
        );
        self.persist(&updated).await?;
        *manifest = updated;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "manifest"
    }
}
