//! Archive expansion
//!
//! Archives found while walking completed content are unpacked into a fresh
//! numbered temporary directory under the media root, the extracted tree is
//! walked recursively (so nested archives expand too), and the temporary
//! directory is removed afterwards on every exit path.
//!
//! ## Architecture
//!
//! The unpacking itself sits behind the [`ArchiveTool`] trait:
//!
//! - [`CliArchiveTool`]: runs an external 7-Zip binary (the default backend)
//! - [`NativeArchiveTool`]: extracts ZIP, 7z, RAR and `.tar.gz` in-process

mod cli;
mod native;
mod rar;
mod sevenz;
mod tar_gz;
mod temp_dir;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use cli::CliArchiveTool;
pub use native::{NativeArchiveTool, NativeFormat};
pub use temp_dir::TempExtractionDir;

use crate::config::{ExtractorBackend, ToolsConfig};
use crate::error::{ExtractionError, Result};
use crate::types::BatchReport;
use crate::walker::ContentWalker;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Unpacks one archive into a destination directory
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// Extract every entry of `archive` into `dest`.
    ///
    /// `dest` already exists and is empty. Implementations must not return
    /// until extraction has finished or failed.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Build the archive tool selected by configuration
pub fn archive_tool_from_config(tools: &ToolsConfig) -> Result<Arc<dyn ArchiveTool>> {
    match tools.extractor {
        ExtractorBackend::Cli => Ok(Arc::new(CliArchiveTool::from_config(tools)?)),
        ExtractorBackend::Native => Ok(Arc::new(NativeArchiveTool::new())),
    }
}

/// Expands archives into temporary directories and walks the result
#[derive(Clone)]
pub struct ArchiveExpander {
    tool: Arc<dyn ArchiveTool>,
    temp_base: PathBuf,
    max_depth: u32,
}

impl ArchiveExpander {
    /// Create an expander.
    ///
    /// `temp_base` is the path numbered directories are derived from
    /// (`<temp_base>0`, `<temp_base>1`, ...). Archives found deeper than
    /// `max_depth` levels of nesting are reported instead of extracted.
    pub fn new(tool: Arc<dyn ArchiveTool>, temp_base: PathBuf, max_depth: u32) -> Self {
        Self {
            tool,
            temp_base,
            max_depth,
        }
    }

    /// Name of the backing archive tool
    pub fn tool_name(&self) -> &'static str {
        self.tool.name()
    }

    /// Expand `archive` and walk its contents.
    ///
    /// `depth` is the nesting level of the walk that found the archive. The
    /// temporary directory is gone by the time this returns, whatever the
    /// outcome; if the future is dropped or the tool panics the directory is
    /// removed while unwinding.
    pub(crate) async fn expand(
        &self,
        walker: &ContentWalker,
        archive: &Path,
        forced_show: bool,
        depth: u32,
    ) -> Result<BatchReport> {
        if depth >= self.max_depth {
            return Err(ExtractionError::TooDeep {
                archive: archive.to_path_buf(),
                depth,
            }
            .into());
        }

        let temp = TempExtractionDir::create(&self.temp_base).await?;
        info!(
            ?archive,
            temp_dir = ?temp.path(),
            tool = self.tool.name(),
            forced_show,
            "expanding archive"
        );

        let outcome = match self.tool.extract(archive, temp.path()).await {
            Ok(()) => Ok(walker
                .walk_at_depth(temp.path(), forced_show, depth + 1)
                .await),
            Err(e) => Err(e),
        };

        let temp_path = temp.path().to_path_buf();
        if let Err(e) = temp.remove().await {
            warn!(temp_dir = ?temp_path, error = %e, "failed to remove temporary extraction directory");
        }

        outcome?
    }
}

impl std::fmt::Debug for ArchiveExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveExpander")
            .field("tool", &self.tool.name())
            .field("temp_base", &self.temp_base)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
