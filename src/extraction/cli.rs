//! Archive extraction through an external 7-Zip binary

use super::ArchiveTool;
use crate::config::ToolsConfig;
use crate::error::{Error, ExtractionError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Binary names searched for on PATH, in order
const SEVENZIP_BINARIES: [&str; 3] = ["7z", "7za", "7zz"];

/// 7-Zip exit code for a warning such as a locked or skipped file
const SEVENZIP_WARNING: i32 = 1;

/// Archive tool that runs `7z x <archive> -o<dest> -y`
///
/// 7-Zip handles every archive type the classifier recognizes. A compressed
/// tarball (`.tar.gz`, `.tgz`) only loses its gzip layer on the first run,
/// so the lone inner `.tar` is extracted by a second run and then removed.
/// Exit code 1 is a warning: whatever was extracted is kept.
///
/// # Examples
///
/// ```no_run
/// use torrent_to_plex::extraction::{ArchiveTool, CliArchiveTool};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = CliArchiveTool::from_path().expect("7z not found in PATH");
/// tool.extract(Path::new("Show.S01E01.rar"), Path::new("/tmp/Temp0")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CliArchiveTool {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl CliArchiveTool {
    /// Create a new CLI tool with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Kill the child process if it runs longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempt to find 7-Zip in PATH
    ///
    /// Tries `7z`, `7za` and `7zz` in that order.
    pub fn from_path() -> Option<Self> {
        SEVENZIP_BINARIES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    /// Build the tool from configuration.
    ///
    /// An explicit `sevenzip_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled.
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        let tool = match &tools.sevenzip_path {
            Some(path) if path.is_file() => Self::new(path.clone()),
            Some(path) => {
                return Err(Error::Config {
                    message: format!("7-Zip binary not found at {}", path.display()),
                    key: Some("sevenzip_path".to_string()),
                });
            }
            None if tools.search_path => Self::from_path().ok_or_else(|| Error::Config {
                message: "7-Zip binary (7z, 7za or 7zz) not found in PATH".to_string(),
                key: Some("sevenzip_path".to_string()),
            })?,
            None => {
                return Err(Error::Config {
                    message: "no 7-Zip binary configured and PATH search is disabled".to_string(),
                    key: Some("sevenzip_path".to_string()),
                });
            }
        };

        Ok(tool.with_timeout(tools.extract_timeout))
    }

    /// Path of the binary this tool executes
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self, archive: &Path, dest: &Path) -> Command {
        let mut out_flag = OsString::from("-o");
        out_flag.push(dest.as_os_str());

        let mut command = Command::new(&self.binary_path);
        command
            .arg("x")
            .arg(archive)
            .arg(out_flag)
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!(binary = ?self.binary_path, ?archive, ?dest, "running 7-Zip");

        let mut command = self.command(archive, dest);
        let run = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                ExtractionError::TimedOut {
                    archive: archive.to_path_buf(),
                    seconds: limit.as_secs(),
                }
            })?,
            None => run.await,
        }
        .map_err(|e| Error::ExternalTool(format!("Failed to execute 7-Zip: {}", e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            return Ok(());
        }

        if output.status.code() == Some(SEVENZIP_WARNING) {
            warn!(?archive, stderr = %stderr.trim(), "7-Zip finished with warnings");
            return Ok(());
        }

        let reason = match stderr.trim() {
            "" => format!("7-Zip exited with {}", output.status),
            message => format!("7-Zip exited with {}: {}", output.status, message),
        };

        Err(ExtractionError::Failed {
            archive: archive.to_path_buf(),
            reason,
        }
        .into())
    }
}

fn is_compressed_tarball(archive: &Path) -> bool {
    archive
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| name.ends_with(".tar.gz") || name.ends_with(".tgz"))
}

/// The single `.tar` file directly inside `dest`, if there is exactly one
async fn lone_tarball(dest: &Path) -> Result<Option<PathBuf>> {
    let mut found = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dest).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let is_tar = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tar"));
        if is_tar && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }

    Ok(match found.len() {
        1 => found.pop(),
        _ => None,
    })
}

#[async_trait]
impl ArchiveTool for CliArchiveTool {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.run(archive, dest).await?;

        if !is_compressed_tarball(archive) {
            return Ok(());
        }

        match lone_tarball(dest).await? {
            Some(inner) => {
                debug!(?archive, ?inner, "extracting inner tarball");
                self.run(&inner, dest).await?;
                tokio::fs::remove_file(&inner).await?;
            }
            None => warn!(?archive, "no single inner tarball found after decompression"),
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "7z-cli"
    }
}
