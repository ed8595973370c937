//! Handing tracked `.torrent` files to the torrent client

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Starts a download for a `.torrent` file
#[async_trait]
pub trait TorrentLauncher: Send + Sync {
    /// Hand `torrent` to the torrent client
    async fn launch(&self, torrent: &Path) -> Result<()>;

    /// Short launcher name for logs
    fn name(&self) -> &'static str;
}

/// Opens the file with the operating system's default application
///
/// Uses `xdg-open` on Linux and BSD, `open` on macOS and `cmd /C start` on
/// Windows. The opener is spawned and not waited on.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl SystemLauncher {
    /// Launcher for the current platform's default opener
    pub fn new() -> Self {
        if cfg!(target_os = "windows") {
            Self::with_program(
                PathBuf::from("cmd"),
                vec!["/C".to_string(), "start".to_string(), String::new()],
            )
        } else if cfg!(target_os = "macos") {
            Self::with_program(PathBuf::from("open"), Vec::new())
        } else {
            Self::with_program(PathBuf::from("xdg-open"), Vec::new())
        }
    }

    /// Launcher running `program <leading_args...> <torrent>`
    pub fn with_program(program: PathBuf, leading_args: Vec<String>) -> Self {
        Self {
            program,
            leading_args,
        }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TorrentLauncher for SystemLauncher {
    async fn launch(&self, torrent: &Path) -> Result<()> {
        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(torrent)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Launch {
                path: torrent.to_path_buf(),
                reason: format!("failed to execute {}: {}", self.program.display(), e),
            })?;

        info!(?torrent, program = ?self.program, pid = ?child.id(), "launched torrent client");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Launcher that only logs, for setups where the client picks up the tracker
/// folder itself
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLauncher;

#[async_trait]
impl TorrentLauncher for NoOpLauncher {
    async fn launch(&self, torrent: &Path) -> Result<()> {
        debug!(?torrent, "torrent launch disabled");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawnable_program_launches() {
        let Ok(true_bin) = which::which("true") else {
            return;
        };

        SystemLauncher::with_program(true_bin, Vec::new())
            .launch(Path::new("/tracker/ubuntu.torrent"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_launch_error() {
        let err = SystemLauncher::with_program(PathBuf::from("/nonexistent/bin/opener-xyz"), Vec::new())
            .launch(Path::new("/tracker/ubuntu.torrent"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Launch { ref path, .. } if path == Path::new("/tracker/ubuntu.torrent")));
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        NoOpLauncher
            .launch(Path::new("/tracker/ubuntu.torrent"))
            .await
            .unwrap();
        assert_eq!(NoOpLauncher.name(), "noop");
    }
}
