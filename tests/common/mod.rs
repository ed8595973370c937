//! Common test utilities for torrent-to-plex integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use torrent_to_plex::{
    ArchiveTool, Config, LibraryNotifier, NativeArchiveTool, Parts, Result, TorrentLauncher,
    TorrentToPlex,
};

/// Notifier that counts refresh requests
#[derive(Default)]
pub struct CountingNotifier {
    calls: AtomicUsize,
}

impl CountingNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryNotifier for CountingNotifier {
    async fn refresh(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Launcher that records what it was asked to open
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<PathBuf>>,
}

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl TorrentLauncher for RecordingLauncher {
    async fn launch(&self, torrent: &Path) -> Result<()> {
        self.launched.lock().unwrap().push(torrent.to_path_buf());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Scratch folder layout plus the fakes wired into the service
pub struct TestEnv {
    pub temp: TempDir,
    pub config: Config,
    pub notifier: Arc<CountingNotifier>,
    pub launcher: Arc<RecordingLauncher>,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let mut config = Config::default();
        config.folders.completed_dir = root.join("TorrentsCompleted");
        config.folders.drop_dir = Some(root.join("TorrentDrop"));
        config.folders.tracker_dir = root.join("TorrentTracker");
        config.folders.media_root = root.join("PlexMedia");
        config.watch.settle_delay_ms = 0;
        std::fs::create_dir_all(&config.folders.completed_dir).unwrap();

        Self {
            temp,
            config,
            notifier: Arc::new(CountingNotifier::default()),
            launcher: Arc::new(RecordingLauncher::default()),
        }
    }

    pub fn completed(&self) -> &Path {
        &self.config.folders.completed_dir
    }

    pub fn drop_dir(&self) -> PathBuf {
        self.config.folders.drop_dir.clone().unwrap()
    }

    pub fn shows(&self) -> PathBuf {
        self.config.folders.shows_dir()
    }

    pub fn movies(&self) -> PathBuf {
        self.config.folders.movies_dir()
    }

    pub fn parts(&self) -> Parts {
        self.parts_with(Arc::new(NativeArchiveTool::new()))
    }

    pub fn parts_with(&self, archive_tool: Arc<dyn ArchiveTool>) -> Parts {
        Parts {
            archive_tool,
            notifier: self.notifier.clone(),
            launcher: self.launcher.clone(),
        }
    }

    pub async fn service(&self) -> TorrentToPlex {
        self.service_with(self.parts()).await
    }

    pub async fn service_with(&self, parts: Parts) -> TorrentToPlex {
        TorrentToPlex::with_parts(self.config.clone(), parts)
            .await
            .unwrap()
    }
}

pub fn write(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

pub fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(path).unwrap(),
        flate2::Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Executable shell script standing in for 7z; `$out` holds the `-o` destination
#[cfg(unix)]
pub fn fake_sevenzip(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).unwrap();
    let script = dir.join("7z");
    let text = format!(
        "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -o*) out=\"${{a#-o}}\";; esac; done\n{}\n",
        body
    );
    std::fs::write(&script, text).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Names of the entries in a directory, sorted; empty if it does not exist
pub fn entries(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = read_dir
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Poll until `condition` holds, failing the test after `timeout`
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {:?}",
            timeout
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
