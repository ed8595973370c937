use crate::classifier::Classifier;
use crate::config::ClassificationConfig;
use crate::error::{Error, ExtractionError, Result};
use crate::extraction::{ArchiveExpander, ArchiveTool};
use crate::publisher::{MarkerLedger, Publisher};
use crate::walker::ContentWalker;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// What the fake tool does when asked to extract
enum Behavior {
    /// Write the given files into the destination
    Produce(Vec<(&'static str, &'static [u8])>),
    /// Fail like a non-zero tool exit
    Fail,
    /// Panic mid-extraction
    Panic,
}

/// Archive tool that follows a script and remembers every destination
struct ScriptedTool {
    behavior: Behavior,
    destinations: Mutex<Vec<PathBuf>>,
}

impl ScriptedTool {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            destinations: Mutex::new(Vec::new()),
        })
    }

    fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveTool for ScriptedTool {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        self.destinations.lock().unwrap().push(dest.to_path_buf());
        match &self.behavior {
            Behavior::Produce(files) => {
                for (name, content) in files {
                    let path = dest.join(name);
                    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                    std::fs::write(path, content).unwrap();
                }
                Ok(())
            }
            Behavior::Fail => Err(ExtractionError::Failed {
                archive: archive.to_path_buf(),
                reason: "7-Zip exited with exit status: 2".to_string(),
            }
            .into()),
            Behavior::Panic => panic!("archive tool crashed"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct Harness {
    temp: TempDir,
    library: PathBuf,
    walker: Arc<ContentWalker>,
}

impl Harness {
    fn new(tool: Arc<ScriptedTool>) -> Self {
        let temp = TempDir::new().unwrap();
        let library = temp.path().join("PlexMedia");
        let walker = ContentWalker::new(
            Arc::new(Classifier::new(&ClassificationConfig::default()).unwrap()),
            Arc::new(Publisher::new(
                library.join("Shows"),
                library.join("Movies"),
                Arc::new(MarkerLedger::new(".meta")),
            )),
            ArchiveExpander::new(tool, library.join("Temp"), 8),
        );

        Self {
            temp,
            library,
            walker: Arc::new(walker),
        }
    }

    fn archive(&self, name: &str) -> PathBuf {
        let path = self.temp.path().join("in").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"archive bytes").unwrap();
        path
    }

    fn temp_dirs_left(&self) -> Vec<PathBuf> {
        if !self.library.exists() {
            return Vec::new();
        }
        std::fs::read_dir(&self.library)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with("Temp")
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Temporary directory lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn temp_dir_removed_when_nothing_is_published() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![("readme.txt", b"hello".as_slice())]));
    let harness = Harness::new(tool.clone());
    let archive = harness.archive("Movie.zip");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert!(!report.published);
    assert_eq!(report.archives_expanded, 1);
    assert_eq!(tool.destinations(), vec![harness.library.join("Temp0")]);
    assert!(harness.temp_dirs_left().is_empty());
}

#[tokio::test]
async fn temp_dir_removed_when_something_is_published() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![("Movie.mkv", b"feature".as_slice())]));
    let harness = Harness::new(tool);
    let archive = harness.archive("Movie.zip");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert!(report.published);
    assert!(harness.library.join("Movies").join("Movie.mkv").is_file());
    assert!(harness.temp_dirs_left().is_empty());
}

#[tokio::test]
async fn temp_dir_removed_when_tool_fails() {
    let tool = ScriptedTool::new(Behavior::Fail);
    let harness = Harness::new(tool.clone());
    let archive = harness.archive("Movie.rar");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert_eq!(report.failures, 1);
    assert!(!report.published);
    assert_eq!(tool.destinations().len(), 1);
    assert!(harness.temp_dirs_left().is_empty());
}

#[tokio::test]
async fn temp_dir_removed_when_tool_panics() {
    let tool = ScriptedTool::new(Behavior::Panic);
    let harness = Harness::new(tool.clone());
    let archive = harness.archive("Movie.7z");

    let walker = harness.walker.clone();
    let joined = tokio::spawn(async move { walker.walk(&archive, false).await }).await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(tool.destinations().len(), 1);
    assert!(harness.temp_dirs_left().is_empty());
}

#[tokio::test]
async fn expansion_errors_surface_from_expander() {
    let tool = ScriptedTool::new(Behavior::Fail);
    let harness = Harness::new(tool.clone());
    let archive = harness.archive("Movie.zip");
    let expander = ArchiveExpander::new(tool, harness.library.join("Temp"), 8);

    let err = expander
        .expand(&harness.walker, &archive, false, 0)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Failed { .. })
    ));
    assert!(harness.temp_dirs_left().is_empty());
}

// ---------------------------------------------------------------------------
// Show propagation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn show_archive_publishes_neutral_names_as_shows() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![
        ("episode1.mkv", b"one".as_slice()),
        ("bonus/episode2.mkv", b"two".as_slice()),
    ]));
    let harness = Harness::new(tool);
    let archive = harness.archive("Show.S03E01-E02.rar");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert_eq!(report.published_files, 2);
    assert!(harness.library.join("Shows").join("episode1.mkv").is_file());
    assert!(harness.library.join("Shows").join("episode2.mkv").is_file());
    assert!(!harness.library.join("Movies").exists());
}

#[tokio::test]
async fn movie_archive_leaves_neutral_names_as_movies() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![("feature.mkv", b"film".as_slice())]));
    let harness = Harness::new(tool);
    let archive = harness.archive("Feature.2021.zip");

    let _ = harness.walker.walk(&archive, false).await.unwrap();

    assert!(harness.library.join("Movies").join("feature.mkv").is_file());
}

#[tokio::test]
async fn forced_show_does_not_publish_samples() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![
        ("Show.S01E01.mkv", b"episode".as_slice()),
        ("Show.S01E01.sample.mkv", b"clip".as_slice()),
    ]));
    let harness = Harness::new(tool);
    let archive = harness.archive("Show.Season.1.zip");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert_eq!(report.published_files, 1);
    assert_eq!(report.skipped_samples, 1);
    assert!(
        !harness
            .library
            .join("Shows")
            .join("Show.S01E01.sample.mkv")
            .exists()
    );
}

#[tokio::test]
async fn sample_archive_is_never_expanded() {
    let tool = ScriptedTool::new(Behavior::Produce(vec![("clip.mkv", b"clip".as_slice())]));
    let harness = Harness::new(tool.clone());
    let archive = harness.archive("Movie.Sample.zip");

    let report = harness.walker.walk(&archive, false).await.unwrap();

    assert_eq!(report.skipped_samples, 1);
    assert!(tool.destinations().is_empty());
}
