//! Configuration types for torrent-to-plex
//!
//! The configuration is built once at startup and shared immutably with
//! every component. The binary fills it from command-line flags and
//! environment variables. Applications embedding the library can instead
//! deserialize [`Config`] from their own settings file: every field has a
//! serde default, so a partial document only overrides what it names.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Folder layout consumed and produced by the pipeline
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Directory the torrent client moves finished downloads into
    /// (default: "~/Documents/TorrentsCompleted")
    #[serde(default = "default_completed_dir")]
    pub completed_dir: PathBuf,

    /// Directory watched for dropped `.torrent` files (None = not watched)
    #[serde(default = "default_drop_dir")]
    pub drop_dir: Option<PathBuf>,

    /// Directory dropped `.torrent` files are moved into before launch
    /// (default: "~/Documents/TorrentTracker")
    #[serde(default = "default_tracker_dir")]
    pub tracker_dir: PathBuf,

    /// Root of the media library (default: "~/Videos/PlexMedia")
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Base path for numbered temporary extraction directories
    /// (default: "<media_root>/Temp", producing Temp0, Temp1, ...)
    #[serde(default)]
    pub temp_base: Option<PathBuf>,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            completed_dir: default_completed_dir(),
            drop_dir: default_drop_dir(),
            tracker_dir: default_tracker_dir(),
            media_root: default_media_root(),
            temp_base: None,
        }
    }
}

impl FolderConfig {
    /// Library folder for shows
    pub fn shows_dir(&self) -> PathBuf {
        self.media_root.join("Shows")
    }

    /// Library folder for movies
    pub fn movies_dir(&self) -> PathBuf {
        self.media_root.join("Movies")
    }

    /// Library folder for miscellaneous videos.
    ///
    /// Reserved: nothing is ever published here and it is not created at
    /// startup.
    pub fn other_dir(&self) -> PathBuf {
        self.media_root.join("Other")
    }

    /// Base path for temporary extraction directories
    pub fn temp_base(&self) -> PathBuf {
        self.temp_base
            .clone()
            .unwrap_or_else(|| self.media_root.join("Temp"))
    }
}

/// Which archive extraction backend to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorBackend {
    /// External 7-Zip command line tool (default)
    #[default]
    Cli,
    /// In-process extraction for zip, 7z, rar and tar.gz
    Native,
}

/// External tool paths and extraction backend selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Extraction backend (default: cli)
    #[serde(default)]
    pub extractor: ExtractorBackend,

    /// Path to 7z executable (auto-detected if None)
    #[serde(default)]
    pub sevenzip_path: Option<PathBuf>,

    /// Whether to search PATH for the 7z executable if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Kill the external archive tool after this long (None = wait forever)
    #[serde(default, with = "optional_duration_serde")]
    pub extract_timeout: Option<Duration>,

    /// Open tracked `.torrent` files with the OS default application (default: true)
    #[serde(default = "default_true")]
    pub launch_torrents: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorBackend::default(),
            sevenzip_path: None,
            search_path: true,
            extract_timeout: None,
            launch_torrents: true,
        }
    }
}

/// Filename heuristics used by the classifier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Extensions (without the leading dot) treated as publishable video
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Extensions (without the leading dot) treated as archives; compound
    /// suffixes such as "tar.gz" are matched against the end of the filename
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Regex alternatives marking sample content (letter-bounded, case-insensitive)
    #[serde(default = "default_sample_tokens")]
    pub sample_tokens: Vec<String>,

    /// Regex alternatives marking show content (letter/digit-bounded, case-insensitive)
    #[serde(default = "default_show_patterns")]
    pub show_patterns: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            video_extensions: default_video_extensions(),
            archive_extensions: default_archive_extensions(),
            sample_tokens: default_sample_tokens(),
            show_patterns: default_show_patterns(),
        }
    }
}

/// Archive extraction configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum depth for nested archive extraction (default: 8)
    #[serde(default = "default_max_recursion")]
    pub max_recursion_depth: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_recursion(),
        }
    }
}

/// How already-published content is remembered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// One marker file next to each published destination (default)
    #[default]
    Marker,
    /// A single JSON manifest of destination paths and publish times
    Manifest,
}

/// Publishing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Ledger implementation (default: marker)
    #[serde(default)]
    pub ledger: LedgerKind,

    /// Suffix appended to the destination path to form the marker path (default: ".meta")
    #[serde(default = "default_marker_suffix")]
    pub marker_suffix: String,

    /// Manifest location (default: "<media_root>/.published.json")
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerKind::default(),
            marker_suffix: default_marker_suffix(),
            manifest_path: None,
        }
    }
}

/// Library refresh notification configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// URL requested (GET) after a batch publishes something (None = log only)
    #[serde(default)]
    pub library_refresh_url: Option<String>,

    /// Token sent as the `X-Plex-Token` header
    #[serde(default, skip_serializing)]
    pub plex_token: Option<String>,

    /// Timeout for the refresh request (default: 30 seconds)
    #[serde(default = "default_refresh_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            library_refresh_url: None,
            plex_token: None,
            timeout: default_refresh_timeout(),
        }
    }
}

/// Watch loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between a watch event and processing it, so the torrent client
    /// can finish moving files or writing a dropped torrent (default: 1000 ms)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Process everything already in the completed directory at startup (default: true)
    #[serde(default = "default_true")]
    pub scan_on_startup: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            scan_on_startup: true,
        }
    }
}

impl WatchConfig {
    /// Settle delay as a [`Duration`]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Main configuration
///
/// Fields are organized into logical sub-configs:
/// - [`folders`](FolderConfig): watched folders and the library tree
/// - [`tools`](ToolsConfig): archive tool and torrent client launch
/// - [`classification`](ClassificationConfig): sample/show patterns, extensions
/// - [`extraction`](ExtractionConfig): nested archive limits
/// - [`publish`](PublishConfig): idempotency ledger
/// - [`notifications`](NotificationConfig): library refresh hook
/// - [`watch`](WatchConfig): watch loop timing
///
/// `Serialize` backs the `config` command. `Deserialize` is for embedders
/// loading their own settings file; missing sections and fields fall back
/// to the defaults.
///
/// # Examples
///
/// ```
/// use torrent_to_plex::Config;
///
/// let config: Config = serde_json::from_str(
///     r#"{ "folders": { "media_root": "/srv/plex" }, "tools": { "extract_timeout": 600 } }"#,
/// )
/// .unwrap();
/// assert_eq!(config.folders.shows_dir(), std::path::Path::new("/srv/plex/Shows"));
/// assert_eq!(config.watch.settle_delay_ms, 1000);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watched folders and the library tree
    #[serde(default)]
    pub folders: FolderConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Classification heuristics
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Archive extraction limits
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Publish ledger settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Library refresh notification
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Watch loop timing
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Check the startup preconditions that do not depend on external tools.
    ///
    /// The completed-downloads folder must already exist; the archive tool is
    /// checked when the extraction backend is built.
    pub fn validate(&self) -> Result<()> {
        if !self.folders.completed_dir.is_dir() {
            return Err(Error::Config {
                message: format!(
                    "can't find completed torrents folder: {}",
                    self.folders.completed_dir.display()
                ),
                key: Some("completed_dir".to_string()),
            });
        }

        if self.publish.marker_suffix.is_empty() {
            return Err(Error::Config {
                message: "marker suffix must not be empty".to_string(),
                key: Some("marker_suffix".to_string()),
            });
        }

        if let Some(url) = &self.notifications.library_refresh_url
            && reqwest::Url::parse(url).is_err()
        {
            return Err(Error::Config {
                message: format!("invalid library refresh URL: {}", url),
                key: Some("library_refresh_url".to_string()),
            });
        }

        Ok(())
    }

    /// Manifest path, falling back to a hidden file under the media root
    pub fn manifest_path(&self) -> PathBuf {
        self.publish
            .manifest_path
            .clone()
            .unwrap_or_else(|| self.folders.media_root.join(".published.json"))
    }
}

// Default value functions
fn documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("Documents"))
}

fn videos_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
        .unwrap_or_else(|| PathBuf::from("Videos"))
}

fn default_completed_dir() -> PathBuf {
    documents_dir().join("TorrentsCompleted")
}

fn default_drop_dir() -> Option<PathBuf> {
    Some(documents_dir().join("TorrentDrop"))
}

fn default_tracker_dir() -> PathBuf {
    documents_dir().join("TorrentTracker")
}

fn default_media_root() -> PathBuf {
    videos_dir().join("PlexMedia")
}

fn default_true() -> bool {
    true
}

fn default_video_extensions() -> Vec<String> {
    vec![
        "mp4".into(),
        "mpg".into(),
        "mpeg".into(),
        "mov".into(),
        "mkv".into(),
        "avi".into(),
        "webm".into(),
    ]
}

fn default_archive_extensions() -> Vec<String> {
    vec!["zip".into(), "7z".into(), "rar".into(), "tar.gz".into()]
}

fn default_sample_tokens() -> Vec<String> {
    vec!["sample".into(), "ref".into()]
}

fn default_show_patterns() -> Vec<String> {
    vec!["season".into(), "s[0-9]+e[0-9]+".into()]
}

fn default_max_recursion() -> u32 {
    8
}

fn default_marker_suffix() -> String {
    ".meta".to_string()
}

fn default_refresh_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_settle_delay_ms() -> u64 {
    1000
}

// Whole seconds on the wire, for embedder settings files and the `config` command
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Like `duration_serde`, with null meaning no limit
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
