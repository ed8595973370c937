//! Command-line interface for torrent-to-plex.
//!
//! Every configuration field that matters in practice is exposed as a global
//! flag with a matching `TTP_*` environment variable. Unset flags keep the
//! [`Config`] defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::classifier::Classifier;
use crate::config::{Config, ExtractorBackend, LedgerKind};
use crate::service::TorrentToPlex;

/// torrent-to-plex - publish finished torrents into a Plex media library
#[derive(Parser, Debug)]
#[command(name = "torrent-to-plex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder the torrent client moves finished downloads into
    #[arg(long, global = true, env = "TTP_COMPLETED_DIR")]
    pub completed_dir: Option<PathBuf>,

    /// Folder watched for dropped .torrent files
    #[arg(long, global = true, env = "TTP_DROP_DIR")]
    pub drop_dir: Option<PathBuf>,

    /// Do not watch a torrent drop folder
    #[arg(long, global = true, conflicts_with = "drop_dir")]
    pub no_drop: bool,

    /// Folder dropped torrents are moved into before launch
    #[arg(long, global = true, env = "TTP_TRACKER_DIR")]
    pub tracker_dir: Option<PathBuf>,

    /// Root of the media library (Shows/ and Movies/ live here)
    #[arg(long, global = true, env = "TTP_MEDIA_ROOT")]
    pub media_root: Option<PathBuf>,

    /// Base path for temporary extraction folders
    #[arg(long, global = true, env = "TTP_TEMP_BASE")]
    pub temp_base: Option<PathBuf>,

    /// Archive extraction backend
    #[arg(long, global = true, value_enum, env = "TTP_EXTRACTOR")]
    pub extractor: Option<ExtractorArg>,

    /// Path to the 7z executable
    #[arg(long, global = true, env = "TTP_SEVENZIP")]
    pub sevenzip_path: Option<PathBuf>,

    /// Kill the archive tool after this many seconds
    #[arg(long, global = true, env = "TTP_EXTRACT_TIMEOUT")]
    pub extract_timeout: Option<u64>,

    /// URL requested after new content is published
    #[arg(long, global = true, env = "TTP_LIBRARY_REFRESH_URL")]
    pub library_refresh_url: Option<String>,

    /// Plex token sent with the library refresh request
    #[arg(long, global = true, env = "PLEX_TOKEN", hide_env_values = true)]
    pub plex_token: Option<String>,

    /// How published content is remembered
    #[arg(long, global = true, value_enum, env = "TTP_LEDGER")]
    pub ledger: Option<LedgerArg>,

    /// Milliseconds to wait before processing a new completed entry
    #[arg(long, global = true, env = "TTP_SETTLE_DELAY_MS")]
    pub settle_delay_ms: Option<u64>,

    /// Skip processing existing content at startup
    #[arg(long, global = true)]
    pub no_initial_scan: bool,

    /// Track dropped torrents without opening them
    #[arg(long, global = true)]
    pub no_launch: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run (default: watch)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Watch the completed and drop folders until interrupted (default)
    Watch,

    /// Process one folder or file once
    Scan {
        /// Folder or file to process
        path: PathBuf,
    },

    /// Print how paths would be classified
    Classify {
        /// Paths to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show resolved configuration
    Config,
}

/// `--extractor` values
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExtractorArg {
    /// External 7-Zip tool
    Cli,
    /// Built-in zip, 7z, rar and tar.gz support
    Native,
}

/// `--ledger` values
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LedgerArg {
    /// Marker file next to each published file
    Marker,
    /// One JSON manifest under the media root
    Manifest,
}

impl From<ExtractorArg> for ExtractorBackend {
    fn from(arg: ExtractorArg) -> Self {
        match arg {
            ExtractorArg::Cli => ExtractorBackend::Cli,
            ExtractorArg::Native => ExtractorBackend::Native,
        }
    }
}

impl From<LedgerArg> for LedgerKind {
    fn from(arg: LedgerArg) -> Self {
        match arg {
            LedgerArg::Marker => LedgerKind::Marker,
            LedgerArg::Manifest => LedgerKind::Manifest,
        }
    }
}

impl Cli {
    /// Resolve the configuration from flags, environment and defaults
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();

        if let Some(dir) = &self.completed_dir {
            config.folders.completed_dir = dir.clone();
        }
        if self.no_drop {
            config.folders.drop_dir = None;
        } else if let Some(dir) = &self.drop_dir {
            config.folders.drop_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.tracker_dir {
            config.folders.tracker_dir = dir.clone();
        }
        if let Some(dir) = &self.media_root {
            config.folders.media_root = dir.clone();
        }
        if let Some(dir) = &self.temp_base {
            config.folders.temp_base = Some(dir.clone());
        }

        if let Some(extractor) = self.extractor {
            config.tools.extractor = extractor.into();
        }
        if let Some(path) = &self.sevenzip_path {
            config.tools.sevenzip_path = Some(path.clone());
        }
        if let Some(seconds) = self.extract_timeout {
            config.tools.extract_timeout = Some(std::time::Duration::from_secs(seconds));
        }
        config.tools.launch_torrents = !self.no_launch;

        if let Some(url) = &self.library_refresh_url {
            config.notifications.library_refresh_url = Some(url.clone());
        }
        if let Some(token) = &self.plex_token {
            config.notifications.plex_token = Some(token.clone());
        }

        if let Some(ledger) = self.ledger {
            config.publish.ledger = ledger.into();
        }

        if let Some(ms) = self.settle_delay_ms {
            config.watch.settle_delay_ms = ms;
        }
        config.watch.scan_on_startup = !self.no_initial_scan;

        config
    }

    /// Execute the selected command
    pub async fn execute(self) -> Result<()> {
        let config = self.to_config();

        match self.command.unwrap_or(Commands::Watch) {
            Commands::Watch => {
                let service = TorrentToPlex::new(config)
                    .await
                    .context("Failed to start")?;
                crate::run_with_shutdown(&service).await?;
            }

            Commands::Scan { path } => {
                let service = TorrentToPlex::new(config)
                    .await
                    .context("Failed to start")?;
                let report = service.scan(&path).await;

                println!("Published:         {}", report.published_files);
                println!("Already published: {}", report.already_published);
                println!("Samples skipped:   {}", report.skipped_samples);
                println!("Archives expanded: {}", report.archives_expanded);
                println!("Failures:          {}", report.failures);

                if report.failures > 0 {
                    anyhow::bail!("{} item(s) failed, see log for details", report.failures);
                }
            }

            Commands::Classify { paths } => {
                let classifier = Classifier::new(&config.classification)
                    .context("Invalid classification patterns")?;

                for path in paths {
                    let kind = if classifier.is_video(&path) {
                        "video"
                    } else if classifier.is_archive(&path) {
                        "archive"
                    } else {
                        "other"
                    };
                    println!(
                        "{:<8} {:<8} {}",
                        classifier.classify(&path, false).to_string(),
                        kind,
                        path.display()
                    );
                }
            }

            Commands::Config => {
                let json = serde_json::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{json}");
            }
        }

        Ok(())
    }
}
