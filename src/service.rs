//! Top-level service wiring configuration to the pipeline

use crate::classifier::Classifier;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::extraction::{ArchiveExpander, ArchiveTool, archive_tool_from_config};
use crate::folder_watcher::FolderWatcher;
use crate::launcher::{NoOpLauncher, SystemLauncher, TorrentLauncher};
use crate::notifier::{LibraryNotifier, notifier_from_config};
use crate::publisher::Publisher;
use crate::torrent_drop::TorrentDropHandler;
use crate::types::BatchReport;
use crate::walker::ContentWalker;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// External collaborators the service talks to
///
/// [`TorrentToPlex::new`] builds these from configuration; tests and embedders
/// can supply their own through [`TorrentToPlex::with_parts`].
pub struct Parts {
    /// Unpacks archives
    pub archive_tool: Arc<dyn ArchiveTool>,
    /// Refreshes the media library
    pub notifier: Arc<dyn LibraryNotifier>,
    /// Hands tracked torrents to the client
    pub launcher: Arc<dyn TorrentLauncher>,
}

impl Parts {
    /// Build every collaborator from configuration
    ///
    /// # Errors
    /// Returns `Error::Config` if the CLI backend is selected and no 7-Zip
    /// binary can be found.
    pub fn from_config(config: &Config) -> Result<Self> {
        let launcher: Arc<dyn TorrentLauncher> = if config.tools.launch_torrents {
            Arc::new(SystemLauncher::new())
        } else {
            Arc::new(NoOpLauncher)
        };

        Ok(Self {
            archive_tool: archive_tool_from_config(&config.tools)?,
            notifier: notifier_from_config(&config.notifications),
            launcher,
        })
    }
}

/// The torrent-to-library service
///
/// # Example
///
/// ```no_run
/// use torrent_to_plex::{Config, TorrentToPlex};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = TorrentToPlex::new(Config::default()).await?;
/// service.run(CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct TorrentToPlex {
    config: Arc<Config>,
    dispatcher: Dispatcher,
}

impl TorrentToPlex {
    /// Build the service from configuration.
    ///
    /// Checks the startup preconditions (archive tool resolvable, completed
    /// folder present) and creates the `Shows` and `Movies` folders.
    pub async fn new(config: Config) -> Result<Self> {
        let parts = Parts::from_config(&config)?;
        Self::with_parts(config, parts).await
    }

    /// Build the service with explicit collaborators
    pub async fn with_parts(config: Config, parts: Parts) -> Result<Self> {
        config.validate()?;

        let classifier = Arc::new(Classifier::new(&config.classification)?);
        let publisher = Arc::new(Publisher::from_config(&config).await?);
        publisher.ensure_library().await?;

        let archive_tool = parts.archive_tool.name();
        let expander = ArchiveExpander::new(
            parts.archive_tool,
            config.folders.temp_base(),
            config.extraction.max_recursion_depth,
        );
        let walker = Arc::new(ContentWalker::new(classifier, publisher, expander));

        let drop_handler = config.folders.drop_dir.as_ref().map(|_| {
            TorrentDropHandler::new(config.folders.tracker_dir.clone(), parts.launcher.clone())
        });

        let dispatcher = Dispatcher::new(
            walker,
            drop_handler,
            parts.notifier,
            config.watch.settle_delay(),
        );

        info!(
            completed_dir = ?config.folders.completed_dir,
            media_root = ?config.folders.media_root,
            archive_tool,
            "service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
        })
    }

    /// The configuration the service was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Classify a path without touching the filesystem
    pub fn classifier(&self) -> &Classifier {
        self.dispatcher.walker().classifier()
    }

    /// Process one directory or file as a single batch
    pub async fn scan(&self, path: &Path) -> BatchReport {
        self.dispatcher.process_batch(&[path.to_path_buf()]).await
    }

    /// Watch the configured folders until `cancel` fires.
    ///
    /// Watching starts before the initial scan so nothing arriving during the
    /// scan is missed; entries seen twice are no-ops thanks to the ledger.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = FolderWatcher::from_config(&self.config, tx)?;
        watcher.start()?;
        let watcher_task = tokio::spawn(watcher.run(cancel.clone()));

        if self.config.watch.scan_on_startup
            && let Err(e) = self
                .dispatcher
                .initial_scan(&self.config.folders.completed_dir)
                .await
        {
            warn!(error = %e, "initial scan failed");
        }

        self.dispatcher.run(rx, cancel.clone()).await;

        cancel.cancel();
        if let Err(e) = watcher_task.await {
            warn!(error = %e, "folder watcher task failed");
        }

        Ok(())
    }
}
