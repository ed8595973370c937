//! # torrent-to-plex
//!
//! Moves finished torrent downloads into a Plex-style media library.
//!
//! The pipeline watches the folder a torrent client moves completed downloads
//! into, classifies every video it finds as a show, a movie or a sample,
//! unpacks archives (recursively) into temporary folders, and copies new
//! content into `Shows/` or `Movies/` under the library root. Each copy is
//! recorded in a ledger so nothing is published twice. After a batch that
//! published something the media server is asked to refresh once.
//!
//! A second watched folder accepts dropped `.torrent` files, which are moved
//! into a tracker folder and opened with the torrent client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use torrent_to_plex::{Config, TorrentToPlex, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = TorrentToPlex::new(Config::default()).await?;
//!
//!     // Process one folder right away
//!     let report = service.scan("/downloads/MovieX".as_ref()).await;
//!     println!("published {} files", report.published_files);
//!
//!     // Then watch until Ctrl+C
//!     run_with_shutdown(&service).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Filename classification (sample, show, movie)
pub mod classifier;
/// Command line interface
pub mod cli;
/// Configuration types
pub mod config;
/// Sequential processing of watch events
pub mod dispatcher;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Folder watching for completed downloads and dropped torrents
pub mod folder_watcher;
/// Opening tracked torrents with the torrent client
pub mod launcher;
/// Media server library refresh
pub mod notifier;
/// Copying content into the library with an idempotency ledger
pub mod publisher;
/// Top-level service
pub mod service;
/// Dropped `.torrent` file handling
pub mod torrent_drop;
/// Core types
pub mod types;
/// Recursive content walking
pub mod walker;

// Re-export commonly used types
pub use classifier::Classifier;
pub use config::{Config, ExtractorBackend, LedgerKind};
pub use dispatcher::Dispatcher;
pub use error::{Error, ExtractionError, PublishError, Result};
pub use extraction::{ArchiveTool, CliArchiveTool, NativeArchiveTool};
pub use launcher::{NoOpLauncher, SystemLauncher, TorrentLauncher};
pub use notifier::{HttpLibraryNotifier, LibraryNotifier, NoOpNotifier};
pub use publisher::{ManifestLedger, MarkerLedger, PublishLedger, Publisher};
pub use service::{Parts, TorrentToPlex};
pub use types::{BatchReport, Classification, MediaKind, WatchEvent, WatchSource};

use tokio_util::sync::CancellationToken;

/// Run the watch loop until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The event being processed when the signal arrives is finished first.
pub async fn run_with_shutdown(service: &TorrentToPlex) -> Result<()> {
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutting down");
        signal_cancel.cancel();
    });

    let result = service.run(cancel).await;
    signal_task.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
