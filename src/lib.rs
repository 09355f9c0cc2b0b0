//! # media-courier
//!
//! Backend library for interactive media download-and-deliver services.
//!
//! ## Design Philosophy
//!
//! media-courier is designed to be:
//! - **Library-first** - No transport bindings baked in; bring your own
//!   messaging frontend by implementing [`MessageChannel`]
//! - **Collaborator-driven** - Extraction and transcoding run behind trait
//!   seams backed by external tools (`yt-dlp`, `ffmpeg`)
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Polite to upstreams** - Retries back off slowly, collection items
//!   are paced, and enumeration pages are rate-limited
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_courier::{Config, Courier, FfmpegTranscoder, YtDlpExtractor};
//! use std::sync::Arc;
//!
//! # use media_courier::channel::MessageChannel;
//! # fn my_channel() -> Arc<dyn MessageChannel> { unimplemented!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env());
//!     let extractor = Arc::new(YtDlpExtractor::discover()?);
//!     let transcoder = Arc::new(FfmpegTranscoder::discover()?);
//!     let channel = my_channel();
//!
//!     let courier = Courier::new(extractor, transcoder, channel, config);
//!
//!     // Feed inbound updates from your messaging frontend:
//!     courier.handle_text(42, "https://example.com/watch?v=abc").await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Session cache with TTL sweeping
pub mod cache;
/// Message channel trait seam
pub mod channel;
/// Configuration types
pub mod config;
/// Orchestration facade
pub mod courier;
/// Paginated collection enumeration
pub mod enumerate;
/// Error types
pub mod error;
/// Media extractor trait seam and yt-dlp implementation
pub mod extractor;
/// Per-requester single-flight job guard
pub mod guard;
/// Download and collection jobs
pub mod job;
/// Progress bars and edit throttling
pub mod progress;
/// Retry logic with exponential backoff
pub mod retry;
/// Transcoder trait seam and ffmpeg implementation
pub mod transcoder;
/// Core domain types
pub mod types;
/// Filename utilities
pub mod utils;

// Re-export commonly used types
pub use channel::{Button, ChatId, MessageChannel, MessageId, UploadProgressFn};
pub use config::Config;
pub use courier::{CallbackData, Courier, TargetKind};
pub use error::{Error, ExtractorError, ExtractorErrorKind, Result, ToHttpStatus};
pub use extractor::{MediaExtractor, YtDlpExtractor};
pub use job::{BatchSummary, CollectionJob, JobContext, SingleItemJob};
pub use transcoder::{FfmpegTranscoder, NoOpTranscoder, Transcoder};
pub use types::{
    CollectionItem, CollectionSession, MediaMetadata, MediaReference, Quality, ReferenceKind,
    Thumbnail, TransferProgress,
};

/// Helper function to run the courier with graceful signal handling.
///
/// Waits for a termination signal and then calls the courier's `shutdown()`
/// method, which stops background sweeping and purges temp artifacts.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(courier: Courier) -> Result<()> {
    wait_for_signal().await;
    courier.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
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
