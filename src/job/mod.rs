//! Download/upload job orchestration
//!
//! A job owns the full lifecycle of one delivery: metadata fetch, download,
//! optional remux, size check, thumbnail fetch, upload, and guaranteed
//! cleanup. Collection jobs drive single-item jobs sequentially.

use crate::channel::MessageChannel;
use crate::config::Config;
use crate::extractor::MediaExtractor;
use crate::transcoder::Transcoder;
use std::path::PathBuf;
use std::sync::Arc;

pub mod collection;
pub mod single;

pub use collection::{BatchSummary, CollectionJob};
pub use single::SingleItemJob;

/// Shared collaborators and configuration injected into every job
#[derive(Clone)]
pub struct JobContext {
    /// Media extractor collaborator
    pub extractor: Arc<dyn MediaExtractor>,
    /// Transcoder collaborator
    pub transcoder: Arc<dyn Transcoder>,
    /// Message channel collaborator
    pub channel: Arc<dyn MessageChannel>,
    /// Process-wide configuration
    pub config: Arc<Config>,
}

/// Tracks temp artifacts created by a job so cleanup can remove them all,
/// whichever step failed
pub(crate) struct Workspace {
    files: Vec<PathBuf>,
}

impl Workspace {
    pub(crate) fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a temp file for cleanup
    pub(crate) fn track(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    /// Best-effort removal of every tracked file
    pub(crate) async fn cleanup(&self) {
        for path in &self.files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed temp artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Temp cleanup failed")
                }
            }
        }
    }
}

/// Normalize an upload-progress value into absolute bytes.
///
/// Transports report either a fraction or a byte count; a value strictly
/// inside (0, 1) is treated as a ratio of `total`. Known edge case: a
/// transfer that is itself smaller than one byte cannot be disambiguated,
/// which is accepted.
pub(crate) fn normalize_uploaded(raw: f64, total: u64) -> u64 {
    if raw > 0.0 && raw < 1.0 {
        (raw * total as f64) as u64
    } else {
        raw.max(0.0) as u64
    }
}
