//! Media extractor collaborator contract
//!
//! Extracting raw media bytes is delegated to an external tool; the
//! orchestrator only sees this trait. Errors come back pre-classified as
//! [`ExtractorError`] kinds, so no upstream message ever needs to be
//! pattern-matched above this seam.

use crate::error::ExtractorError;
use crate::types::{CollectionItem, MediaMetadata};
use async_trait::async_trait;
use std::path::Path;

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

/// Abstract media extractor used for metadata, downloads, and collection listings
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch metadata for a single item without downloading it
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, ExtractorError>;

    /// Download an item at the given format selection, writing media bytes
    /// to `dest`. The partial file grows at `dest` while the transfer runs,
    /// which is what the download poller samples.
    async fn download(
        &self,
        url: &str,
        format_selector: &str,
        dest: &Path,
    ) -> Result<(), ExtractorError>;

    /// Fetch one window of a collection listing using 1-based inclusive
    /// [start, end] indices
    async fn fetch_window(
        &self,
        collection_url: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<CollectionItem>, ExtractorError>;

    /// Fetch only item identifiers with a single unbounded call.
    ///
    /// Faster than windowing but without its completeness guarantees;
    /// callers that need every item must use [`fetch_window`](Self::fetch_window).
    async fn fetch_ids(&self, collection_url: &str) -> Result<Vec<String>, ExtractorError>;
}
