//! Paginated collection enumeration
//!
//! Large collections are fetched in fixed-size windows with inter-page
//! pacing, terminating on a short page or a recognized end-of-data error.
//! Also hosts the channel-parameter normalization helpers shared by the
//! enumeration API.

use crate::error::ExtractorError;
use crate::extractor::MediaExtractor;
use crate::types::CollectionItem;
use std::sync::Arc;
use std::time::Duration;

/// Error-text fragments that upstream produces when paging past the end of
/// a collection
const END_OF_DATA_SIGNALS: &[&str] = &["no videos", "playlist does not"];

/// True when an extractor error is really just "no more data"
fn is_end_of_data(error: &ExtractorError) -> bool {
    let lower = error.message.to_lowercase();
    END_OF_DATA_SIGNALS.iter().any(|sig| lower.contains(sig))
}

/// Fetches large collections in fixed-size windows
pub struct PaginatedEnumerator {
    extractor: Arc<dyn MediaExtractor>,
    window_size: u32,
    page_delay: Duration,
}

impl PaginatedEnumerator {
    /// Create an enumerator over the given extractor
    pub fn new(extractor: Arc<dyn MediaExtractor>, window_size: u32, page_delay: Duration) -> Self {
        Self {
            extractor,
            window_size,
            page_delay,
        }
    }

    /// Enumerate every item of a collection, window by window.
    ///
    /// Termination conditions, in order: an empty window stops without
    /// including it; a short window stops after including it. A
    /// mid-enumeration error past the first window, or one matching a
    /// recognized end-of-data signal, ends the run gracefully with whatever
    /// was accumulated; any other first-window error propagates.
    pub async fn enumerate(&self, collection_url: &str) -> Result<Vec<CollectionItem>, ExtractorError> {
        let mut all_items = Vec::new();
        let mut window_index: u32 = 0;

        loop {
            let start = window_index * self.window_size + 1;
            let end = (window_index + 1) * self.window_size;

            tracing::debug!(collection_url, start, end, "Fetching enumeration window");

            let window = match self.extractor.fetch_window(collection_url, start, end).await {
                Ok(window) => window,
                Err(e) if window_index > 0 || is_end_of_data(&e) => {
                    tracing::info!(
                        error = %e,
                        accumulated = all_items.len(),
                        "Treating enumeration error as end of data"
                    );
                    return Ok(all_items);
                }
                Err(e) => return Err(e),
            };

            if window.is_empty() {
                tracing::debug!(total = all_items.len(), "Empty window, enumeration complete");
                return Ok(all_items);
            }

            let short_page = (window.len() as u32) < self.window_size;
            all_items.extend(window);

            if short_page {
                tracing::debug!(total = all_items.len(), "Short window signals last page");
                return Ok(all_items);
            }

            window_index += 1;
            tokio::time::sleep(self.page_delay).await;
        }
    }

    /// Ids-only enumeration: exactly one unbounded fetch.
    ///
    /// Trades the windowed form's completeness guarantees for speed.
    pub async fn enumerate_ids(&self, collection_url: &str) -> Result<Vec<String>, ExtractorError> {
        self.extractor.fetch_ids(collection_url).await
    }
}

/// Normalize a channel parameter (bare handle, `@handle`, or full URL) into
/// the canonical videos-listing URL
pub fn channel_videos_url(param: &str) -> String {
    if param.contains("youtube.com") {
        if param.contains("/videos") {
            return param.to_string();
        }
        if param.ends_with('/') {
            return format!("{param}videos");
        }
        return format!("{param}/videos");
    }

    if let Some(handle) = param.strip_prefix('@') {
        return format!("https://www.youtube.com/@{handle}/videos");
    }

    format!("https://www.youtube.com/@{param}/videos")
}

/// Normalize a channel parameter into the canonical playlists-listing URL
pub fn channel_playlists_url(param: &str) -> String {
    if param.contains("youtube.com") {
        let clean = param
            .trim_end_matches('/')
            .trim_end_matches("/videos")
            .trim_end_matches("/playlists");
        return format!("{clean}/playlists");
    }

    if let Some(handle) = param.strip_prefix('@') {
        return format!("https://www.youtube.com/@{handle}/playlists");
    }

    format!("https://www.youtube.com/@{param}/playlists")
}

/// Normalize a playlist parameter (bare id or full URL) into a playlist URL
pub fn playlist_url(listid: &str) -> String {
    if listid.contains("youtube.com") {
        listid.to_string()
    } else {
        format!("https://www.youtube.com/playlist?list={listid}")
    }
}
