//! yt-dlp backed media extractor
//!
//! Shells out to the yt-dlp binary for metadata, downloads, and flat
//! playlist listings. Upstream failures arrive as stderr text; this module
//! classifies the known signal substrings into [`ExtractorErrorKind`] once,
//! at the collaborator boundary, so the orchestrator never string-matches.

use crate::error::{ExtractorError, ExtractorErrorKind};
use crate::extractor::MediaExtractor;
use crate::types::{CollectionItem, MediaMetadata, Thumbnail};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Media extractor shelling out to yt-dlp
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    /// Locate yt-dlp on PATH
    pub fn discover() -> Result<Self, ExtractorError> {
        let binary = which::which("yt-dlp")
            .map_err(|e| ExtractorError::other(format!("yt-dlp not found: {e}")))?;
        Ok(Self { binary })
    }

    /// Use an explicit yt-dlp binary path
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, ExtractorError> {
        tracing::debug!(binary = %self.binary.display(), ?args, "Running yt-dlp");

        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractorError::other(format!("failed to spawn yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractorError::new(
                classify_extractor_output(&stderr),
                stderr,
            ));
        }

        Ok(output.stdout)
    }
}

/// Classify a raw yt-dlp error message into a structured kind.
///
/// The signal substrings are not a stable upstream contract; anything
/// unrecognized falls through to `Other` and is surfaced verbatim.
pub fn classify_extractor_output(message: &str) -> ExtractorErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("sign in") || lower.contains("bot") || lower.contains("429") {
        ExtractorErrorKind::RateLimited
    } else if lower.contains("private") {
        ExtractorErrorKind::PrivateContent
    } else if lower.contains("copyright") {
        ExtractorErrorKind::CopyrightBlocked
    } else if lower.contains("not found")
        || lower.contains("404")
        || lower.contains("does not exist")
        || lower.contains("unavailable")
        || lower.contains("removed")
    {
        ExtractorErrorKind::Unavailable
    } else {
        ExtractorErrorKind::Other
    }
}

fn base_args() -> Vec<String> {
    vec![
        "--no-check-certificates".into(),
        "--no-warnings".into(),
    ]
}

/// Arguments for a single-item metadata fetch
fn metadata_args(url: &str) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "--dump-single-json".into(),
        "--skip-download".into(),
        "--no-playlist".into(),
        url.into(),
    ]);
    args
}

/// Arguments for downloading one item at a format selection
fn download_args(url: &str, format_selector: &str, dest: &Path) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-f".into(),
        format_selector.into(),
        "--no-playlist".into(),
        "-o".into(),
        dest.to_string_lossy().into_owned(),
        url.into(),
    ]);
    args
}

/// Arguments for one flat-playlist window
fn window_args(url: &str, start: u32, end: u32) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "--flat-playlist".into(),
        "--dump-single-json".into(),
        "--ignore-errors".into(),
        "--playlist-start".into(),
        start.to_string(),
        "--playlist-end".into(),
        end.to_string(),
        url.into(),
    ]);
    args
}

/// Arguments for the unbounded ids-only listing
fn flat_args(url: &str) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "--flat-playlist".into(),
        "--dump-single-json".into(),
        "--ignore-errors".into(),
        url.into(),
    ]);
    args
}

#[derive(Deserialize)]
struct RawThumbnail {
    url: String,
    width: Option<u32>,
}

#[derive(Deserialize)]
struct RawMetadata {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
    webpage_url: Option<String>,
}

#[derive(Deserialize)]
struct RawFlatEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
}

#[derive(Deserialize)]
struct RawListing {
    #[serde(default)]
    entries: Vec<RawFlatEntry>,
}

fn parse_metadata(stdout: &[u8], fallback_url: &str) -> Result<MediaMetadata, ExtractorError> {
    let raw: RawMetadata = serde_json::from_slice(stdout)
        .map_err(|e| ExtractorError::other(format!("unparseable yt-dlp metadata: {e}")))?;

    Ok(MediaMetadata {
        title: raw.title.unwrap_or_else(|| "Unknown".to_string()),
        duration_secs: raw.duration.unwrap_or(0.0).max(0.0) as u64,
        uploader: raw
            .channel
            .or(raw.uploader)
            .unwrap_or_else(|| "Unknown".to_string()),
        thumbnails: raw
            .thumbnails
            .into_iter()
            .map(|t| Thumbnail {
                url: t.url,
                width: t.width,
            })
            .collect(),
        source_url: raw.webpage_url.unwrap_or_else(|| fallback_url.to_string()),
    })
}

fn entry_to_item(entry: RawFlatEntry) -> Option<CollectionItem> {
    let id = entry.id?;
    let url = entry
        .url
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}"));
    Some(CollectionItem {
        url,
        title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
        thumbnail: entry.thumbnails.into_iter().next().map(|t| t.url),
    })
}

fn parse_listing(stdout: &[u8]) -> Result<Vec<RawFlatEntry>, ExtractorError> {
    let raw: RawListing = serde_json::from_slice(stdout)
        .map_err(|e| ExtractorError::other(format!("unparseable yt-dlp listing: {e}")))?;
    Ok(raw.entries)
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, ExtractorError> {
        let stdout = self.run(&metadata_args(url)).await?;
        parse_metadata(&stdout, url)
    }

    async fn download(
        &self,
        url: &str,
        format_selector: &str,
        dest: &Path,
    ) -> Result<(), ExtractorError> {
        self.run(&download_args(url, format_selector, dest)).await?;
        Ok(())
    }

    async fn fetch_window(
        &self,
        collection_url: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<CollectionItem>, ExtractorError> {
        let stdout = self.run(&window_args(collection_url, start, end)).await?;
        let entries = parse_listing(&stdout)?;
        Ok(entries.into_iter().filter_map(entry_to_item).collect())
    }

    async fn fetch_ids(&self, collection_url: &str) -> Result<Vec<String>, ExtractorError> {
        let stdout = self.run(&flat_args(collection_url)).await?;
        let entries = parse_listing(&stdout)?;
        Ok(entries.into_iter().filter_map(|e| e.id).collect())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_challenge_classifies_as_rate_limited() {
        assert_eq!(
            classify_extractor_output("ERROR: Sign in to confirm you're not a bot"),
            ExtractorErrorKind::RateLimited
        );
        assert_eq!(
            classify_extractor_output("HTTP Error 429: Too Many Requests"),
            ExtractorErrorKind::RateLimited
        );
    }

    #[test]
    fn private_and_copyright_classify_distinctly() {
        assert_eq!(
            classify_extractor_output("ERROR: Private video"),
            ExtractorErrorKind::PrivateContent
        );
        assert_eq!(
            classify_extractor_output("blocked due to a copyright claim"),
            ExtractorErrorKind::CopyrightBlocked
        );
    }

    #[test]
    fn missing_content_classifies_as_unavailable() {
        assert_eq!(
            classify_extractor_output("ERROR: Video unavailable"),
            ExtractorErrorKind::Unavailable
        );
        assert_eq!(
            classify_extractor_output("This channel does not exist"),
            ExtractorErrorKind::Unavailable
        );
        assert_eq!(
            classify_extractor_output("HTTP Error 404"),
            ExtractorErrorKind::Unavailable
        );
    }

    #[test]
    fn unknown_message_classifies_as_other() {
        assert_eq!(
            classify_extractor_output("ffmpeg exited with code 1"),
            ExtractorErrorKind::Other
        );
    }

    #[test]
    fn window_args_carry_one_based_bounds() {
        let args = window_args("https://example.com/c", 101, 200);
        let joined = args.join(" ");
        assert!(joined.contains("--playlist-start 101"));
        assert!(joined.contains("--playlist-end 200"));
        assert!(joined.contains("--flat-playlist"));
    }

    #[test]
    fn flat_args_have_no_window_bounds() {
        let args = flat_args("https://example.com/c");
        assert!(!args.iter().any(|a| a == "--playlist-start"));
    }

    #[test]
    fn download_args_use_selector_and_dest() {
        let args = download_args("https://x/watch?v=1", "bestaudio", Path::new("/tmp/a.m4a"));
        let joined = args.join(" ");
        assert!(joined.contains("-f bestaudio"));
        assert!(joined.contains("-o /tmp/a.m4a"));
        assert!(joined.contains("--no-playlist"));
    }

    #[test]
    fn parse_metadata_maps_fields_and_falls_back() {
        let json = br#"{
            "title": "A Video",
            "duration": 612.4,
            "channel": "Chan",
            "thumbnails": [{"url": "t.jpg", "width": 640}]
        }"#;
        let meta = parse_metadata(json, "https://fallback").unwrap();
        assert_eq!(meta.title, "A Video");
        assert_eq!(meta.duration_secs, 612);
        assert_eq!(meta.uploader, "Chan");
        assert_eq!(meta.source_url, "https://fallback");
        assert_eq!(meta.thumbnails.len(), 1);
    }

    #[test]
    fn parse_listing_skips_entries_without_ids() {
        let json = br#"{"entries": [
            {"id": "abc", "title": "One"},
            {"title": "No id"},
            {"id": "def"}
        ]}"#;
        let items: Vec<CollectionItem> = parse_listing(json)
            .unwrap()
            .into_iter()
            .filter_map(entry_to_item)
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "One");
        assert!(items[0].url.contains("abc"));
        assert_eq!(items[1].title, "Unknown");
    }
}
