//! Core types: media references, metadata, quality profiles, and sessions

use serde::{Deserialize, Serialize};

/// Marker substring that signals a maximum-resolution thumbnail URL
const MAX_RES_THUMBNAIL_MARKER: &str = "maxresdefault";

/// What an inbound source reference points at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A single media item
    Single,
    /// An ordered collection of items (playlist)
    Collection {
        /// Collection identifier extracted from the URL, if present
        id: Option<String>,
    },
}

/// A parsed media-source reference. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// The source URL as submitted
    pub source_url: String,
    /// Whether this references a single item or a collection
    pub kind: ReferenceKind,
}

impl MediaReference {
    /// Parse a raw URL into a reference, detecting collection URLs by their
    /// `list=` query parameter or `/playlist` path segment.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        let collection_id = url::Url::parse(trimmed).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "list")
                .map(|(_, v)| v.into_owned())
        });

        let is_collection = collection_id.is_some() || trimmed.contains("/playlist");

        Self {
            source_url: trimmed.to_string(),
            kind: if is_collection {
                ReferenceKind::Collection { id: collection_id }
            } else {
                ReferenceKind::Single
            },
        }
    }

    /// True if this reference points at a collection
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ReferenceKind::Collection { .. })
    }
}

/// One thumbnail candidate offered by the extractor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Thumbnail image URL
    pub url: String,
    /// Image width in pixels, if the extractor reported one
    pub width: Option<u32>,
}

/// Metadata for a single media item, as reported by the extractor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Item title
    pub title: String,
    /// Duration in seconds
    pub duration_secs: u64,
    /// Uploader / channel name
    pub uploader: String,
    /// Thumbnail candidates, in the extractor's order
    pub thumbnails: Vec<Thumbnail>,
    /// Canonical source URL
    pub source_url: String,
}

impl MediaMetadata {
    /// Pick the best thumbnail: a URL carrying the max-resolution marker wins
    /// outright; otherwise the largest reported width. Ties resolve to the
    /// earliest candidate so the choice is deterministic.
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        if let Some(max_res) = self
            .thumbnails
            .iter()
            .find(|t| t.url.contains(MAX_RES_THUMBNAIL_MARKER))
        {
            return Some(max_res);
        }

        self.thumbnails.iter().enumerate().fold(
            None,
            |best: Option<(usize, &Thumbnail)>, (idx, t)| match best {
                Some((_, b)) if t.width.unwrap_or(0) <= b.width.unwrap_or(0) => best,
                _ => Some((idx, t)),
            },
        )
        .map(|(_, t)| t)
    }

    /// Duration formatted as `M:SS` for status messages
    pub fn format_duration(&self) -> String {
        let minutes = self.duration_secs / 60;
        let seconds = self.duration_secs % 60;
        format!("{minutes}:{seconds:02}")
    }
}

/// The user's chosen output profile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Audio-only extraction
    AudioOnly,
    /// 360p video
    P360,
    /// 480p video
    P480,
    /// 720p video
    P720,
    /// 1080p video
    P1080,
}

/// Per-quality download parameters: extractor format selector, empirical
/// size-per-minute for progress estimation, and target frame dimensions.
#[derive(Clone, Copy, Debug)]
pub struct QualityProfile {
    /// Format selector passed to the extractor
    pub format_selector: &'static str,
    /// Empirical megabytes per minute of content, used for the download
    /// progress estimate (the true size is unknown until the transfer ends)
    pub mb_per_minute: f64,
    /// Target frame dimensions, None for audio-only
    pub dimensions: Option<(u32, u32)>,
}

impl Quality {
    /// All selectable qualities, in menu order
    pub const ALL: [Quality; 5] = [
        Quality::AudioOnly,
        Quality::P360,
        Quality::P480,
        Quality::P720,
        Quality::P1080,
    ];

    /// Table-driven lookup of the download parameters for this quality
    pub fn profile(&self) -> QualityProfile {
        match self {
            Quality::AudioOnly => QualityProfile {
                format_selector: "bestaudio[ext=m4a]/bestaudio/best",
                mb_per_minute: 1.0,
                dimensions: None,
            },
            Quality::P360 => QualityProfile {
                format_selector: "bestvideo[height<=360]+bestaudio/best[height<=360]",
                mb_per_minute: 3.0,
                dimensions: Some((640, 360)),
            },
            Quality::P480 => QualityProfile {
                format_selector: "bestvideo[height<=480]+bestaudio/best[height<=480]",
                mb_per_minute: 5.0,
                dimensions: Some((854, 480)),
            },
            Quality::P720 => QualityProfile {
                format_selector: "bestvideo[height<=720]+bestaudio/best[height<=720]",
                mb_per_minute: 8.0,
                dimensions: Some((1280, 720)),
            },
            Quality::P1080 => QualityProfile {
                format_selector: "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
                mb_per_minute: 15.0,
                dimensions: Some((1920, 1080)),
            },
        }
    }

    /// True for video qualities (which get the post-processing remux step)
    pub fn is_video(&self) -> bool {
        !matches!(self, Quality::AudioOnly)
    }

    /// Short stable token used in callback payloads
    pub fn as_token(&self) -> &'static str {
        match self {
            Quality::AudioOnly => "audio",
            Quality::P360 => "360",
            Quality::P480 => "480",
            Quality::P720 => "720",
            Quality::P1080 => "1080",
        }
    }

    /// Parse a callback token back into a quality
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "audio" => Some(Quality::AudioOnly),
            "360" => Some(Quality::P360),
            "480" => Some(Quality::P480),
            "720" => Some(Quality::P720),
            "1080" => Some(Quality::P1080),
            _ => None,
        }
    }

    /// Human-readable label for quality menus
    pub fn label(&self) -> &'static str {
        match self {
            Quality::AudioOnly => "Audio only",
            Quality::P360 => "360p",
            Quality::P480 => "480p",
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
        }
    }

    /// Estimated artifact size in bytes for a given duration, from the
    /// per-quality empirical bitrate
    pub fn estimated_bytes(&self, duration_secs: u64) -> u64 {
        let minutes = duration_secs as f64 / 60.0;
        (self.profile().mb_per_minute * minutes * 1024.0 * 1024.0) as u64
    }
}

/// One item inside a collection listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Item source URL
    pub url: String,
    /// Item title
    pub title: String,
    /// Thumbnail URL, if the flat listing carried one
    pub thumbnail: Option<String>,
}

/// Cached session state for a pending collection download
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionSession {
    /// Ordered items to download
    pub items: Vec<CollectionItem>,
    /// The inbound request this session originated from
    pub request_id: String,
}

/// Progress snapshot for an in-flight transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes transferred so far
    pub bytes_so_far: u64,
    /// Estimated (download) or exact (upload) total bytes
    pub estimated_total: u64,
}

impl TransferProgress {
    /// Percentage as `min(floor(current / estimated * 100), cap)`.
    ///
    /// `cap` is 99 for download-in-progress (the total is a heuristic, 100 is
    /// reserved for confirmed completion) and 100 for upload.
    pub fn percentage(&self, cap: u8) -> u8 {
        if self.estimated_total == 0 {
            return 0;
        }
        let pct = (self.bytes_so_far as f64 / self.estimated_total as f64 * 100.0) as u64;
        pct.min(cap as u64) as u8
    }
}

/// Format a byte count as a human-readable size for status messages
pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}
