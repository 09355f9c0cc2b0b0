//! Enumeration route handlers.

use crate::config::Config;
use crate::enumerate::{
    PaginatedEnumerator, channel_playlists_url, channel_videos_url, playlist_url,
};
use crate::error::{Error, ToHttpStatus};
use crate::extractor::MediaExtractor;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request; every field is a cheap Arc clone.
#[derive(Clone)]
pub struct AppState {
    /// Extractor for direct window and metadata fetches
    pub extractor: Arc<dyn MediaExtractor>,
    /// Windowed enumerator built over the same extractor
    pub enumerator: Arc<PaginatedEnumerator>,
    /// Configuration (window size, port)
    pub config: Arc<Config>,
}

/// Query parameters accepting a channel handle or URL
#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    channel: Option<String>,
}

/// Query parameters for a bounded channel window
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    channel: Option<String>,
    start: Option<u32>,
    end: Option<u32>,
}

/// Query parameters accepting a playlist id or URL
#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    listid: Option<String>,
}

/// Success envelope: merges `success: true` into the payload object
fn success(mut payload: serde_json::Value) -> Response {
    if let Some(object) = payload.as_object_mut() {
        object.insert("success".into(), json!(true));
    }
    (StatusCode::OK, Json(payload)).into_response()
}

/// Failure envelope with the status code mapped from the error taxonomy
fn failure(error: &Error) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "success": false,
            "error": error.user_message(),
            "details": error.to_string(),
        })),
    )
        .into_response()
}

/// 400 for a missing required parameter, with a worked usage example
fn missing_param(name: &str, usage: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": format!("Missing required parameter: {name}"),
            "usage": usage,
        })),
    )
        .into_response()
}

/// GET / - Usage index
pub async fn usage_index() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/channel": "?channel=@handle — every video of a channel",
            "GET /api/channel/range": "?channel=@handle&start=1&end=100 — one bounded window",
            "GET /api/channel/info": "?channel=@handle — summary with video count",
            "GET /api/channel/playlists": "?channel=@handle — playlist ids of a channel",
            "GET /api/playlist/info": "?listid=PL... — playlist summary with item count",
        },
    }))
}

/// GET /api/channel - Enumerate every video of a channel
pub async fn channel_videos(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Response {
    let Some(channel) = query.channel else {
        return missing_param("channel", "/api/channel?channel=@handle");
    };
    let url = channel_videos_url(&channel);

    match state.enumerator.enumerate(&url).await {
        Ok(videos) => success(json!({
            "channel": url,
            "count": videos.len(),
            "videos": videos,
        })),
        Err(e) => {
            let e = Error::Extractor(e);
            tracing::warn!(channel = %url, error = %e, "Channel enumeration failed");
            failure(&e)
        }
    }
}

/// GET /api/channel/range - Fetch one bounded window of a channel
pub async fn channel_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Response {
    let usage = "/api/channel/range?channel=@handle&start=1&end=100";
    let Some(channel) = query.channel else {
        return missing_param("channel", usage);
    };
    let (Some(start), Some(end)) = (query.start, query.end) else {
        return missing_param("start/end", usage);
    };
    if start < 1 || end < start {
        return failure(&Error::InvalidRequest(format!(
            "range bounds must satisfy 1 <= start <= end, got start={start} end={end}"
        )));
    }

    let url = channel_videos_url(&channel);
    match state.extractor.fetch_window(&url, start, end).await {
        Ok(videos) => success(json!({
            "channel": url,
            "start": start,
            "end": end,
            "count": videos.len(),
            "videos": videos,
        })),
        Err(e) => {
            let e = Error::Extractor(e);
            tracing::warn!(channel = %url, start, end, error = %e, "Window fetch failed");
            failure(&e)
        }
    }
}

/// GET /api/channel/info - Channel summary: id listing plus best-effort
/// metadata enrichment
pub async fn channel_info(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Response {
    let Some(channel) = query.channel else {
        return missing_param("channel", "/api/channel/info?channel=@handle");
    };
    let url = channel_videos_url(&channel);

    let ids = match state.enumerator.enumerate_ids(&url).await {
        Ok(ids) => ids,
        Err(e) => {
            let e = Error::Extractor(e);
            tracing::warn!(channel = %url, error = %e, "Channel info listing failed");
            return failure(&e);
        }
    };

    // Enrichment only; a metadata failure still returns the listing
    let uploader = match state.extractor.fetch_metadata(&url).await {
        Ok(metadata) => Some(metadata.uploader),
        Err(e) => {
            tracing::debug!(channel = %url, error = %e, "Channel metadata enrichment skipped");
            None
        }
    };

    success(json!({
        "channel": url,
        "video_count": ids.len(),
        "video_ids": ids,
        "uploader": uploader,
    }))
}

/// GET /api/channel/playlists - List a channel's playlist ids
///
/// One flat id fetch; playlists are shallow so a windowed walk would only
/// add round trips.
pub async fn channel_playlists(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Response {
    let Some(channel) = query.channel else {
        return missing_param("channel", "/api/channel/playlists?channel=@handle");
    };
    let url = channel_playlists_url(&channel);

    match state.enumerator.enumerate_ids(&url).await {
        Ok(ids) => success(json!({
            "channel": url,
            "count": ids.len(),
            "playlist_ids": ids,
        })),
        Err(e) => {
            let e = Error::Extractor(e);
            tracing::warn!(channel = %url, error = %e, "Playlist id listing failed");
            failure(&e)
        }
    }
}

/// GET /api/playlist/info - Playlist summary: item count plus a first-item
/// preview, without walking the whole playlist
pub async fn playlist_info(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> Response {
    let Some(listid) = query.listid else {
        return missing_param("listid", "/api/playlist/info?listid=PLxxxxxxxx");
    };
    let url = playlist_url(&listid);

    let ids = match state.enumerator.enumerate_ids(&url).await {
        Ok(ids) => ids,
        Err(e) => {
            let e = Error::Extractor(e);
            tracing::warn!(playlist = %url, error = %e, "Playlist id listing failed");
            return failure(&e);
        }
    };

    // Preview only; a fetch failure still returns the count
    let first = match state.extractor.fetch_window(&url, 1, 1).await {
        Ok(items) => items.into_iter().next(),
        Err(e) => {
            tracing::debug!(playlist = %url, error = %e, "Playlist preview skipped");
            None
        }
    };

    success(json!({
        "playlist": url,
        "count": ids.len(),
        "title": first.as_ref().map(|i| i.title.clone()),
        "thumbnail": first.as_ref().and_then(|i| i.thumbnail.clone()),
    }))
}
