//! REST API server module
//!
//! Exposes collection-enumeration endpoints over HTTP with a uniform JSON
//! envelope: `{"success": true, ...}` on success, `{"success": false,
//! "error", "details"}` on failure, with status codes mapped from the
//! domain error taxonomy.

use crate::config::Config;
use crate::enumerate::PaginatedEnumerator;
use crate::error::{Error, Result};
use crate::extractor::MediaExtractor;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod routes;

pub use routes::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// - `GET /` - Usage index
/// - `GET /api/channel` - Enumerate every video of a channel
/// - `GET /api/channel/range` - Fetch one bounded window of a channel
/// - `GET /api/channel/info` - Channel summary (id listing plus metadata)
/// - `GET /api/channel/playlists` - List a channel's playlist ids
/// - `GET /api/playlist/info` - Playlist summary (count plus preview)
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::usage_index))
        .route("/api/channel", get(routes::channel_videos))
        .route("/api/channel/range", get(routes::channel_range))
        .route("/api/channel/info", get(routes::channel_info))
        .route("/api/channel/playlists", get(routes::channel_playlists))
        .route("/api/playlist/info", get(routes::playlist_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the API server on the configured port.
///
/// Binds a TCP listener on all interfaces and serves the enumeration
/// routes until the server stops.
pub async fn start_api_server(
    extractor: Arc<dyn MediaExtractor>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = SocketAddr::from(([0, 0, 0, 0], config.api.port));

    let enumerator = Arc::new(PaginatedEnumerator::new(
        Arc::clone(&extractor),
        config.api.window_size,
        config.pacing.enumeration_page_delay,
    ));
    let app = create_router(AppState {
        extractor,
        enumerator,
        config,
    });

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
