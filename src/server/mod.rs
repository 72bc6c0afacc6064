//! HTTP analysis endpoint.
//!
//! Accepts a multipart upload on `POST /analyze-magic-trick`, waits a short
//! "thinking" delay, hands the clip to a [`VisionModel`] and returns the
//! verdict as JSON.  Any origin may call it; the allowed request headers are
//! the ones browser clients of the endpoint send.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::post;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::analysis::VisionModel;
use crate::config::ServerConfig;

pub use handler::{handle_analyze, handle_preflight, ServerState, cors_headers};

/// Route path of the analysis endpoint.
pub const ANALYZE_PATH: &str = "/analyze-magic-trick";

/// Build the router.  `max_body_bytes` bounds the whole multipart request.
///
/// The CORS layer wraps only `POST`: it answers every `OPTIONS` itself with
/// an empty body, so preflights go to [`handle_preflight`] instead.
pub fn router(state: ServerState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(cors_headers());

    Router::new()
        .route(
            ANALYZE_PATH,
            post(handle_analyze).layer(cors).options(handle_preflight),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, model: Arc<dyn VisionModel>) -> Result<()> {
    let state = ServerState {
        model,
        think_delay: Duration::from_millis(config.think_delay_ms),
    };
    let app = router(state, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    log::info!(
        "server: listening on http://{}{ANALYZE_PATH}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("server: shutting down");
        })
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
