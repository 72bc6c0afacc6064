//! `/analyze-magic-trick` request handling.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::analysis::VisionModel;
use crate::i18n::Language;
use crate::media::CapturedMedia;

/// MIME assumed when the `video` part carries no content type.
const DEFAULT_VIDEO_MIME: &str = "video/webm";

/// Request headers browser clients may send.
pub fn cors_headers() -> [HeaderName; 4] {
    [
        header::AUTHORIZATION,
        HeaderName::from_static("x-client-info"),
        HeaderName::from_static("apikey"),
        header::CONTENT_TYPE,
    ]
}

/// Shared state for the analysis routes.
#[derive(Clone)]
pub struct ServerState {
    pub model: Arc<dyn VisionModel>,
    /// Pause before calling the model.
    pub think_delay: Duration,
}

fn error_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

/// CORS preflight: 200 with the allow headers and an `ok` body.
pub async fn handle_preflight() -> impl IntoResponse {
    let allowed = cors_headers()
        .iter()
        .map(HeaderName::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    (
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS".to_string()),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, allowed),
        ],
        "ok",
    )
}

/// Judge one uploaded clip.
///
/// * 400 `{ "error": "No video file provided" }` without a `video` part.
/// * 500 `{ "error": "Failed to analyze video", "details": ... }` on any
///   model or parsing failure.
pub async fn handle_analyze(State(state): State<ServerState>, mut multipart: Multipart) -> Response {
    let mut video: Option<CapturedMedia> = None;
    let mut language = Language::En;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::warn!("server: malformed multipart body: {e}");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to analyze video", "details": e.to_string() }),
                );
            }
        };

        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("video") => {
                let name = field.file_name().unwrap_or("").to_string();
                let mime = field
                    .content_type()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_VIDEO_MIME)
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        log::info!(
                            "server: received video {name:?}, {} bytes, {mime}",
                            bytes.len()
                        );
                        video = Some(CapturedMedia::new(bytes, mime));
                    }
                    Err(e) => {
                        log::warn!("server: failed to read video part: {e}");
                        return error_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            json!({ "error": "Failed to analyze video", "details": e.to_string() }),
                        );
                    }
                }
            }
            Some("language") => {
                if let Ok(tag) = field.text().await {
                    language = Language::from_tag(&tag);
                }
            }
            _ => {}
        }
    }

    let Some(video) = video.filter(|v| !v.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "No video file provided" }),
        );
    };

    tokio::time::sleep(state.think_delay).await;

    match state.model.judge(&video, language).await {
        Ok(result) => {
            log::info!(
                "server: verdict {} ({}%, {} timestamps)",
                result.verdict.as_str(),
                result.confidence_percent(),
                result.timestamps.len()
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            log::error!("server: analysis failed: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to analyze video", "details": e.detail() }),
            )
        }
    }
}
