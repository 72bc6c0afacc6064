//! Core `AnalysisClient` trait and the HTTP implementation.
//!
//! `HttpAnalysisClient` posts the clip as multipart form data to the
//! analysis endpoint (see [`crate::server`]) and validates the verdict it
//! returns.  All connection details come from [`AnalysisConfig`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::i18n::Language;
use crate::media::CapturedMedia;

use super::extract::parse_result;
use super::result::AnalysisResult;

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

/// Errors that can occur while getting a verdict.  All are terminal for the
/// current capture cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// HTTP transport or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("analysis request timed out")]
    Timeout,

    /// The endpoint answered 2xx with an empty body.
    #[error("analysis response was empty")]
    MissingPayload,

    /// The reply was not a well-formed verdict.
    #[error("malformed analysis response: {0}")]
    ResponseFormat(String),

    /// The endpoint or the upstream model reported an error.
    #[error("analysis service error: {detail}")]
    Upstream { detail: String },

    /// Something required to make the call is not configured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    /// Human-readable detail without the category prefix, suitable for
    /// showing to the user.
    pub fn detail(&self) -> String {
        match self {
            AnalysisError::Network(d)
            | AnalysisError::ResponseFormat(d)
            | AnalysisError::Configuration(d) => d.clone(),
            AnalysisError::Upstream { detail } => detail.clone(),
            AnalysisError::Timeout => "request timed out".into(),
            AnalysisError::MissingPayload => "empty response".into(),
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Network(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisClient trait
// ---------------------------------------------------------------------------

/// Sends one clip for judging.  One request per call, never retried.
///
/// Implementors must be `Send + Sync` so they can be shared with spawned
/// tasks (e.g. wrapped in `Arc<dyn AnalysisClient>`).
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(
        &self,
        media: &CapturedMedia,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError>;
}

// ---------------------------------------------------------------------------
// HttpAnalysisClient
// ---------------------------------------------------------------------------

/// Error payload the endpoint returns on 4xx/5xx.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

/// Posts clips to the `/analyze-magic-trick` endpoint.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    config: AnalysisConfig,
}

impl HttpAnalysisClient {
    /// Build from application config.
    ///
    /// The HTTP client carries the timeout from `config.timeout_secs`; a
    /// default client is used if the builder fails.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn upstream_error(status: reqwest::StatusCode, body: &str) -> AnalysisError {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let detail = parsed
            .and_then(|b| b.details.or(b.error))
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| match body.trim() {
                "" => format!("HTTP {status}"),
                text => format!("HTTP {status}: {text}"),
            });
        AnalysisError::Upstream { detail }
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    /// Upload `media` and wait for the verdict.
    ///
    /// `Authorization: Bearer …` and `apikey` are attached only when
    /// `config.api_key` is a non-empty string.
    async fn analyze(
        &self,
        media: &CapturedMedia,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError> {
        if self.config.endpoint.trim().is_empty() {
            return Err(AnalysisError::Configuration(
                "analysis endpoint is not set".into(),
            ));
        }

        let video = Part::bytes(media.bytes().to_vec())
            .file_name(media.file_name())
            .mime_str(media.mime())
            .map_err(|e| AnalysisError::Configuration(format!("invalid MIME type: {e}")))?;
        let form = Form::new()
            .part("video", video)
            .text("language", language.tag());

        let mut req = self.client.post(&self.config.endpoint).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key).header("apikey", key);
        }

        log::info!(
            "analysis: uploading {} bytes ({}) in {}",
            media.len(),
            media.mime(),
            language
        );
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = Self::upstream_error(status, &body);
            log::warn!("analysis: endpoint returned {status}: {err}");
            return Err(err);
        }
        if body.trim().is_empty() {
            return Err(AnalysisError::MissingPayload);
        }

        let result = parse_result(&body)?;
        log::info!(
            "analysis: verdict {} ({}%)",
            result.verdict.as_str(),
            result.confidence_percent()
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
