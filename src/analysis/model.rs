//! Upstream vision model used by the analysis server.
//!
//! [`GeminiModel`] calls the Gemini `generateContent` REST endpoint with
//! the instruction text and the clip inlined as base64.  Connection details
//! come from [`ModelConfig`]; the key may instead come from
//! `GEMINI_API_KEY`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::ModelConfig;
use crate::i18n::Language;
use crate::media::CapturedMedia;

use super::client::AnalysisError;
use super::extract::parse_result;
use super::prompt::PromptBuilder;
use super::result::AnalysisResult;

/// Judges a clip.  The server holds one behind `Arc<dyn VisionModel>`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn judge(
        &self,
        video: &CapturedMedia,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// Gemini REST client.
pub struct GeminiModel {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl GeminiModel {
    /// Build from config, resolving the API key once.
    ///
    /// A missing key is not an error here; every call then fails with
    /// [`AnalysisError::Configuration`].
    pub fn from_config(config: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            log::warn!(
                "model: no API key configured and {} is unset",
                ModelConfig::API_KEY_ENV
            );
        }

        Self {
            client,
            config: config.clone(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl VisionModel for GeminiModel {
    async fn judge(
        &self,
        video: &CapturedMedia,
        language: Language,
    ) -> Result<AnalysisResult, AnalysisError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            AnalysisError::Configuration(format!("{} is not set", ModelConfig::API_KEY_ENV))
        })?;

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": PromptBuilder::new(language).build() },
                    {
                        "inline_data": {
                            "mime_type": video.essence(),
                            "data": STANDARD.encode(video.bytes())
                        }
                    }
                ]
            }]
        });

        log::info!(
            "model: sending {} KiB clip to {}",
            video.len() / 1024,
            self.config.model
        );
        let response = self
            .client
            .post(self.url())
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!("model: API error {status}: {}", text.trim());
            return Err(AnalysisError::Upstream {
                detail: format!("model API error: {status}"),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::ResponseFormat(e.to_string()))?;

        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AnalysisError::MissingPayload)?;

        log::debug!("model: reply {text}");
        parse_result(text)
    }
}
