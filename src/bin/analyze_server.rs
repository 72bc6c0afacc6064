//! Analysis endpoint.
//!
//! Serves `POST /analyze-magic-trick` on `server.bind`, forwarding every
//! clip to the configured vision model.  The model key is read from
//! `GEMINI_API_KEY` when the config file leaves it empty.

use std::sync::Arc;

use magic_verdict::analysis::{GeminiModel, VisionModel};
use magic_verdict::config::AppConfig;
use magic_verdict::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("magic-verdict analysis server starting up");

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    log::info!(
        "model: {} at {}",
        config.model.model,
        config.model.base_url
    );
    let model: Arc<dyn VisionModel> = Arc::new(GeminiModel::from_config(&config.model));

    server::serve(&config.server, model).await
}
