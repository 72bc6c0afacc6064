//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::i18n::Language;
use crate::media::UploadLimits;

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Where the desktop client sends clips for judging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Full URL of the analysis endpoint.
    pub endpoint: String,
    /// Optional key sent as both `Authorization: Bearer` and `apikey`.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a verdict.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/analyze-magic-trick".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing of the capture/analyze cycle.
///
/// These only shape what the user sees; none of them gate the real network
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Countdown start value.
    pub countdown_from: u8,
    /// Milliseconds between countdown steps.
    pub countdown_tick_ms: u64,
    /// Milliseconds between simulated upload steps.
    pub upload_tick_ms: u64,
    /// Percentage added per upload step.
    pub upload_step: u8,
    /// Milliseconds between analysis progress updates.
    pub analysis_tick_ms: u64,
    /// Lower bound of the randomised "thinking" window.
    pub thinking_min_ms: u64,
    /// Upper bound of the randomised "thinking" window.
    pub thinking_max_ms: u64,
    /// Analysis progress never passes this until the result arrives.
    pub progress_cap: f32,
    /// Pause between the result arriving and the verdict being shown.
    pub reveal_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            countdown_tick_ms: 1000,
            upload_tick_ms: 100,
            upload_step: 10,
            analysis_tick_ms: 100,
            thinking_min_ms: 8_000,
            thinking_max_ms: 12_000,
            progress_cap: 95.0,
            reveal_delay_ms: 500,
        }
    }
}

impl SessionConfig {
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms.max(1))
    }

    pub fn upload_tick(&self) -> Duration {
        Duration::from_millis(self.upload_tick_ms.max(1))
    }

    pub fn analysis_tick(&self) -> Duration {
        Duration::from_millis(self.analysis_tick_ms.max(1))
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Capture device settings for the ffmpeg backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// ffmpeg executable name or path.
    pub ffmpeg: String,
    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,
    /// Device identifier for the input format.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let (input_format, device) = if cfg!(target_os = "macos") {
            ("avfoundation", "0")
        } else if cfg!(target_os = "windows") {
            ("dshow", "video=Integrated Camera")
        } else {
            ("v4l2", "/dev/video0")
        };
        Self {
            ffmpeg: "ffmpeg".into(),
            input_format: input_format.into(),
            device: device.into(),
            width: 1280,
            height: 720,
            framerate: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Upstream multimodal model used by the analysis server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API base URL, without the `/v1beta/...` path.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key.  When `None` the `GEMINI_API_KEY` environment variable is used.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for the model.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-1.5-flash".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    /// Environment variable consulted when `api_key` is unset.
    pub const API_KEY_ENV: &'static str = "GEMINI_API_KEY";

    /// Configured key, falling back to the environment.  Empty keys count as
    /// missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(Self::API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Analysis endpoint server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Pause before calling the model, so the AI looks like it is thinking.
    pub think_delay_ms: u64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".into(),
            think_delay_ms: 500,
            max_body_bytes: 110 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui widget appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial window size `(width, height)` in points.
    pub window_size: (f32, f32),
    /// Keep the widget floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (420.0, 560.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use magic_verdict::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial UI and prompt language.
    pub language: Language,
    /// Analysis endpoint used by the desktop client.
    pub analysis: AnalysisConfig,
    /// Countdown / progress timings.
    pub session: SessionConfig,
    /// Upload size limits.
    pub upload: UploadLimits,
    /// Capture device.
    pub camera: CameraConfig,
    /// Upstream model (server side).
    pub model: ModelConfig,
    /// Analysis server.
    pub server: ServerConfig,
    /// Widget settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.language, loaded.language);
        assert_eq!(original.analysis.endpoint, loaded.analysis.endpoint);
        assert_eq!(original.analysis.api_key, loaded.analysis.api_key);
        assert_eq!(original.session.countdown_from, loaded.session.countdown_from);
        assert_eq!(original.session.progress_cap, loaded.session.progress_cap);
        assert_eq!(original.upload, loaded.upload);
        assert_eq!(original.camera.device, loaded.camera.device);
        assert_eq!(original.model.model, loaded.model.model);
        assert_eq!(original.server.bind, loaded.server.bind);
        assert_eq!(original.ui.window_size, loaded.ui.window_size);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.language, Language::Zh);
        assert_eq!(config.session.countdown_from, 3);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.session.countdown_tick_ms, 1000);
        assert_eq!(cfg.session.upload_tick_ms, 100);
        assert_eq!(cfg.session.analysis_tick_ms, 100);
        assert_eq!(cfg.session.thinking_min_ms, 8_000);
        assert_eq!(cfg.session.thinking_max_ms, 12_000);
        assert_eq!(cfg.session.progress_cap, 95.0);
        assert_eq!(cfg.upload.min_bytes, 100 * 1024);
        assert_eq!(cfg.upload.max_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.server.think_delay_ms, 500);
        assert!(cfg.model.api_key.is_none());
    }

    /// Partial files fill the missing sections with defaults.
    #[test]
    fn partial_file_uses_defaults_for_missing_fields() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "language = \"en\"\n\n[analysis]\nendpoint = \"https://example.test/analyze\"\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.language, Language::En);
        assert_eq!(cfg.analysis.endpoint, "https://example.test/analyze");
        assert_eq!(cfg.analysis.timeout_secs, 120);
        assert_eq!(cfg.session.countdown_from, 3);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.language = Language::En;
        cfg.analysis.api_key = Some("anon-key".into());
        cfg.session.reveal_delay_ms = 0;
        cfg.camera.device = "/dev/video3".into();
        cfg.model.api_key = Some("sk-test".into());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.language, Language::En);
        assert_eq!(loaded.analysis.api_key.as_deref(), Some("anon-key"));
        assert_eq!(loaded.session.reveal_delay_ms, 0);
        assert_eq!(loaded.camera.device, "/dev/video3");
        assert_eq!(loaded.model.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn blank_model_key_counts_as_missing() {
        let cfg = ModelConfig {
            api_key: Some("   ".into()),
            ..ModelConfig::default()
        };
        assert!(cfg.resolve_api_key().is_none());
    }
}
