//! Configuration for the magic-trick verdict app.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the session
//! timings, camera, analysis client and analysis server, `AppPaths` for
//! cross-platform directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AnalysisConfig, AppConfig, CameraConfig, ModelConfig, ServerConfig, SessionConfig, UiConfig,
};
