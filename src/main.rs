//! Application entry point — Magic Verdict widget.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the analysis client from config.
//! 5. Probe ffmpeg for encoders and build camera + recorder.
//! 6. Spawn the session runner on the tokio runtime.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the
//!    window is closed.  Dropping the intent sender then lets the runner
//!    release the camera.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use magic_verdict::{
    analysis::{AnalysisClient, HttpAnalysisClient},
    app::MagicVerdictApp,
    config::AppConfig,
    media::{CameraProvider, FfmpegCamera, FfmpegEncoder, Recorder},
    session::{new_shared_snapshot, Intent, SessionRunner},
};

use eframe::egui;

/// How long to wait for the session runner after the window closes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Magic Verdict")
        .with_inner_size([width, height])
        .with_min_inner_size([360.0, 420.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Magic Verdict starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Analysis client
    log::info!("analysis endpoint: {}", config.analysis.endpoint);
    let client: Arc<dyn AnalysisClient> = Arc::new(HttpAnalysisClient::from_config(&config.analysis));

    // 5. Camera + recorder
    let camera = CameraProvider::new(Box::new(FfmpegCamera::new(config.camera.clone())));
    let encoder = rt.block_on(FfmpegEncoder::probe(config.camera.clone()));
    let recorder = Recorder::new(Box::new(encoder));

    // 6. Session runner
    let shared = new_shared_snapshot(config.language);
    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(16);
    let runner = SessionRunner::new(&config, Arc::clone(&shared), camera, recorder, client);
    let runner_handle = rt.spawn(runner.run(intent_rx));

    // 7. UI (blocks until the window is closed)
    let app = MagicVerdictApp::new(shared, intent_tx);
    let result = eframe::run_native(
        "Magic Verdict",
        native_options(&config),
        Box::new(move |cc| {
            MagicVerdictApp::install_fonts(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    );

    // The app (and its intent sender) is gone; give the runner a moment to
    // finish in-flight work and release the camera.
    match rt.block_on(tokio::time::timeout(SHUTDOWN_GRACE, runner_handle)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("session runner ended abnormally: {e}"),
        Err(_) => log::warn!("session runner still busy after {SHUTDOWN_GRACE:?}; exiting"),
    }

    result.map_err(|e| anyhow::anyhow!("UI error: {e}"))
}
