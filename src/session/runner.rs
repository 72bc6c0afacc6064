//! Session runner: executes the reducer's effects and feeds results back.
//!
//! [`SessionRunner`] owns the [`Session`], the camera, the recorder and the
//! analysis client.  It receives [`Intent`]s from the widget over a
//! `tokio::sync::mpsc` channel and publishes a fresh [`SessionSnapshot`]
//! after every transition.
//!
//! # Effect execution
//!
//! ```text
//! AcquireCamera / StartRecorder / StopRecorder  → awaited inline, result
//!                                                  applied before the next event
//! StartTicker(..) / RequestAnalysis / Reveal    → spawned tasks that send
//!                                                  (cycle, Event) back
//! recorder failure channel                      → watched by a task that
//!                                                  sends RecorderFailed
//! RetryRequested                                → cycle += 1, every task
//!                                                  aborted, stale events dropped
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::analysis::AnalysisClient;
use crate::config::SessionConfig;
use crate::i18n::Language;
use crate::media::{
    CameraProvider, LoadError, Recorder, RecorderError, SelectedFile, UploadLimits,
};

use super::machine::{Effect, Event, Session, Ticker};
use super::state::SharedSnapshot;

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// What the widget can ask for.
#[derive(Debug, Clone)]
pub enum Intent {
    Start,
    Stop,
    /// An already loaded file.
    SelectFile(SelectedFile),
    /// A path to load; rejections and read failures become a notice.
    SelectPath(PathBuf),
    Retry,
    RetryCamera,
    SetLanguage(Language),
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Spawned work belonging to the current cycle.
#[derive(Default)]
struct Tasks {
    countdown: Option<JoinHandle<()>>,
    upload: Option<JoinHandle<()>>,
    analysis_ticker: Option<JoinHandle<()>>,
    analysis: Option<JoinHandle<()>>,
    reveal: Option<JoinHandle<()>>,
    /// Waits for the recorder to fail on its own.
    recorder_watch: Option<JoinHandle<()>>,
}

impl Tasks {
    fn ticker(&mut self, ticker: Ticker) -> &mut Option<JoinHandle<()>> {
        match ticker {
            Ticker::Countdown => &mut self.countdown,
            Ticker::Upload => &mut self.upload,
            Ticker::Analysis => &mut self.analysis_ticker,
        }
    }

    fn replace(slot: &mut Option<JoinHandle<()>>, handle: JoinHandle<()>) {
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn abort(slot: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        for slot in [
            &mut self.countdown,
            &mut self.upload,
            &mut self.analysis_ticker,
            &mut self.analysis,
            &mut self.reveal,
            &mut self.recorder_watch,
        ] {
            Self::abort(slot);
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Drives one [`Session`].
///
/// Create with [`SessionRunner::new`], then call [`run`](Self::run) inside a
/// tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use magic_verdict::analysis::HttpAnalysisClient;
/// use magic_verdict::config::AppConfig;
/// use magic_verdict::media::{CameraProvider, FfmpegCamera, FfmpegEncoder, Recorder};
/// use magic_verdict::session::{new_shared_snapshot, Intent, SessionRunner};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let shared = new_shared_snapshot(config.language);
/// let runner = SessionRunner::new(
///     &config,
///     shared.clone(),
///     CameraProvider::new(Box::new(FfmpegCamera::new(config.camera.clone()))),
///     Recorder::new(Box::new(FfmpegEncoder::probe(config.camera.clone()).await)),
///     Arc::new(HttpAnalysisClient::from_config(&config.analysis)),
/// );
///
/// let (intent_tx, intent_rx) = tokio::sync::mpsc::channel(16);
/// tokio::spawn(runner.run(intent_rx));
/// intent_tx.send(Intent::Start).await.ok();
/// # }
/// ```
pub struct SessionRunner {
    session: Session,
    shared: SharedSnapshot,
    camera: CameraProvider,
    recorder: Recorder,
    client: Arc<dyn AnalysisClient>,
    timing: SessionConfig,
    limits: UploadLimits,
    events_tx: mpsc::UnboundedSender<(u64, Event)>,
    events_rx: Option<mpsc::UnboundedReceiver<(u64, Event)>>,
    tasks: Tasks,
}

impl SessionRunner {
    pub fn new(
        config: &crate::config::AppConfig,
        shared: SharedSnapshot,
        camera: CameraProvider,
        recorder: Recorder,
        client: Arc<dyn AnalysisClient>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(config.language, &config.session, config.upload),
            shared,
            camera,
            recorder,
            client,
            timing: config.session.clone(),
            limits: config.upload,
            events_tx,
            events_rx: Some(events_rx),
            tasks: Tasks::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Acquire the camera, then serve intents.
    ///
    /// After `intents` closes, internal events keep being processed until
    /// the session needs the user again; then the camera is released and the
    /// runner returns.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        let Some(mut events) = self.events_rx.take() else {
            log::error!("session: runner started twice");
            return;
        };

        self.boot_camera().await;

        let mut intents_open = true;
        loop {
            if !intents_open && self.session.awaits_user() {
                break;
            }
            tokio::select! {
                intent = intents.recv(), if intents_open => match intent {
                    Some(intent) => self.handle_intent(intent).await,
                    None => {
                        log::debug!("session: intent channel closed, draining");
                        intents_open = false;
                    }
                },
                Some((cycle, event)) = events.recv() => {
                    if cycle != self.session.cycle() {
                        log::debug!("session: dropping stale {} from cycle {cycle}", event.name());
                        continue;
                    }
                    self.process(event).await;
                }
                else => break,
            }
        }

        self.tasks.abort_all();
        self.recorder.cancel().await;
        self.camera.release().await;
        log::info!("session: runner shutting down");
    }

    async fn boot_camera(&mut self) {
        let follow = self.execute(Effect::AcquireCamera { force: false }).await;
        if let Some(event) = follow {
            self.process(event).await;
        } else {
            self.publish();
        }
    }

    async fn handle_intent(&mut self, intent: Intent) {
        let event = match intent {
            Intent::Start => Event::StartRequested,
            Intent::Stop => Event::StopRequested,
            Intent::SelectFile(file) => Event::FileSelected(file),
            Intent::SelectPath(path) => match SelectedFile::load(&path, &self.limits).await {
                Ok(file) => Event::FileSelected(file),
                Err(LoadError::Rejected(e)) => {
                    log::info!("session: rejected {}: {e}", path.display());
                    Event::FileRejected(e)
                }
                Err(LoadError::Io(e)) => {
                    log::warn!("session: cannot read {}: {e}", path.display());
                    Event::FileUnreadable(e.to_string())
                }
            },
            Intent::Retry => Event::RetryRequested,
            Intent::RetryCamera => Event::CameraRetryRequested,
            Intent::SetLanguage(language) => Event::SetLanguage(language),
        };
        self.process(event).await;
    }

    /// Apply `event` and every event its inline effects produce, then
    /// publish once.
    async fn process(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let from = self.session.phase();
            let effects = self.session.apply(event.clone());
            log::debug!(
                "session: {} {} -> {} ({} effects)",
                event.name(),
                from.label(),
                self.session.phase().label(),
                effects.len()
            );
            for effect in effects {
                if let Some(follow) = self.execute(effect).await {
                    queue.push_back(follow);
                }
            }
        }
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    async fn execute(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AcquireCamera { force } => {
                let result = if force {
                    self.camera.force_reacquire().await.map(|_| ())
                } else {
                    self.camera.acquire().await.map(|_| ())
                };
                Some(match result {
                    Ok(()) => Event::CameraReady,
                    Err(e) => Event::CameraFailed(e),
                })
            }
            Effect::ReleaseCamera => {
                self.camera.release().await;
                None
            }
            Effect::StartTicker(ticker) => {
                let handle = self.spawn_ticker(ticker);
                Tasks::replace(self.tasks.ticker(ticker), handle);
                None
            }
            Effect::StopTicker(ticker) => {
                Tasks::abort(self.tasks.ticker(ticker));
                None
            }
            Effect::StartRecorder => {
                let Some(stream) = self.camera.stream() else {
                    return Some(Event::RecorderFailed(RecorderError::NoStream));
                };
                match self.recorder.start(stream).await {
                    Ok(failed) => {
                        let send = self.sender();
                        let handle = tokio::spawn(async move {
                            if let Ok(err) = failed.await {
                                send(Event::RecorderFailed(err));
                            }
                        });
                        Tasks::replace(&mut self.tasks.recorder_watch, handle);
                        None
                    }
                    Err(e) => Some(Event::RecorderFailed(e)),
                }
            }
            Effect::StopRecorder => {
                Tasks::abort(&mut self.tasks.recorder_watch);
                Some(match self.recorder.stop().await {
                    Ok(media) => Event::RecordingFinished(media),
                    Err(e) => Event::RecorderFailed(e),
                })
            }
            Effect::DiscardRecorder => {
                Tasks::abort(&mut self.tasks.recorder_watch);
                self.recorder.cancel().await;
                None
            }
            Effect::RequestAnalysis(media) => {
                let client = Arc::clone(&self.client);
                let language = self.session.language();
                let send = self.sender();
                let handle = tokio::spawn(async move {
                    let result = client.analyze(&media, language).await;
                    send(Event::AnalysisSettled(result));
                });
                Tasks::replace(&mut self.tasks.analysis, handle);
                None
            }
            Effect::CancelAnalysis => {
                Tasks::abort(&mut self.tasks.analysis);
                None
            }
            Effect::ScheduleReveal => {
                let delay = self.timing.reveal_delay();
                let send = self.sender();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    send(Event::Reveal);
                });
                Tasks::replace(&mut self.tasks.reveal, handle);
                None
            }
            Effect::CancelReveal => {
                Tasks::abort(&mut self.tasks.reveal);
                None
            }
        }
    }

    fn spawn_ticker(&self, ticker: Ticker) -> JoinHandle<()> {
        let send = self.sender();
        match ticker {
            Ticker::Countdown => {
                let period = self.timing.countdown_tick();
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(period).await;
                        send(Event::CountdownTick);
                    }
                })
            }
            Ticker::Upload => {
                let period = self.timing.upload_tick();
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(period).await;
                        send(Event::UploadTick);
                    }
                })
            }
            Ticker::Analysis => {
                let period = self.timing.analysis_tick();
                let window = self.thinking_window();
                log::debug!("session: thinking window {} ms", window.as_millis());
                tokio::spawn(async move {
                    let started = tokio::time::Instant::now();
                    loop {
                        tokio::time::sleep(period).await;
                        send(Event::AnalysisTick {
                            elapsed: started.elapsed(),
                            window,
                        });
                    }
                })
            }
        }
    }

    /// Random duration in the configured thinking range.
    fn thinking_window(&self) -> Duration {
        let min = self.timing.thinking_min_ms;
        let max = self.timing.thinking_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Event sender tagged with the current cycle.
    fn sender(&self) -> impl Fn(Event) + Send + 'static {
        let tx = self.events_tx.clone();
        let cycle = self.session.cycle();
        move |event| {
            let _ = tx.send((cycle, event));
        }
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, AnalysisResult, Verdict};
    use crate::config::AppConfig;
    use crate::media::camera::tests::FakeCamera;
    use crate::media::recorder::tests::FakeEncoder;
    use crate::media::{CameraError, CapturedMedia, ValidationError};
    use crate::session::state::{new_shared_snapshot, read_snapshot, CameraStatus, Notice};
    use crate::session::Phase;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Client that answers after `delay` with a fixed result and records
    /// what it was sent.
    struct ScriptedClient {
        delay: Duration,
        result: Result<AnalysisResult, AnalysisError>,
        seen: Mutex<Vec<(String, Language)>>,
    }

    impl ScriptedClient {
        fn new(delay: Duration, result: Result<AnalysisResult, AnalysisError>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                result,
                seen: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl AnalysisClient for ScriptedClient {
        async fn analyze(
            &self,
            media: &CapturedMedia,
            language: Language,
        ) -> Result<AnalysisResult, AnalysisError> {
            self.seen
                .lock()
                .unwrap()
                .push((media.mime().to_string(), language));
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn caught() -> AnalysisResult {
        AnalysisResult {
            verdict: Verdict::Caught,
            confidence: 0.8,
            timestamps: vec!["0:02.34".parse().expect("valid")],
            analysis: "Palm at the second lift.".into(),
        }
    }

    fn upload() -> SelectedFile {
        SelectedFile::new("trick.mp4", "video/mp4", vec![0u8; 200 * 1024])
    }

    struct Harness {
        shared: SharedSnapshot,
        camera: FakeCamera,
        encoder: FakeEncoder,
        runner: SessionRunner,
    }

    fn harness(client: Arc<dyn AnalysisClient>) -> Harness {
        harness_with(FakeCamera::default(), client)
    }

    fn harness_with(camera: FakeCamera, client: Arc<dyn AnalysisClient>) -> Harness {
        let encoder = FakeEncoder::new(vec!["video/webm;codecs=vp9"], vec![vec![1; 512], vec![2; 512]]);
        harness_full(camera, encoder, client)
    }

    fn harness_full(
        camera: FakeCamera,
        encoder: FakeEncoder,
        client: Arc<dyn AnalysisClient>,
    ) -> Harness {
        let mut config = AppConfig::default();
        config.language = Language::En;
        let shared = new_shared_snapshot(config.language);
        let runner = SessionRunner::new(
            &config,
            Arc::clone(&shared),
            CameraProvider::new(Box::new(camera.clone())),
            Recorder::new(Box::new(encoder.clone())),
            client,
        );
        Harness {
            shared,
            camera,
            encoder,
            runner,
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Upload → analysis success → verdict shown after the reveal pause.
    #[tokio::test(start_paused = true)]
    async fn uploaded_file_reaches_verdict() {
        let client = ScriptedClient::new(Duration::from_secs(2), Ok(caught()));
        let h = harness(client.clone());
        let (tx, rx) = mpsc::channel(4);

        tx.send(Intent::SelectFile(upload())).await.unwrap();
        drop(tx);
        h.runner.run(rx).await;

        let snap = read_snapshot(&h.shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.analysis_progress, 100.0);
        let outcome = snap.outcome.expect("verdict");
        assert_eq!(outcome.verdict, Verdict::Caught);
        assert_eq!(outcome.timestamps[0].to_string(), "0:02.34");
        assert!(snap.notice.is_none());
        assert_eq!(
            *client.seen.lock().unwrap(),
            vec![("video/mp4".to_string(), Language::En)]
        );
    }

    /// Analysis failure → idle, no verdict, notice surfaced.
    #[tokio::test(start_paused = true)]
    async fn failed_analysis_surfaces_notice() {
        let client = ScriptedClient::new(
            Duration::from_millis(300),
            Err(AnalysisError::Upstream {
                detail: "model overloaded".into(),
            }),
        );
        let h = harness(client);
        let (tx, rx) = mpsc::channel(4);

        tx.send(Intent::SelectFile(upload())).await.unwrap();
        drop(tx);
        h.runner.run(rx).await;

        let snap = read_snapshot(&h.shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.outcome.is_none());
        assert_eq!(
            snap.notice_text().as_deref(),
            Some("Analysis failed: model overloaded")
        );
    }

    /// Countdown → recording → stop → upload → analysis → verdict.
    #[tokio::test(start_paused = true)]
    async fn recorded_clip_reaches_verdict() {
        let client = ScriptedClient::new(Duration::from_secs(1), Ok(caught()));
        let h = harness(client.clone());
        let shared = Arc::clone(&h.shared);
        let encoder = h.encoder.clone();
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tx.send(Intent::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(read_snapshot(&shared).countdown_value(), Some(2));

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(
            read_snapshot(&shared).phase,
            Phase::Recording { stopping: false }
        );

        tx.send(Intent::Stop).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let snap = read_snapshot(&shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.outcome.map(|o| o.verdict), Some(Verdict::Caught));
        assert_eq!(
            *encoder.begun_with.lock().unwrap(),
            vec![Some("video/webm;codecs=vp9".to_string())]
        );
        assert_eq!(
            client.seen.lock().unwrap()[0].0,
            "video/webm;codecs=vp9".to_string()
        );
    }

    /// Retry during the countdown never starts the recorder.
    #[tokio::test(start_paused = true)]
    async fn retry_mid_countdown_cancels_recording() {
        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness(client);
        let shared = Arc::clone(&h.shared);
        let camera = h.camera.clone();
        let encoder = h.encoder.clone();
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tx.send(Intent::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tx.send(Intent::Retry).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snap = read_snapshot(&shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.camera, CameraStatus::Ready);
        assert_eq!(snap.cycle, 1);
        assert!(encoder.begun_with.lock().unwrap().is_empty());
        assert_eq!(camera.events(), vec!["open#1", "close#1", "open#2"]);

        drop(tx);
        task.await.unwrap();
        assert_eq!(camera.events().last().map(String::as_str), Some("close#2"));
    }

    /// Retry during analysis drops the in-flight result.
    #[tokio::test(start_paused = true)]
    async fn retry_mid_analysis_discards_result() {
        let client = ScriptedClient::new(Duration::from_secs(3), Ok(caught()));
        let h = harness(client);
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tx.send(Intent::SelectFile(upload())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(matches!(read_snapshot(&shared).phase, Phase::Analyzing { .. }));

        tx.send(Intent::Retry).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snap = read_snapshot(&shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert!(snap.outcome.is_none());
        assert_eq!(snap.analysis_progress, 0.0);

        drop(tx);
        task.await.unwrap();
    }

    /// Progress climbs while waiting and stays at or below 95 until settled.
    #[tokio::test(start_paused = true)]
    async fn analysis_progress_is_capped_while_waiting() {
        let client = ScriptedClient::new(Duration::from_secs(30), Ok(caught()));
        let h = harness(client);
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tx.send(Intent::SelectFile(upload())).await.unwrap();
        let mut last = 0.0;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let p = read_snapshot(&shared).analysis_progress;
            assert!(p >= last);
            assert!(p <= 95.0);
            last = p;
        }
        assert_eq!(last, 95.0);

        drop(tx);
        task.await.unwrap();
        assert_eq!(read_snapshot(&shared).analysis_progress, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn camera_failure_then_retry_camera() {
        let camera = FakeCamera::failing(CameraError::NotFound);
        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness_with(camera.clone(), client);
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tokio::task::yield_now().await;
        tx.send(Intent::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snap = read_snapshot(&shared);
        assert_eq!(snap.camera, CameraStatus::Failed(CameraError::NotFound));
        assert_eq!(snap.notice, Some(Notice::Camera(CameraError::NotFound)));
        assert_eq!(snap.phase, Phase::Idle);

        *camera.fail_with.lock().unwrap() = None;
        tx.send(Intent::RetryCamera).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snap = read_snapshot(&shared);
        assert_eq!(snap.camera, CameraStatus::Ready);
        assert!(snap.notice.is_none());

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_path_becomes_notice() {
        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness(client);
        let (tx, rx) = mpsc::channel(4);

        tx.send(Intent::SelectPath(PathBuf::from("/definitely/not/here.mp4")))
            .await
            .unwrap();
        drop(tx);
        h.runner.run(rx).await;

        let snap = read_snapshot(&h.shared);
        assert!(matches!(snap.notice, Some(Notice::FileUnreadable(_))));
        assert_eq!(snap.phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn language_switch_is_published() {
        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness(client);
        let (tx, rx) = mpsc::channel(4);

        tx.send(Intent::SetLanguage(Language::Zh)).await.unwrap();
        drop(tx);
        h.runner.run(rx).await;

        assert_eq!(read_snapshot(&h.shared).language, Language::Zh);
    }

    /// An encoder that dies after starting ends the take with a notice.
    #[tokio::test(start_paused = true)]
    async fn encoder_dying_mid_recording_returns_to_idle() {
        let encoder = FakeEncoder::new(vec!["video/webm;codecs=vp9"], vec![vec![1; 512]])
            .dying(RecorderError::Device("ffmpeg stopped unexpectedly: device vanished".into()));
        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness_full(FakeCamera::default(), encoder.clone(), client.clone());
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(h.runner.run(rx));

        tx.send(Intent::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let snap = read_snapshot(&shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(
            snap.notice,
            Some(Notice::Recorder(RecorderError::Device(
                "ffmpeg stopped unexpectedly: device vanished".into()
            )))
        );
        assert_eq!(encoder.begun_with.lock().unwrap().len(), 1);
        assert_eq!(*encoder.aborted.lock().unwrap(), 1);
        assert!(client.seen.lock().unwrap().is_empty());

        drop(tx);
        task.await.unwrap();
    }

    /// A sparse file over the size limit is rejected from its metadata.
    #[tokio::test]
    async fn oversized_path_is_rejected_without_analysis() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("huge.mp4");
        let handle = std::fs::File::create(&path).expect("create");
        handle.set_len(300 * 1024 * 1024).expect("sparse length");
        drop(handle);

        let client = ScriptedClient::new(Duration::ZERO, Ok(caught()));
        let h = harness(client.clone());
        let (tx, rx) = mpsc::channel(4);

        tx.send(Intent::SelectPath(path)).await.unwrap();
        drop(tx);
        h.runner.run(rx).await;

        let snap = read_snapshot(&h.shared);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(
            snap.notice,
            Some(Notice::Validation(ValidationError::TooLarge {
                size: 314_572_800,
                max: 104_857_600,
            }))
        );
        assert!(client.seen.lock().unwrap().is_empty());
    }
}
