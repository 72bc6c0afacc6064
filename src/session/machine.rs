//! The capture/upload/analyze state machine as a pure reducer.
//!
//! [`Session::apply`] takes one [`Event`], updates the session and returns
//! the [`Effect`]s the runner must carry out.  It never performs I/O, never
//! sleeps and never reads the clock, so every transition can be tested
//! directly.

use std::time::Duration;

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::config::SessionConfig;
use crate::i18n::Language;
use crate::media::{
    validate, CameraError, CapturedMedia, RecorderError, SelectedFile, UploadLimits,
    ValidationError,
};

use super::state::{CameraStatus, MediaInfo, Notice, Phase, SessionSnapshot};

// ---------------------------------------------------------------------------
// Events and effects
// ---------------------------------------------------------------------------

/// Something that happened: a user request or the result of an effect.
#[derive(Debug, Clone)]
pub enum Event {
    CameraReady,
    CameraFailed(CameraError),
    StartRequested,
    CountdownTick,
    StopRequested,
    RecordingFinished(CapturedMedia),
    RecorderFailed(RecorderError),
    FileSelected(SelectedFile),
    /// A file refused from its metadata, before it was read.
    FileRejected(ValidationError),
    FileUnreadable(String),
    UploadTick,
    /// `elapsed` since analysis began, over a `window` chosen per cycle.
    AnalysisTick { elapsed: Duration, window: Duration },
    AnalysisSettled(Result<AnalysisResult, AnalysisError>),
    Reveal,
    RetryRequested,
    CameraRetryRequested,
    SetLanguage(Language),
}

impl Event {
    /// Variant name for logs (payloads can be megabytes).
    pub fn name(&self) -> &'static str {
        match self {
            Event::CameraReady => "CameraReady",
            Event::CameraFailed(_) => "CameraFailed",
            Event::StartRequested => "StartRequested",
            Event::CountdownTick => "CountdownTick",
            Event::StopRequested => "StopRequested",
            Event::RecordingFinished(_) => "RecordingFinished",
            Event::RecorderFailed(_) => "RecorderFailed",
            Event::FileSelected(_) => "FileSelected",
            Event::FileRejected(_) => "FileRejected",
            Event::FileUnreadable(_) => "FileUnreadable",
            Event::UploadTick => "UploadTick",
            Event::AnalysisTick { .. } => "AnalysisTick",
            Event::AnalysisSettled(_) => "AnalysisSettled",
            Event::Reveal => "Reveal",
            Event::RetryRequested => "RetryRequested",
            Event::CameraRetryRequested => "CameraRetryRequested",
            Event::SetLanguage(_) => "SetLanguage",
        }
    }
}

/// Periodic timers the runner owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ticker {
    Countdown,
    Upload,
    Analysis,
}

/// Work the runner must do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the camera.  `force` releases any held stream first.
    AcquireCamera { force: bool },
    ReleaseCamera,
    StartTicker(Ticker),
    StopTicker(Ticker),
    StartRecorder,
    StopRecorder,
    DiscardRecorder,
    RequestAnalysis(CapturedMedia),
    CancelAnalysis,
    ScheduleReveal,
    CancelReveal,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The aggregate root of one widget's capture cycles.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    camera: CameraStatus,
    media: Option<CapturedMedia>,
    upload_progress: u8,
    analysis_progress: f32,
    /// Result held back until the reveal pause elapses.
    pending: Option<Result<AnalysisResult, AnalysisError>>,
    outcome: Option<AnalysisResult>,
    notice: Option<Notice>,
    language: Language,
    cycle: u64,

    limits: UploadLimits,
    countdown_from: u8,
    upload_step: u8,
    progress_cap: f32,
}

impl Session {
    pub fn new(language: Language, timing: &SessionConfig, limits: UploadLimits) -> Self {
        Self {
            phase: Phase::Idle,
            camera: CameraStatus::Initializing,
            media: None,
            upload_progress: 0,
            analysis_progress: 0.0,
            pending: None,
            outcome: None,
            notice: None,
            language,
            cycle: 0,
            limits,
            countdown_from: timing.countdown_from,
            upload_step: timing.upload_step.max(1),
            progress_cap: if timing.progress_cap.is_finite() {
                timing.progress_cap.clamp(0.0, 100.0)
            } else {
                SessionConfig::default().progress_cap
            },
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn camera(&self) -> &CameraStatus {
        &self.camera
    }

    pub fn media(&self) -> Option<&CapturedMedia> {
        self.media.as_ref()
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload_progress
    }

    pub fn analysis_progress(&self) -> f32 {
        self.analysis_progress
    }

    pub fn outcome(&self) -> Option<&AnalysisResult> {
        self.outcome.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Retry generation.  Events produced under an older cycle are stale.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// `true` when nothing will happen without user input.
    pub fn awaits_user(&self) -> bool {
        matches!(
            self.phase,
            Phase::Idle | Phase::Recording { stopping: false }
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            camera: self.camera.clone(),
            media: self.media.as_ref().map(|m| MediaInfo {
                mime: m.mime().to_string(),
                len: m.len(),
            }),
            upload_progress: self.upload_progress,
            analysis_progress: self.analysis_progress,
            outcome: self.outcome.clone(),
            notice: self.notice.clone(),
            language: self.language,
            cycle: self.cycle,
        }
    }

    /// Apply one event and return the effects to run, in order.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::CameraReady => {
                self.camera = CameraStatus::Ready;
                if matches!(self.notice, Some(Notice::Camera(_))) {
                    self.notice = None;
                }
                vec![]
            }

            Event::CameraFailed(err) => {
                log::warn!("session: camera unavailable: {err}");
                self.camera = CameraStatus::Failed(err.clone());
                self.notice = Some(Notice::Camera(err));
                vec![]
            }

            Event::StartRequested => {
                if self.phase != Phase::Idle
                    || self.camera != CameraStatus::Ready
                    || self.outcome.is_some()
                {
                    log::debug!("session: start ignored in {}", self.phase.label());
                    return vec![];
                }
                self.notice = None;
                if self.countdown_from == 0 {
                    self.phase = Phase::Recording { stopping: false };
                    return vec![Effect::StartRecorder];
                }
                self.phase = Phase::Countdown {
                    remaining: self.countdown_from,
                };
                vec![Effect::StartTicker(Ticker::Countdown)]
            }

            Event::CountdownTick => {
                let Phase::Countdown { remaining } = self.phase else {
                    return vec![];
                };
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.phase = Phase::Recording { stopping: false };
                    vec![Effect::StopTicker(Ticker::Countdown), Effect::StartRecorder]
                } else {
                    self.phase = Phase::Countdown { remaining };
                    vec![]
                }
            }

            Event::StopRequested => {
                if self.phase != (Phase::Recording { stopping: false }) {
                    log::debug!("session: stop ignored in {}", self.phase.label());
                    return vec![];
                }
                self.phase = Phase::Recording { stopping: true };
                vec![Effect::StopRecorder]
            }

            Event::RecordingFinished(media) => {
                if !matches!(self.phase, Phase::Recording { .. }) {
                    return vec![];
                }
                log::info!("session: recorded {} bytes ({})", media.len(), media.mime());
                self.media = Some(media);
                self.begin_upload()
            }

            Event::RecorderFailed(err) => {
                if !matches!(self.phase, Phase::Recording { .. }) {
                    return vec![];
                }
                log::error!("session: recording failed: {err}");
                self.phase = Phase::Idle;
                self.notice = Some(Notice::Recorder(err));
                vec![Effect::DiscardRecorder]
            }

            Event::FileSelected(file) => {
                if self.phase != Phase::Idle {
                    log::debug!("session: file ignored in {}", self.phase.label());
                    return vec![];
                }
                match validate(&file, &self.limits) {
                    Ok(media) => {
                        log::info!("session: accepted {:?} ({} bytes)", file.name, media.len());
                        self.outcome = None;
                        self.notice = None;
                        self.media = Some(media);
                        self.begin_upload()
                    }
                    Err(err) => {
                        log::warn!("session: rejected {:?}: {err}", file.name);
                        self.notice = Some(Notice::Validation(err));
                        vec![]
                    }
                }
            }

            Event::FileRejected(err) => {
                if self.phase == Phase::Idle {
                    log::warn!("session: rejected file: {err}");
                    self.notice = Some(Notice::Validation(err));
                }
                vec![]
            }

            Event::FileUnreadable(detail) => {
                if self.phase == Phase::Idle {
                    self.notice = Some(Notice::FileUnreadable(detail));
                }
                vec![]
            }

            Event::UploadTick => {
                if self.phase != Phase::Uploading {
                    return vec![];
                }
                self.upload_progress = self.upload_progress.saturating_add(self.upload_step).min(100);
                if self.upload_progress < 100 {
                    return vec![];
                }
                let Some(media) = self.media.clone() else {
                    self.phase = Phase::Idle;
                    return vec![Effect::StopTicker(Ticker::Upload)];
                };
                self.phase = Phase::Analyzing { settled: false };
                self.analysis_progress = 0.0;
                vec![
                    Effect::StopTicker(Ticker::Upload),
                    Effect::StartTicker(Ticker::Analysis),
                    Effect::RequestAnalysis(media),
                ]
            }

            Event::AnalysisTick { elapsed, window } => {
                if self.phase != (Phase::Analyzing { settled: false }) {
                    return vec![];
                }
                let target = if window.is_zero() {
                    self.progress_cap
                } else {
                    let ratio = elapsed.as_secs_f32() / window.as_secs_f32();
                    (ratio * 100.0).min(self.progress_cap)
                };
                self.analysis_progress = self.analysis_progress.max(target);
                if self.analysis_progress >= self.progress_cap {
                    vec![Effect::StopTicker(Ticker::Analysis)]
                } else {
                    vec![]
                }
            }

            Event::AnalysisSettled(result) => {
                if self.phase != (Phase::Analyzing { settled: false }) {
                    return vec![];
                }
                self.pending = Some(result);
                self.analysis_progress = 100.0;
                self.phase = Phase::Analyzing { settled: true };
                vec![Effect::StopTicker(Ticker::Analysis), Effect::ScheduleReveal]
            }

            Event::Reveal => {
                if self.phase != (Phase::Analyzing { settled: true }) {
                    return vec![];
                }
                match self.pending.take() {
                    Some(Ok(result)) => {
                        log::info!("session: verdict {}", result.verdict.as_str());
                        self.outcome = Some(result);
                    }
                    Some(Err(err)) => {
                        log::error!("session: analysis failed: {err}");
                        self.notice = Some(Notice::Analysis(err));
                    }
                    None => {}
                }
                self.phase = Phase::Idle;
                vec![]
            }

            Event::RetryRequested => {
                log::info!("session: retry from {}", self.phase.label());
                self.phase = Phase::Idle;
                self.camera = CameraStatus::Initializing;
                self.media = None;
                self.upload_progress = 0;
                self.analysis_progress = 0.0;
                self.pending = None;
                self.outcome = None;
                self.notice = None;
                self.cycle += 1;
                vec![
                    Effect::StopTicker(Ticker::Countdown),
                    Effect::StopTicker(Ticker::Upload),
                    Effect::StopTicker(Ticker::Analysis),
                    Effect::CancelAnalysis,
                    Effect::CancelReveal,
                    Effect::DiscardRecorder,
                    Effect::ReleaseCamera,
                    Effect::AcquireCamera { force: true },
                ]
            }

            Event::CameraRetryRequested => {
                if self.phase != Phase::Idle || !matches!(self.camera, CameraStatus::Failed(_)) {
                    return vec![];
                }
                self.camera = CameraStatus::Initializing;
                self.notice = None;
                vec![Effect::AcquireCamera { force: true }]
            }

            Event::SetLanguage(language) => {
                self.language = language;
                vec![]
            }
        }
    }

    fn begin_upload(&mut self) -> Vec<Effect> {
        self.phase = Phase::Uploading;
        self.upload_progress = 0;
        self.analysis_progress = 0.0;
        self.pending = None;
        vec![Effect::StartTicker(Ticker::Upload)]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
