//! Session phases and the read-only snapshot presentation renders.
//!
//! [`Phase`] is the state machine's position.  [`SessionSnapshot`] is
//! everything the widget needs for one frame; the runner replaces it after
//! every transition.
//!
//! [`SharedSnapshot`] is a type alias for `Arc<Mutex<SessionSnapshot>>`,
//! cheap to clone and safe to share across threads.

use std::sync::{Arc, Mutex, PoisonError};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::i18n::{self, Language};
use crate::media::{CameraError, RecorderError, ValidationError};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the capture cycle is.
///
/// ```text
/// Idle ──start──▶ Countdown{3..1} ──▶ Recording ──stop──▶ Uploading
/// Idle ──valid file──────────────────────────────────────▶ Uploading
/// Uploading ──100%──▶ Analyzing ──settled + reveal──▶ Idle
/// any ──retry──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the user.  A verdict may be on display.
    #[default]
    Idle,

    /// Counting down before recording starts.
    Countdown { remaining: u8 },

    /// The recorder is running.  `stopping` is set once a stop was requested
    /// and the recorder is flushing.
    Recording { stopping: bool },

    /// Simulated upload progress toward 100.
    Uploading,

    /// Waiting for the verdict.  `settled` once the request has completed
    /// and only the reveal pause remains.
    Analyzing { settled: bool },
}

impl Phase {
    /// `true` while a capture cycle is in flight.
    ///
    /// ```
    /// use magic_verdict::session::Phase;
    ///
    /// assert!(!Phase::Idle.is_busy());
    /// assert!(Phase::Countdown { remaining: 2 }.is_busy());
    /// assert!(Phase::Analyzing { settled: true }.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// A short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Countdown { .. } => "countdown",
            Phase::Recording { .. } => "recording",
            Phase::Uploading => "uploading",
            Phase::Analyzing { .. } => "analyzing",
        }
    }
}

// ---------------------------------------------------------------------------
// CameraStatus
// ---------------------------------------------------------------------------

/// Camera readiness as the session sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraStatus {
    #[default]
    Initializing,
    Ready,
    Failed(CameraError),
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// The last user-visible problem.  Rendered with [`i18n::notice_text`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Camera(CameraError),
    Validation(ValidationError),
    Recorder(RecorderError),
    Analysis(AnalysisError),
    /// A path was chosen but could not be read.
    FileUnreadable(String),
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Size and type of the clip held by the session, without the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub mime: String,
    pub len: usize,
}

/// Read-only copy of the session for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub camera: CameraStatus,
    pub media: Option<MediaInfo>,
    /// 0..=100.
    pub upload_progress: u8,
    /// 0.0..=100.0, never decreasing within a cycle.
    pub analysis_progress: f32,
    pub outcome: Option<AnalysisResult>,
    pub notice: Option<Notice>,
    pub language: Language,
    pub cycle: u64,
}

impl SessionSnapshot {
    /// Initial snapshot: idle, camera initializing.
    pub fn new(language: Language) -> Self {
        Self {
            phase: Phase::Idle,
            camera: CameraStatus::Initializing,
            media: None,
            upload_progress: 0,
            analysis_progress: 0.0,
            outcome: None,
            notice: None,
            language,
            cycle: 0,
        }
    }

    pub fn camera_ready(&self) -> bool {
        self.camera == CameraStatus::Ready
    }

    /// The number to show during the countdown.
    pub fn countdown_value(&self) -> Option<u8> {
        match self.phase {
            Phase::Countdown { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Whether a start request would be accepted.
    pub fn can_start(&self) -> bool {
        self.phase == Phase::Idle && self.camera_ready() && self.outcome.is_none()
    }

    pub fn can_stop(&self) -> bool {
        self.phase == (Phase::Recording { stopping: false })
    }

    pub fn can_select_file(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Instruction line for the current phase, in the session language.
    pub fn instructions(&self) -> &'static str {
        i18n::instructions(self.language, &self.phase, self.camera_ready())
    }

    /// The current notice, rendered in the session language.
    pub fn notice_text(&self) -> Option<String> {
        self.notice
            .as_ref()
            .map(|n| i18n::notice_text(self.language, n))
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

// ---------------------------------------------------------------------------
// SharedSnapshot
// ---------------------------------------------------------------------------

/// Thread-safe handle to the latest [`SessionSnapshot`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedSnapshot = Arc<Mutex<SessionSnapshot>>;

/// Construct a new [`SharedSnapshot`] holding the initial snapshot.
pub fn new_shared_snapshot(language: Language) -> SharedSnapshot {
    Arc::new(Mutex::new(SessionSnapshot::new(language)))
}

/// Copy the latest snapshot out.  A poisoned lock still yields the last
/// value written.
pub fn read_snapshot(shared: &SharedSnapshot) -> SessionSnapshot {
    shared
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Verdict;

    fn ready() -> SessionSnapshot {
        SessionSnapshot {
            camera: CameraStatus::Ready,
            ..SessionSnapshot::new(Language::En)
        }
    }

    #[test]
    fn initial_snapshot_waits_for_camera() {
        let snap = SessionSnapshot::default();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.camera, CameraStatus::Initializing);
        assert!(!snap.can_start());
        assert!(snap.can_select_file());
        assert_eq!(snap.instructions(), "正在初始化摄像头...");
    }

    #[test]
    fn start_requires_ready_camera_and_no_verdict() {
        let mut snap = ready();
        assert!(snap.can_start());

        snap.outcome = Some(AnalysisResult {
            verdict: Verdict::Fooled,
            confidence: 0.7,
            timestamps: vec![],
            analysis: "clean".into(),
        });
        assert!(!snap.can_start());
        assert!(snap.can_select_file());
    }

    #[test]
    fn stop_only_while_recording_and_not_stopping() {
        let mut snap = ready();
        assert!(!snap.can_stop());
        snap.phase = Phase::Recording { stopping: false };
        assert!(snap.can_stop());
        assert!(!snap.can_select_file());
        snap.phase = Phase::Recording { stopping: true };
        assert!(!snap.can_stop());
    }

    #[test]
    fn countdown_value_only_during_countdown() {
        let mut snap = ready();
        assert_eq!(snap.countdown_value(), None);
        snap.phase = Phase::Countdown { remaining: 2 };
        assert_eq!(snap.countdown_value(), Some(2));
    }

    #[test]
    fn notice_is_rendered_in_session_language() {
        let mut snap = ready();
        snap.notice = Some(Notice::Camera(CameraError::NotFound));
        assert_eq!(
            snap.notice_text().as_deref(),
            Some("No camera found. Please connect a camera and try again.")
        );
    }

    #[test]
    fn shared_snapshot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSnapshot>();
    }

    #[test]
    fn shared_snapshot_can_be_cloned_and_read() {
        let shared = new_shared_snapshot(Language::En);
        let other = Arc::clone(&shared);
        shared.lock().unwrap().upload_progress = 40;
        assert_eq!(read_snapshot(&other).upload_progress, 40);
    }
}
