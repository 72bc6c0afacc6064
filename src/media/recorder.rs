//! Recorder — codec negotiation and chunk accumulation over a platform encoder.
//!
//! [`Recorder`] drives a [`RecordingBackend`].  On [`start`](Recorder::start)
//! it picks the first container/codec the backend supports from
//! [`CODEC_PREFERENCES`], hands the backend a channel, and the backend pushes
//! encoded chunks into it as they are produced.  On [`stop`](Recorder::stop)
//! the backend flushes and the chunks are concatenated in arrival order into
//! one [`CapturedMedia`].
//!
//! A backend that dies mid-recording reports it once on the failure channel
//! returned by `start`; a normal `stop` or `cancel` closes that channel
//! without a value.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::camera::StreamHandle;
use super::clip::CapturedMedia;

/// Preferred recording formats, best first.  Every entry is a valid
/// fallback for the one before it; when none is supported the backend's
/// own default is used.
pub const CODEC_PREFERENCES: [&str; 3] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

// ---------------------------------------------------------------------------
// RecorderError
// ---------------------------------------------------------------------------

/// Recording failures.  All are terminal for the current capture cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("recorder is already running")]
    AlreadyActive,

    #[error("recorder is not running")]
    NotActive,

    #[error("no camera stream to record from")]
    NoStream,

    #[error("recording device error: {0}")]
    Device(String),

    #[error("recording produced no data")]
    Empty,
}

// ---------------------------------------------------------------------------
// RecordingBackend trait
// ---------------------------------------------------------------------------

/// Platform encoder.
///
/// Contract for [`end`](Self::end): once it returns, every chunk produced
/// has already been sent on the channel given to [`begin`](Self::begin).
/// `failed` is used only when encoding stops without `end` or `abort`
/// having been called; otherwise it is dropped unused.
#[async_trait]
pub trait RecordingBackend: Send {
    /// Whether the encoder can produce `mime` (e.g. `video/webm;codecs=vp9`).
    fn supports(&self, mime: &str) -> bool;

    /// MIME type produced when no preference is supported.
    fn default_mime(&self) -> &str;

    /// Start encoding from `stream`.  `mime` is `None` for the platform default.
    async fn begin(
        &mut self,
        stream: &StreamHandle,
        mime: Option<&str>,
        chunks: mpsc::UnboundedSender<Bytes>,
        failed: oneshot::Sender<RecorderError>,
    ) -> Result<(), RecorderError>;

    /// Flush and finish the current recording.
    async fn end(&mut self) -> Result<(), RecorderError>;

    /// Discard the current recording without flushing.
    async fn abort(&mut self);
}

/// First entry of [`CODEC_PREFERENCES`] the backend supports.
pub fn negotiate(backend: &dyn RecordingBackend) -> Option<&'static str> {
    CODEC_PREFERENCES
        .iter()
        .copied()
        .find(|mime| backend.supports(mime))
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

struct ActiveRecording {
    mime: String,
    chunks: mpsc::UnboundedReceiver<Bytes>,
}

/// Accumulates encoded chunks from a [`RecordingBackend`] into one clip.
pub struct Recorder {
    backend: Box<dyn RecordingBackend>,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new(backend: Box<dyn RecordingBackend>) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Negotiate a format and start recording from `stream`.
    ///
    /// The returned receiver yields an error if the recording fails before
    /// [`stop`](Self::stop) or [`cancel`](Self::cancel).
    pub async fn start(
        &mut self,
        stream: &StreamHandle,
    ) -> Result<oneshot::Receiver<RecorderError>, RecorderError> {
        if self.active.is_some() {
            return Err(RecorderError::AlreadyActive);
        }

        let negotiated = negotiate(self.backend.as_ref());
        let mime = match negotiated {
            Some(mime) => {
                log::info!("recorder: using {mime}");
                mime.to_string()
            }
            None => {
                let fallback = self.backend.default_mime().to_string();
                log::info!("recorder: no preferred format supported, using default {fallback}");
                fallback
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let (failed_tx, failed_rx) = oneshot::channel();
        self.backend.begin(stream, negotiated, tx, failed_tx).await?;
        self.active = Some(ActiveRecording { mime, chunks: rx });
        Ok(failed_rx)
    }

    /// Finish recording and return the concatenated clip.
    pub async fn stop(&mut self) -> Result<CapturedMedia, RecorderError> {
        let mut active = self.active.take().ok_or(RecorderError::NotActive)?;
        self.backend.end().await?;

        let mut buf = BytesMut::new();
        let mut count = 0usize;
        while let Ok(chunk) = active.chunks.try_recv() {
            if chunk.is_empty() {
                continue;
            }
            count += 1;
            buf.extend_from_slice(&chunk);
        }

        log::debug!("recorder: stopped, {count} chunks, {} bytes", buf.len());
        if buf.is_empty() {
            return Err(RecorderError::Empty);
        }
        Ok(CapturedMedia::new(buf.freeze(), active.mime))
    }

    /// Abandon any recording in progress.  Safe to call when idle.
    pub async fn cancel(&mut self) {
        if self.active.take().is_some() {
            log::debug!("recorder: cancelled");
            self.backend.abort().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
