//! Media capture and upload — camera → recorder → clip, or file → validator → clip.
//!
//! # Pipeline
//!
//! ```text
//! CameraBackend ──open──▶ CameraProvider (owns StreamHandle)
//!                              │ &StreamHandle
//!                              ▼
//! RecordingBackend ──chunks──▶ Recorder ──stop──▶ CapturedMedia
//!
//! SelectedFile ──validate(limits)──────────────▶ CapturedMedia
//! ```
//!
//! [`CapturedMedia`] is the only thing the session hands to the analysis
//! client; it is immutable and cheap to clone.

pub mod camera;
pub mod clip;
pub mod ffmpeg;
pub mod recorder;
pub mod validate;

pub use camera::{CameraBackend, CameraError, CameraProvider, StreamHandle};
pub use clip::{expand_path, mime_for_path, CapturedMedia, LoadError, SelectedFile};
pub use ffmpeg::{classify_camera_failure, FfmpegCamera, FfmpegEncoder};
pub use recorder::{negotiate, Recorder, RecorderError, RecordingBackend, CODEC_PREFERENCES};
pub use validate::{check_declared, validate, UploadLimits, ValidationError, ACCEPTED_MIME_TYPES};
