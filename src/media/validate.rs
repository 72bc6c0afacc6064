//! Upload validation — format and size checks for user-selected files.
//!
//! Rules run in a fixed order and the first failure wins:
//!
//! 1. MIME type must start with one of [`ACCEPTED_MIME_TYPES`].
//! 2. Size must not exceed [`UploadLimits::max_bytes`].
//! 3. Size must be at least [`UploadLimits::min_bytes`] (inclusive).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::clip::{CapturedMedia, SelectedFile};

/// MIME types accepted for upload.  Matching is by prefix so codec
/// parameters (`video/webm;codecs=vp8`) are allowed.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/avi",
];

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Why a selected file was rejected.  Recoverable: the user picks another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported video format: {mime:?}")]
    UnsupportedFormat { mime: String },

    #[error("file is {size} bytes, maximum is {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("file is {size} bytes, minimum is {min}")]
    TooSmall { size: u64, min: u64 },
}

// ---------------------------------------------------------------------------
// UploadLimits
// ---------------------------------------------------------------------------

/// Size bounds for uploaded files, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Smallest accepted file (default 100 KiB).
    pub min_bytes: u64,
    /// Largest accepted file (default 100 MiB).
    pub max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            min_bytes: 100 * KIB,
            max_bytes: 100 * MIB,
        }
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Check `file` against the upload rules and wrap it as [`CapturedMedia`].
///
/// The bytes are passed through untouched.
///
/// ```
/// use magic_verdict::media::{validate, SelectedFile, UploadLimits, ValidationError};
///
/// let limits = UploadLimits::default();
/// let file = SelectedFile::new("trick.mp4", "video/mp4", vec![0u8; 200 * 1024]);
/// assert!(validate(&file, &limits).is_ok());
///
/// let doc = SelectedFile::new("notes.pdf", "application/pdf", vec![0u8; 200 * 1024]);
/// assert!(matches!(
///     validate(&doc, &limits),
///     Err(ValidationError::UnsupportedFormat { .. })
/// ));
/// ```
pub fn validate(file: &SelectedFile, limits: &UploadLimits) -> Result<CapturedMedia, ValidationError> {
    let size = file.size();
    check_declared(&file.mime, size, limits)?;
    if size < limits.min_bytes {
        return Err(ValidationError::TooSmall {
            size,
            min: limits.min_bytes,
        });
    }

    Ok(CapturedMedia::new(file.bytes.clone(), file.mime.clone()))
}

/// Rules 1 and 2 on a declared type and size, before any bytes are read.
pub fn check_declared(mime: &str, size: u64, limits: &UploadLimits) -> Result<(), ValidationError> {
    if !is_accepted_mime(mime) {
        return Err(ValidationError::UnsupportedFormat {
            mime: mime.to_string(),
        });
    }
    if size > limits.max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: limits.max_bytes,
        });
    }
    Ok(())
}

/// `true` when `mime` starts with one of the accepted type/subtype pairs.
pub fn is_accepted_mime(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    ACCEPTED_MIME_TYPES.iter().any(|accepted| {
        mime.strip_prefix(accepted)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(';'))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
