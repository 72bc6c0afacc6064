//! Captured clips and user-selected files.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

use super::validate::{check_declared, UploadLimits, ValidationError};

// ---------------------------------------------------------------------------
// CapturedMedia
// ---------------------------------------------------------------------------

/// A finished video clip: raw container bytes plus the declared MIME type.
///
/// Produced by [`crate::media::Recorder::stop`] or by
/// [`crate::media::validate`].  The bytes are never transformed after
/// creation; cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMedia {
    bytes: Bytes,
    mime: String,
}

impl CapturedMedia {
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Declared MIME type, possibly with codec parameters
    /// (e.g. `video/webm;codecs=vp9`).
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// MIME type without parameters (`video/webm;codecs=vp9` → `video/webm`).
    pub fn essence(&self) -> &str {
        self.mime.split(';').next().unwrap_or("").trim()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name used when the clip is attached to a multipart request.
    pub fn file_name(&self) -> &'static str {
        match self.essence() {
            "video/mp4" => "magic-trick.mp4",
            "video/quicktime" => "magic-trick.mov",
            "video/x-msvideo" | "video/avi" => "magic-trick.avi",
            _ => "magic-trick.webm",
        }
    }
}

// ---------------------------------------------------------------------------
// SelectedFile
// ---------------------------------------------------------------------------

/// A file the user picked for upload, before validation.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    ///
    /// The type and the size from the file's metadata are checked against
    /// `limits` first; a rejected file is never read.
    pub async fn load(path: &Path, limits: &UploadLimits) -> Result<Self, LoadError> {
        let mime = mime_for_path(path);
        let size = tokio::fs::metadata(path).await?.len();
        check_declared(mime, size, limits)?;

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime, bytes))
    }
}

/// Why [`SelectedFile::load`] produced no file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Best-effort MIME type for a video file path, from its extension.
///
/// Unknown extensions map to `application/octet-stream`, which the
/// validator then rejects as an unsupported format.
///
/// ```
/// use std::path::Path;
/// use magic_verdict::media::mime_for_path;
///
/// assert_eq!(mime_for_path(Path::new("trick.MOV")), "video/quicktime");
/// assert_eq!(mime_for_path(Path::new("notes.txt")), "application/octet-stream");
/// ```
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" | "qt" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Convenience for callers holding a `PathBuf` from a text field.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches('"');
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_strips_codec_parameters() {
        let clip = CapturedMedia::new(vec![1, 2, 3], "video/webm;codecs=vp9");
        assert_eq!(clip.essence(), "video/webm");
        assert_eq!(clip.mime(), "video/webm;codecs=vp9");
        assert_eq!(clip.file_name(), "magic-trick.webm");
    }

    #[test]
    fn clones_share_bytes() {
        let clip = CapturedMedia::new(vec![7u8; 1024], "video/mp4");
        let copy = clip.clone();
        assert_eq!(clip.bytes().as_ptr(), copy.bytes().as_ptr());
        assert_eq!(copy.file_name(), "magic-trick.mp4");
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(mime_for_path(Path::new("a.WebM")), "video/webm");
        assert_eq!(mime_for_path(Path::new("a.avi")), "video/x-msvideo");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn expand_path_trims_quotes() {
        assert_eq!(expand_path("  \"/tmp/a.mp4\" "), PathBuf::from("/tmp/a.mp4"));
    }

    #[tokio::test]
    async fn load_reads_bytes_and_infers_mime() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("trick.mp4");
        std::fs::write(&path, vec![0u8; 2048]).expect("write");

        let file = SelectedFile::load(&path, &UploadLimits::default())
            .await
            .expect("load");
        assert_eq!(file.name, "trick.mp4");
        assert_eq!(file.mime, "video/mp4");
        assert_eq!(file.size(), 2048);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_from_metadata() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("huge.mp4");
        let handle = std::fs::File::create(&path).expect("create");
        handle.set_len(300 * 1024 * 1024).expect("sparse length");
        drop(handle);

        let err = SelectedFile::load(&path, &UploadLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Rejected(ValidationError::TooLarge {
                size: 314_572_800,
                max: 104_857_600
            })
        ));
    }

    #[tokio::test]
    async fn unknown_extension_is_rejected_before_reading() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not a video").expect("write");

        let err = SelectedFile::load(&path, &UploadLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Rejected(ValidationError::UnsupportedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = SelectedFile::load(&dir.path().join("gone.mp4"), &UploadLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
