//! Camera acquisition — the single owner of the hardware stream handle.
//!
//! [`CameraProvider`] wraps a platform [`CameraBackend`] and holds at most one
//! [`StreamHandle`].  Acquisition is idempotent: asking again while a handle
//! is held returns the same handle.  [`CameraProvider::force_reacquire`] is
//! the retry path; it always closes the old handle before opening a new one
//! so the device is never locked twice.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CameraError
// ---------------------------------------------------------------------------

/// Why the camera could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera found")]
    NotFound,

    #[error("unable to access camera: {0}")]
    Unknown(String),
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// Opaque lease on an open camera stream.
///
/// Only [`CameraProvider`] stores one; everyone else borrows it.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    id: u64,
    label: String,
}

impl StreamHandle {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// Backend-assigned identifier, unique per open.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Human-readable device description.
    pub fn label(&self) -> &str {
        &self.label
    }
}

// ---------------------------------------------------------------------------
// CameraBackend trait
// ---------------------------------------------------------------------------

/// Platform camera access.
///
/// Implementors must release every underlying device resource in
/// [`close`](Self::close).
#[async_trait]
pub trait CameraBackend: Send {
    async fn open(&mut self) -> Result<StreamHandle, CameraError>;
    async fn close(&mut self, handle: StreamHandle);
}

// ---------------------------------------------------------------------------
// CameraProvider
// ---------------------------------------------------------------------------

/// Owns the camera stream for the lifetime of the session.
pub struct CameraProvider {
    backend: Box<dyn CameraBackend>,
    stream: Option<StreamHandle>,
}

impl CameraProvider {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            stream: None,
        }
    }

    /// Open the camera unless a stream is already held.
    pub async fn acquire(&mut self) -> Result<&StreamHandle, CameraError> {
        let handle = match self.stream.take() {
            Some(handle) => handle,
            None => {
                let handle = self.backend.open().await?;
                log::info!("camera: acquired stream #{} ({})", handle.id(), handle.label());
                handle
            }
        };
        let held: &StreamHandle = self.stream.insert(handle);
        Ok(held)
    }

    /// Release any held stream, then open a fresh one.
    pub async fn force_reacquire(&mut self) -> Result<&StreamHandle, CameraError> {
        self.release().await;
        self.acquire().await
    }

    /// Close the held stream, if any.
    pub async fn release(&mut self) {
        if let Some(handle) = self.stream.take() {
            log::debug!("camera: releasing stream #{}", handle.id());
            self.backend.close(handle).await;
        }
    }

    /// The currently held stream.
    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.stream.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
