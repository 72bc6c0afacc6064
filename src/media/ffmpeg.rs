//! FFmpeg-backed camera and encoder for desktop builds.
//!
//! Both halves shell out to the `ffmpeg` binary named in [`CameraConfig`]:
//!
//! * [`FfmpegCamera`] probes the capture device by grabbing one frame and
//!   classifies failures into [`CameraError`].
//! * [`FfmpegEncoder`] spawns a capture+encode process that writes the
//!   container to stdout; a reader task forwards stdout in chunks to the
//!   [`Recorder`](super::Recorder).  Sending `q` on stdin finishes the file
//!   cleanly.  If stdout closes before that, the last line ffmpeg wrote to
//!   stderr is reported on the recorder's failure channel.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::CameraConfig;

use super::camera::{CameraBackend, CameraError, StreamHandle};
use super::recorder::{RecorderError, RecordingBackend};

/// Size of each stdout read forwarded as one chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// How long ffmpeg gets to finalise the container after `q`.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Arguments that open the configured capture device.
fn input_args(config: &CameraConfig) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        config.input_format.clone(),
        "-video_size".into(),
        format!("{}x{}", config.width, config.height),
        "-framerate".into(),
        config.framerate.to_string(),
        "-i".into(),
        config.device.clone(),
    ]
}

/// Last non-blank line of ffmpeg's stderr, which carries the actual error.
fn last_line(stderr: &str) -> Option<&str> {
    stderr.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

/// Map ffmpeg's stderr from a failed device open to a [`CameraError`].
pub fn classify_camera_failure(stderr: &str) -> CameraError {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("not authorized")
    {
        CameraError::PermissionDenied
    } else if lower.contains("no such file or directory")
        || lower.contains("no such device")
        || lower.contains("could not find")
        || lower.contains("not found")
    {
        CameraError::NotFound
    } else {
        let detail = last_line(stderr).unwrap_or("camera probe failed");
        CameraError::Unknown(detail.to_string())
    }
}

// ---------------------------------------------------------------------------
// FfmpegCamera
// ---------------------------------------------------------------------------

/// Camera backend that validates the device with a one-frame probe.
///
/// The probe process exits straight away, so the returned handle is a lease
/// on the device rather than an open pipe; the encoder opens the device only
/// while recording.
pub struct FfmpegCamera {
    config: CameraConfig,
    next_id: u64,
}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config, next_id: 0 }
    }
}

#[async_trait]
impl CameraBackend for FfmpegCamera {
    async fn open(&mut self) -> Result<StreamHandle, CameraError> {
        let mut args = input_args(&self.config);
        args.extend(["-frames:v", "1", "-f", "null", "-"].map(String::from));

        log::debug!("camera: probing {} {}", self.config.input_format, self.config.device);
        let output = Command::new(&self.config.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CameraError::Unknown(format!("failed to run {}: {e}", self.config.ffmpeg)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("camera: probe failed: {}", stderr.trim());
            return Err(classify_camera_failure(&stderr));
        }

        self.next_id += 1;
        Ok(StreamHandle::new(
            self.next_id,
            format!("{} {}", self.config.input_format, self.config.device),
        ))
    }

    async fn close(&mut self, handle: StreamHandle) {
        log::debug!("camera: lease #{} returned", handle.id());
    }
}

// ---------------------------------------------------------------------------
// FfmpegEncoder
// ---------------------------------------------------------------------------

/// Encoder backend that records from the capture device through ffmpeg.
pub struct FfmpegEncoder {
    config: CameraConfig,
    /// Output of `ffmpeg -encoders`, used to answer [`RecordingBackend::supports`].
    encoders: String,
    child: Option<Child>,
    /// Forwards stdout; resolves to everything ffmpeg wrote on stderr.
    reader: Option<JoinHandle<String>>,
    /// Set before a deliberate stop so the reader does not report the exit.
    stopping: Arc<AtomicBool>,
}

impl FfmpegEncoder {
    /// Query the installed ffmpeg for its encoders.
    ///
    /// If ffmpeg cannot be run the encoder list is empty, so negotiation
    /// falls back to the default MP4 output.
    pub async fn probe(config: CameraConfig) -> Self {
        let encoders = match Command::new(&config.ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(out) => String::from_utf8_lossy(&out.stdout).into_owned(),
            Err(e) => {
                log::warn!("recorder: could not list ffmpeg encoders: {e}");
                String::new()
            }
        };
        Self::with_encoder_list(config, encoders)
    }

    /// Build from an already captured `ffmpeg -encoders` listing.
    pub fn with_encoder_list(config: CameraConfig, encoders: String) -> Self {
        Self {
            config,
            encoders,
            child: None,
            reader: None,
            stopping: Arc::default(),
        }
    }

    fn has_encoder(&self, name: &str) -> bool {
        self.encoders
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|encoder| encoder == name)
    }

    fn output_args(mime: Option<&str>) -> &'static [&'static str] {
        match mime {
            Some("video/webm;codecs=vp9") => &[
                "-c:v", "libvpx-vp9", "-deadline", "realtime", "-cpu-used", "8", "-f", "webm",
            ],
            Some("video/webm;codecs=vp8") => &["-c:v", "libvpx", "-deadline", "realtime", "-f", "webm"],
            Some(_) => &["-f", "webm"],
            None => &["-f", "mp4", "-movflags", "frag_keyframe+empty_moov"],
        }
    }
}

#[async_trait]
impl RecordingBackend for FfmpegEncoder {
    fn supports(&self, mime: &str) -> bool {
        match mime {
            "video/webm;codecs=vp9" => self.has_encoder("libvpx-vp9"),
            "video/webm;codecs=vp8" => self.has_encoder("libvpx"),
            "video/webm" => ["libvpx-vp9", "libvpx", "libaom-av1", "libsvtav1"]
                .iter()
                .any(|e| self.has_encoder(e)),
            _ => false,
        }
    }

    fn default_mime(&self) -> &str {
        "video/mp4"
    }

    async fn begin(
        &mut self,
        stream: &StreamHandle,
        mime: Option<&str>,
        chunks: mpsc::UnboundedSender<Bytes>,
        failed: oneshot::Sender<RecorderError>,
    ) -> Result<(), RecorderError> {
        if self.child.is_some() {
            return Err(RecorderError::AlreadyActive);
        }

        let mut args = input_args(&self.config);
        args.extend(Self::output_args(mime).iter().map(|s| s.to_string()));
        args.push("pipe:1".into());

        log::info!("recorder: starting ffmpeg on {}", stream.label());
        let mut child = Command::new(&self.config.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::Device(format!("failed to start ffmpeg: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecorderError::Device("failed to capture ffmpeg stdout".into()))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RecorderError::Device("failed to capture ffmpeg stderr".into()))?;

        let errors = tokio::spawn(async move {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text).await;
            text
        });

        let stopping = Arc::new(AtomicBool::new(false));
        self.stopping = Arc::clone(&stopping);

        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if chunks.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                            // Recorder is gone; nobody is left to tell.
                            return String::new();
                        }
                    }
                    Err(e) => {
                        log::warn!("recorder: stdout read failed: {e}");
                        break;
                    }
                }
            }

            let text = errors.await.unwrap_or_default();
            if !stopping.load(Ordering::SeqCst) {
                let detail = last_line(&text).unwrap_or("no error output");
                log::warn!("recorder: ffmpeg stopped unexpectedly: {detail}");
                let _ = failed.send(RecorderError::Device(format!(
                    "ffmpeg stopped unexpectedly: {detail}"
                )));
            }
            text
        });

        self.child = Some(child);
        self.reader = Some(reader);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), RecorderError> {
        let mut child = self.child.take().ok_or(RecorderError::NotActive)?;
        self.stopping.store(true, Ordering::SeqCst);

        if let Some(mut stdin) = child.stdin.take() {
            // `q` asks ffmpeg to finish the container and exit.
            let _ = stdin.write_all(b"q").await;
        }

        let status = match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(RecorderError::Device(e.to_string())),
            Err(_) => {
                log::warn!("recorder: ffmpeg did not exit after q, killing");
                let _ = child.kill().await;
                return Err(RecorderError::Device("ffmpeg did not stop".into()));
            }
        };

        let stderr = match self.reader.take() {
            Some(reader) => reader.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(RecorderError::Device(match last_line(&stderr) {
                Some(line) => format!("ffmpeg exited with {status}: {line}"),
                None => format!("ffmpeg exited with {status}"),
            }));
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::recorder::negotiate;

    const ENCODER_LIST: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D libvpx               libvpx VP8 (codec vp8)
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
";

    #[test]
    fn permission_errors_are_recognised() {
        let err = classify_camera_failure("[video4linux2] Cannot open video device /dev/video0: Permission denied");
        assert_eq!(err, CameraError::PermissionDenied);
    }

    #[test]
    fn missing_devices_are_recognised() {
        let err = classify_camera_failure("/dev/video0: No such file or directory");
        assert_eq!(err, CameraError::NotFound);
    }

    #[test]
    fn other_failures_keep_last_line() {
        let err = classify_camera_failure("first\nDevice busy\n\n");
        assert_eq!(err, CameraError::Unknown("Device busy".into()));
    }

    #[test]
    fn supports_reads_encoder_listing() {
        let enc = FfmpegEncoder::with_encoder_list(CameraConfig::default(), ENCODER_LIST.into());
        assert!(enc.supports("video/webm;codecs=vp9"));
        assert!(enc.supports("video/webm;codecs=vp8"));
        assert!(enc.supports("video/webm"));
        assert!(!enc.supports("video/ogg"));
        assert_eq!(negotiate(&enc), Some("video/webm;codecs=vp9"));
    }

    #[test]
    fn vp8_only_build_negotiates_vp8() {
        let listing = " V....D libvpx               libvpx VP8\n";
        let enc = FfmpegEncoder::with_encoder_list(CameraConfig::default(), listing.into());
        assert_eq!(negotiate(&enc), Some("video/webm;codecs=vp8"));
    }

    #[test]
    fn empty_listing_falls_back_to_mp4() {
        let enc = FfmpegEncoder::with_encoder_list(CameraConfig::default(), String::new());
        assert_eq!(negotiate(&enc), None);
        assert_eq!(enc.default_mime(), "video/mp4");
        assert!(FfmpegEncoder::output_args(None).contains(&"mp4"));
    }

    #[test]
    fn last_line_skips_trailing_blanks() {
        assert_eq!(last_line("a\n  b  \n\n"), Some("b"));
        assert_eq!(last_line("\n \n"), None);
    }

    /// Stand-in ffmpeg: a shell script that ignores its arguments.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &tempfile::TempDir, body: &str) -> CameraConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        CameraConfig {
            ffmpeg: path.to_string_lossy().into_owned(),
            ..CameraConfig::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_reported_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_ffmpeg(&dir, "echo 'first' >&2\necho '/dev/video0: device vanished' >&2\nexit 1");
        let mut enc = FfmpegEncoder::with_encoder_list(config, String::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let (failed_tx, failed_rx) = oneshot::channel();

        enc.begin(&StreamHandle::new(1, "test"), None, tx, failed_tx)
            .await
            .expect("begin");

        let err = tokio::time::timeout(Duration::from_secs(10), failed_rx)
            .await
            .expect("failure reported in time")
            .expect("failure sent");
        assert_eq!(
            err,
            RecorderError::Device("ffmpeg stopped unexpectedly: /dev/video0: device vanished".into())
        );
        enc.abort().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_finish_carries_stderr_and_is_not_an_early_exit() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_ffmpeg(&dir, "read _q\necho 'Conversion failed!' >&2\nexit 1");
        let mut enc = FfmpegEncoder::with_encoder_list(config, String::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let (failed_tx, failed_rx) = oneshot::channel();

        enc.begin(&StreamHandle::new(1, "test"), None, tx, failed_tx)
            .await
            .expect("begin");
        let err = enc.end().await.unwrap_err();

        match err {
            RecorderError::Device(msg) => assert!(msg.ends_with(": Conversion failed!"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(failed_rx.await.is_err(), "deliberate stop is not a failure");
    }

    #[test]
    fn input_args_use_configured_device() {
        let mut config = CameraConfig::default();
        config.device = "/dev/video2".into();
        let args = input_args(&config);
        assert_eq!(args.last().map(String::as_str), Some("/dev/video2"));
        assert!(args.contains(&"1280x720".to_string()));
    }
}
