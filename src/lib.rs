//! Magic Verdict: record or upload a magic trick and let a vision model
//! decide whether it spotted the method.
//!
//! * [`session`] drives one capture cycle: countdown, recording, upload,
//!   analysis and the verdict reveal.
//! * [`media`] wraps the camera and the recorder behind traits, with an
//!   ffmpeg implementation.
//! * [`analysis`] talks to the analysis endpoint and, on the server side, to
//!   the upstream vision model.
//! * [`server`] is that analysis endpoint.
//! * [`app`] is the egui widget.

pub mod analysis;
pub mod app;
pub mod config;
pub mod i18n;
pub mod media;
pub mod server;
pub mod session;
