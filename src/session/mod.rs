//! Capture session: the state machine behind the widget.
//!
//! This module wires camera, recorder, upload validation and the analysis
//! client into one cycle and exposes the snapshot the UI reads every frame.
//!
//! # Architecture
//!
//! ```text
//! Intent (mpsc, from the widget)
//!        │
//!        ▼
//! SessionRunner::run()  ← async tokio task
//!        │
//!        ├─ Session::apply(event) → Vec<Effect>      (pure)
//!        │
//!        ├─ camera / recorder effects  → awaited inline
//!        └─ tickers, analysis, reveal  → spawned, send (cycle, Event) back
//!
//! SharedSnapshot (Arc<Mutex<SessionSnapshot>>) ←─── read by egui update()
//! ```

pub mod machine;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use machine::{Effect, Event, Session, Ticker};
pub use runner::{Intent, SessionRunner};
pub use state::{
    new_shared_snapshot, read_snapshot, CameraStatus, MediaInfo, Notice, Phase, SessionSnapshot,
    SharedSnapshot,
};
