//! Verdict analysis: the wire result type, the client the session calls,
//! and the upstream model the server calls.
//!
//! This module provides:
//! * [`AnalysisClient`] — async trait the session uses to get a verdict.
//! * [`HttpAnalysisClient`] — multipart client for the analysis endpoint.
//! * [`VisionModel`] / [`GeminiModel`] — the server's model seam.
//! * [`AnalysisResult`], [`Verdict`], [`Timestamp`] — the verdict payload.
//! * [`first_json_object`] / [`parse_result`] — strict reply validation.
//! * [`PromptBuilder`] — the per-language model instruction.
//! * [`AnalysisError`] — error variants for all of the above.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use magic_verdict::analysis::{AnalysisClient, HttpAnalysisClient};
//! use magic_verdict::config::AppConfig;
//! use magic_verdict::i18n::Language;
//! use magic_verdict::media::CapturedMedia;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = HttpAnalysisClient::from_config(&config.analysis);
//!
//!     let clip = CapturedMedia::new(std::fs::read("trick.mp4").unwrap(), "video/mp4");
//!     match client.analyze(&clip, Language::En).await {
//!         Ok(result) => println!("{}: {}", result.verdict.as_str(), result.analysis),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod client;
pub mod extract;
pub mod model;
pub mod prompt;
pub mod result;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{AnalysisClient, AnalysisError, HttpAnalysisClient};
pub use extract::{first_json_object, parse_result};
pub use model::{GeminiModel, VisionModel};
pub use prompt::PromptBuilder;
pub use result::{AnalysisResult, Timestamp, TimestampError, Verdict, DEFAULT_CONFIDENCE};
