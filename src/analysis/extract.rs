//! Pull a verdict out of free-form model text.
//!
//! Models tend to wrap the JSON they were asked for in prose or code
//! fences.  [`first_json_object`] finds the first balanced `{ ... }` span
//! (braces inside string literals do not count), and [`parse_result`]
//! checks it field by field so a malformed reply is reported as
//! [`AnalysisError::ResponseFormat`] rather than silently patched up.

use serde::Deserialize;

use super::client::AnalysisError;
use super::result::{AnalysisResult, Timestamp, Verdict, DEFAULT_CONFIDENCE};

/// Return the first brace-balanced JSON object in `text`, if any.
///
/// ```
/// use magic_verdict::analysis::first_json_object;
///
/// let reply = "Sure! ```json\n{\"verdict\": \"fooled\", \"note\": \"}\"}\n``` done";
/// assert_eq!(first_json_object(reply), Some("{\"verdict\": \"fooled\", \"note\": \"}\"}"));
/// assert_eq!(first_json_object("no json here"), None);
/// ```
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Loose view of the reply; every field is checked by hand below.
#[derive(Deserialize)]
struct RawResult {
    verdict: Option<String>,
    confidence: Option<f64>,
    timestamps: Option<Vec<String>>,
    analysis: Option<String>,
}

/// Extract and validate an [`AnalysisResult`] from `text`.
///
/// * `verdict` is required and must be `caught` or `fooled`.
/// * `confidence` defaults to 0.75 when absent or null, else must be in `[0, 1]`.
/// * `timestamps` defaults to empty; each entry must be `M:SS.cc`.
/// * `analysis` is required and must not be blank.
pub fn parse_result(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let json = first_json_object(text)
        .ok_or_else(|| AnalysisError::ResponseFormat("no JSON object in model reply".into()))?;

    let raw: RawResult = serde_json::from_str(json)
        .map_err(|e| AnalysisError::ResponseFormat(format!("invalid JSON: {e}")))?;

    let verdict: Verdict = raw
        .verdict
        .ok_or_else(|| AnalysisError::ResponseFormat("missing \"verdict\"".into()))?
        .parse()
        .map_err(AnalysisError::ResponseFormat)?;

    let confidence = raw.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AnalysisError::ResponseFormat(format!(
            "confidence {confidence} is outside [0, 1]"
        )));
    }

    let timestamps = raw
        .timestamps
        .unwrap_or_default()
        .iter()
        .map(|s| s.parse::<Timestamp>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AnalysisError::ResponseFormat(e.to_string()))?;

    let analysis = raw
        .analysis
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AnalysisError::ResponseFormat("missing \"analysis\"".into()))?;

    Ok(AnalysisResult {
        verdict,
        confidence,
        timestamps,
        analysis,
    })
}
