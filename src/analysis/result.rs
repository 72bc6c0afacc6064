//! Verdict payload returned by the analysis endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confidence used when the model omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Did the AI see through the trick?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The method was spotted.
    Caught,
    /// The performance looked clean.
    Fooled,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Caught => "caught",
            Verdict::Fooled => "fooled",
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caught" => Ok(Verdict::Caught),
            "fooled" => Ok(Verdict::Fooled),
            other => Err(format!("unknown verdict {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp {0:?}, expected M:SS.cc")]
pub struct TimestampError(pub String);

/// A moment in the clip, written `M:SS.cc` (e.g. `0:02.34`).
///
/// Minutes may carry leading zeros on input; [`Display`](fmt::Display)
/// always writes the canonical form.
///
/// ```
/// use magic_verdict::analysis::Timestamp;
///
/// let ts: Timestamp = "00:05.12".parse().unwrap();
/// assert_eq!(ts.to_string(), "0:05.12");
/// assert!("0:5.12".parse::<Timestamp>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    minutes: u32,
    seconds: u8,
    centis: u8,
}

impl Timestamp {
    /// `None` when `seconds >= 60` or `centis >= 100`.
    pub fn new(minutes: u32, seconds: u8, centis: u8) -> Option<Self> {
        (seconds < 60 && centis < 100).then_some(Self {
            minutes,
            seconds,
            centis,
        })
    }

    /// Offset from the start of the clip in hundredths of a second.
    pub fn as_centis(&self) -> u64 {
        (u64::from(self.minutes) * 60 + u64::from(self.seconds)) * 100 + u64::from(self.centis)
    }
}

fn two_digits(s: &str) -> Option<u8> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimestampError(s.to_string());

        let (minutes, rest) = s.trim().split_once(':').ok_or_else(invalid)?;
        if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

        let (seconds, centis) = rest.split_once('.').ok_or_else(invalid)?;
        let seconds = two_digits(seconds).ok_or_else(invalid)?;
        let centis = two_digits(centis).ok_or_else(invalid)?;

        Timestamp::new(minutes, seconds, centis).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}.{:02}", self.minutes, self.seconds, self.centis)
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// The endpoint's answer for one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Moments where the method was spotted; empty for `fooled`.
    pub timestamps: Vec<Timestamp>,
    /// Free-text explanation in the requested language.
    pub analysis: String,
}

impl AnalysisResult {
    /// Confidence as a whole percentage for display.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_timestamps_parse() {
        let ts: Timestamp = "0:02.34".parse().expect("valid");
        assert_eq!(ts, Timestamp::new(0, 2, 34).expect("in range"));
        assert_eq!(ts.as_centis(), 234);
        assert_eq!(ts.to_string(), "0:02.34");

        let long: Timestamp = "12:59.99".parse().expect("valid");
        assert_eq!(long.to_string(), "12:59.99");
    }

    #[test]
    fn leading_zero_minutes_are_normalised() {
        let ts: Timestamp = "00:02.34".parse().expect("valid");
        assert_eq!(ts.to_string(), "0:02.34");
    }

    #[test]
    fn malformed_timestamps_are_rejected() {
        for bad in ["", "0:2.34", "0:02.3", "0:02", ":02.34", "0:60.00", "a:02.34", "0:02.345", "0.02:34"] {
            assert!(bad.parse::<Timestamp>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn timestamps_order_by_time() {
        let mut list: Vec<Timestamp> = ["1:00.00", "0:05.12", "0:02.34"]
            .iter()
            .map(|s| s.parse().expect("valid"))
            .collect();
        list.sort();
        let text: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["0:02.34", "0:05.12", "1:00.00"]);
    }

    #[test]
    fn result_serialises_in_wire_shape() {
        let result = AnalysisResult {
            verdict: Verdict::Caught,
            confidence: 0.8,
            timestamps: vec!["0:02.34".parse().expect("valid")],
            analysis: "palm at the cut".into(),
        };
        let json = serde_json::to_value(&result).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({
                "verdict": "caught",
                "confidence": 0.8,
                "timestamps": ["0:02.34"],
                "analysis": "palm at the cut"
            })
        );
        assert_eq!(result.confidence_percent(), 80);
    }

    #[test]
    fn verdict_parses_lowercase_only() {
        assert_eq!("fooled".parse::<Verdict>(), Ok(Verdict::Fooled));
        assert!("Caught".parse::<Verdict>().is_err());
    }
}
