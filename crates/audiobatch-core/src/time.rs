//! Trim time parsing and normalization.
//!
//! Trim points are entered as `M:S`, `MM:S`, `M:SS` or `MM:SS` and always
//! stored zero-padded as `MM:SS`. Anything else is rejected.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{1,2})$").expect("valid time pattern"));

/// Normalize a raw `MM:SS` string, zero-padding both components.
///
/// Returns `None` when the input does not match, including the empty string.
///
/// ```
/// use audiobatch_core::time::normalize_time;
///
/// assert_eq!(normalize_time("1:5").as_deref(), Some("01:05"));
/// assert_eq!(normalize_time("1:2:3"), None);
/// ```
pub fn normalize_time(raw: &str) -> Option<String> {
    let caps = TIME_PATTERN.captures(raw)?;
    Some(format!("{:0>2}:{:0>2}", &caps[1], &caps[2]))
}

/// A normalized `MM:SS` trim point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClipTime(String);

impl ClipTime {
    /// Parse and normalize a raw time string.
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_time(raw).map(Self)
    }

    /// The normalized `MM:SS` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ClipTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid time (expected MM:SS): {}", s))
    }
}

impl TryFrom<String> for ClipTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClipTime> for String {
    fn from(value: ClipTime) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pads_single_digits() {
        assert_eq!(normalize_time("1:5").as_deref(), Some("01:05"));
        assert_eq!(normalize_time("0:0").as_deref(), Some("00:00"));
        assert_eq!(normalize_time("9:30").as_deref(), Some("09:30"));
        assert_eq!(normalize_time("12:3").as_deref(), Some("12:03"));
    }

    #[test]
    fn test_normalize_keeps_two_digit_components() {
        assert_eq!(normalize_time("12:30").as_deref(), Some("12:30"));
        assert_eq!(normalize_time("03:00").as_deref(), Some("03:00"));
    }

    #[test]
    fn test_normalize_does_not_range_check_seconds() {
        assert_eq!(normalize_time("5:99").as_deref(), Some("05:99"));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        for raw in ["", "abc", "1:2:3", "123:00", "1:234", ":30", "10:", " 1:05", "1:05 ", "1-05"] {
            assert_eq!(normalize_time(raw), None, "expected rejection of {:?}", raw);
        }
    }

    #[test]
    fn test_clip_time_parse_and_display() {
        let t = ClipTime::parse("2:7").unwrap();
        assert_eq!(t.as_str(), "02:07");
        assert_eq!(t.to_string(), "02:07");
        assert!(ClipTime::parse("nope").is_none());
    }

    #[test]
    fn test_clip_time_from_str_error_message() {
        let err = "x".parse::<ClipTime>().unwrap_err();
        assert!(err.contains("MM:SS"));
    }

    #[test]
    fn test_clip_time_serde_normalizes_and_rejects() {
        let t: ClipTime = serde_json::from_str("\"4:2\"").unwrap();
        assert_eq!(t.as_str(), "04:02");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"04:02\"");
        assert!(serde_json::from_str::<ClipTime>("\"4:2:1\"").is_err());
    }
}
