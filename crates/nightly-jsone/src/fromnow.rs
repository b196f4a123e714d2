//! Relative timestamps for `$fromNow` and the `fromNow` builtin.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;

use crate::error::{RenderError, Result};

fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^(\s*(?P<sign>[-+]))?",
            r"(\s*(?P<years>\d+)\s*(years?|yr|y))?",
            r"(\s*(?P<months>\d+)\s*(months?|mo))?",
            r"(\s*(?P<weeks>\d+)\s*(weeks?|wk|w))?",
            r"(\s*(?P<days>\d+)\s*(days?|d))?",
            r"(\s*(?P<hours>\d+)\s*(hours?|hr|h))?",
            r"(\s*(?P<minutes>\d+)\s*(minutes?|min|m))?",
            r"(\s*(?P<seconds>\d+)\s*(seconds?|sec|s))?",
            r"\s*$"
        ))
        .expect("offset pattern is valid")
    })
}

/// Format a timestamp the way the context's `now` is formatted:
/// millisecond precision with a literal `Z` suffix.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a duration such as `"1 day"`, `"-2 hours 30 min"` or `"1 year"`.
///
/// A year counts as 365 days and a month as 30 days.
pub fn parse_offset(offset: &str) -> Result<Duration> {
    let captures = offset_pattern()
        .captures(offset)
        .ok_or_else(|| RenderError::interpreter(format!("invalid time offset '{offset}'")))?;

    let amount = |name: &str| -> Result<i64> {
        match captures.name(name) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| {
                RenderError::interpreter(format!("time offset component too large in '{offset}'"))
            }),
            None => Ok(0),
        }
    };

    let out_of_range = || RenderError::interpreter(format!("time offset out of range '{offset}'"));

    const UNITS: [(&str, i64); 7] = [
        ("years", 365 * 86_400),
        ("months", 30 * 86_400),
        ("weeks", 7 * 86_400),
        ("days", 86_400),
        ("hours", 3_600),
        ("minutes", 60),
        ("seconds", 1),
    ];
    let mut seconds: i64 = 0;
    for (name, scale) in UNITS {
        seconds = amount(name)?
            .checked_mul(scale)
            .and_then(|part| seconds.checked_add(part))
            .ok_or_else(out_of_range)?;
    }

    let duration = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;

    match captures.name("sign").map(|m| m.as_str()) {
        Some("-") => Ok(-duration),
        _ => Ok(duration),
    }
}

fn parse_reference(reference: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(reference)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RenderError::interpreter(format!("invalid reference time '{reference}': {e}")))
}

/// Compute `reference + offset` (wall clock when no reference is given).
pub fn from_now(offset: &str, reference: Option<&str>) -> Result<String> {
    let base = match reference {
        Some(r) => parse_reference(r)?,
        None => Utc::now(),
    };
    let shifted = base
        .checked_add_signed(parse_offset(offset)?)
        .ok_or_else(|| RenderError::interpreter(format!("time offset out of range '{offset}'")))?;
    Ok(format_timestamp(shifted))
}
