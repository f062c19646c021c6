//! Timespan parsing (spec component C1).
//!
//! Turns the three optional query-string-ish inputs `(end, start, bucket)`
//! into millisecond-epoch integers, the same job
//! `original_source/src/server/handlers/api.go`'s `parseTimespanStrings`
//! does for the Go implementation this crate generalizes.

use std::fmt;

/// Default lookback window applied when `start` is omitted.
pub const DEFAULT_START_OFFSET: &str = "-8h";

/// Default query row/bucket cap (spec §4.3 "Limits").
pub const DEFAULT_LIMIT: i64 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimespanParseError(pub String);

impl fmt::Display for TimespanParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timespan parse error: {}", self.0)
    }
}

impl std::error::Error for TimespanParseError {}

fn unit_ms(unit: &str) -> Option<i64> {
    Some(match unit {
        "ms" => 1,
        "s" => 1_000,
        "mn" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 604_800_000,
        "y" => 31_536_000_000,
        _ => return None,
    })
}

/// Parse one timespan token. `now_ms` is the reference wall-clock time used
/// to resolve relative durations; it is threaded in explicitly (rather than
/// calling a clock internally) so the parser stays pure and testable.
fn parse_token(raw: &str, now_ms: i64) -> Result<i64, TimespanParseError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(TimespanParseError("empty timespan token".to_string()));
    }

    // Absolute: a bare (optionally signed) integer is a Unix-ms timestamp.
    if let Ok(ms) = token.parse::<i64>() {
        return Ok(ms);
    }

    // Relative: `-?\d+(ms|s|mn|h|d|w|y)`.
    let (sign, rest) = match token.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => match token.strip_prefix('+') {
            Some(rest) => (1i64, rest),
            // A missing sign is treated as negative (spec §4.1).
            None => (-1i64, token),
        },
    };

    let split_at = rest.find(|c: char| !c.is_ascii_digit());
    let Some(split_at) = split_at else {
        return Err(TimespanParseError(format!("malformed timespan token: {raw}")));
    };
    let (digits, unit) = rest.split_at(split_at);
    if digits.is_empty() {
        return Err(TimespanParseError(format!("malformed timespan token: {raw}")));
    }
    let magnitude: i64 = digits
        .parse()
        .map_err(|_| TimespanParseError(format!("malformed timespan token: {raw}")))?;
    let unit_ms = unit_ms(unit).ok_or_else(|| {
        TimespanParseError(format!("unknown timespan unit '{unit}' in token: {raw}"))
    })?;

    Ok(now_ms + sign * magnitude * unit_ms)
}

/// Resolved `(end_ms, start_ms, bucket_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    pub end_ms: i64,
    pub start_ms: i64,
    pub bucket_ms: i64,
}

/// Parse the three timespan fields per spec §4.1.
///
/// `default_start_offset` is the configured relative duration used when
/// `start` is absent (default `-8h`, spec §4.1).
pub fn parse_timespan(
    end: Option<&str>,
    start: Option<&str>,
    bucket: Option<&str>,
    now_ms: i64,
    default_start_offset: &str,
) -> Result<Timespan, TimespanParseError> {
    let end_ms = match end {
        Some(raw) if !raw.trim().is_empty() => parse_token(raw, now_ms)?,
        _ => now_ms,
    };

    let start_ms = match start {
        Some(raw) if !raw.trim().is_empty() => parse_token(raw, end_ms)?,
        _ => parse_token(default_start_offset, end_ms)?,
    };

    let bucket_ms = match bucket {
        Some(raw) if !raw.trim().is_empty() => {
            let value: i64 = raw.trim().parse().map_err(|_| {
                TimespanParseError(format!("malformed bucket duration: {raw}"))
            })?;
            if value < 0 {
                return Err(TimespanParseError(format!(
                    "bucket duration must be non-negative: {raw}"
                )));
            }
            value
        }
        _ => 0,
    };

    if start_ms >= end_ms {
        return Err(TimespanParseError(format!(
            "start ({start_ms}) must be before end ({end_ms})"
        )));
    }

    Ok(Timespan {
        end_ms,
        start_ms,
        bucket_ms,
    })
}

/// Coerce a raw `limit` query value to the effective limit, per spec §4.3:
/// "`limit < 1` is coerced to the default at the edge, not in the engine."
pub fn effective_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(value) if value >= 1 => value,
        _ => DEFAULT_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_end_with_relative_start() {
        // Scenario 4 from spec §8.
        let ts = parse_timespan(
            Some("1700000000000"),
            Some("-1h"),
            None,
            0,
            DEFAULT_START_OFFSET,
        )
        .unwrap();
        assert_eq!(ts.end_ms, 1_700_000_000_000);
        assert_eq!(ts.start_ms, 1_700_000_000_000 - 3_600_000);
        assert_eq!(ts.bucket_ms, 0);
    }

    #[test]
    fn defaults_end_to_now_and_start_to_default_offset() {
        let now = 10_000_000_000;
        let ts = parse_timespan(None, None, None, now, "-8h").unwrap();
        assert_eq!(ts.end_ms, now);
        assert_eq!(ts.start_ms, now - 8 * 3_600_000);
    }

    #[test]
    fn missing_sign_is_treated_as_negative() {
        let now = 1_000_000;
        let ts = parse_timespan(None, Some("30mn"), None, now, "-8h").unwrap();
        assert_eq!(ts.start_ms, now - 30 * 60_000);
    }

    #[test]
    fn explicit_plus_sign_is_honored() {
        let ts = parse_timespan(Some("+1h"), Some("0"), None, 0, "-8h").unwrap();
        assert_eq!(ts.end_ms, 3_600_000);
    }

    #[test]
    fn rejects_start_after_end() {
        let err = parse_timespan(Some("0"), Some("1h"), None, 0, "-8h").unwrap_err();
        assert!(err.0.contains("must be before"));
    }

    #[test]
    fn rejects_malformed_unit() {
        let err = parse_timespan(None, Some("-8q"), None, 0, "-8h").unwrap_err();
        assert!(err.0.contains("unknown timespan unit"));
    }

    #[test]
    fn rejects_empty_digits() {
        let err = parse_timespan(None, Some("-h"), None, 0, "-8h").unwrap_err();
        assert!(err.0.contains("malformed"));
    }

    #[test]
    fn zero_bucket_disables_aggregation() {
        let ts = parse_timespan(Some("1000"), Some("0"), None, 0, "-8h").unwrap();
        assert_eq!(ts.bucket_ms, 0);
    }

    #[test]
    fn nonzero_bucket_is_parsed_as_plain_ms_duration() {
        let ts = parse_timespan(Some("1000"), Some("0"), Some("500"), 0, "-8h").unwrap();
        assert_eq!(ts.bucket_ms, 500);
    }

    #[test]
    fn effective_limit_coerces_invalid_to_default() {
        assert_eq!(effective_limit(None), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some(-5)), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some(42)), 42);
    }
}
