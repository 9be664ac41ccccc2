use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as a canonical RFC 3339 UTC timestamp
///
/// Fixed millisecond precision and a `Z` suffix keep the representation
/// fixed-width, so lexical comparison of two timestamps matches their
/// chronological order.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Format a datetime in the canonical storage representation
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp (with arbitrary offset) into UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The `YYYY-MM-DD` day a canonical timestamp falls on
pub fn day_of(timestamp: &str) -> &str {
    &timestamp[..10.min(timestamp.len())]
}
