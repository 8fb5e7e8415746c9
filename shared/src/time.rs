use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Parses an IANA timezone name, falling back to UTC when it is unknown.
///
/// # Example
///```
/// use shared::time::parse_timezone;
/// assert_eq!(parse_timezone("America/Bogota"), chrono_tz::America::Bogota);
/// assert_eq!(parse_timezone("Mars/Olympus"), chrono_tz::UTC);
/// ```
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = %name, "Invalid timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Wall-clock time of `ts` in `timezone`.
///
/// Shift timestamps travel as UTC; anything that depends on the hour of day
/// (journey bands, report columns) must go through this first.
pub fn localize(ts: DateTime<Utc>, timezone: Tz) -> NaiveDateTime {
    ts.with_timezone(&timezone).naive_local()
}
