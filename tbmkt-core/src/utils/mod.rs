pub mod retry;

use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Current wall-clock time, UTC, as the naive timestamp type stored in
/// the database.
pub fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

/// Convert a client-supplied unix timestamp (seconds) to the stored
/// timestamp type. Returns `None` for values outside the representable
/// date range.
pub fn from_unix_seconds(secs: i64) -> Option<PrimitiveDateTime> {
    let at = OffsetDateTime::from_unix_timestamp(secs).ok()?;
    Some(PrimitiveDateTime::new(at.date(), at.time()))
}

/// Unix timestamp (seconds) of a stored timestamp.
pub fn to_unix_seconds(at: PrimitiveDateTime) -> i64 {
    at.assume_utc().unix_timestamp()
}

/// Minutes as a `time::Duration`, for config-driven timeouts.
pub fn minutes(mins: i64) -> Duration {
    Duration::minutes(mins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn unix_seconds_round_trip() {
        let at = datetime!(2026-03-01 12:30:45);
        let secs = to_unix_seconds(at);
        assert_eq!(from_unix_seconds(secs), Some(at));
    }

    #[test]
    fn rejects_out_of_range_timestamps() {
        assert_eq!(from_unix_seconds(i64::MAX), None);
    }

    #[test]
    fn cancellation_cutoff_is_timeout_minutes_back() {
        let now = datetime!(2026-03-01 12:30);
        assert_eq!(now - minutes(30), datetime!(2026-03-01 12:00));
    }
}
