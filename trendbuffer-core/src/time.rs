//! Time handling for telemetry samples
//!
//! Samples carry wall-clock instants supplied by the ingestion collaborator;
//! nothing in this crate reads a clock of its own. `SetStatus` and the
//! retention checkpoint both take `now` as a parameter so behavior stays
//! deterministic and replayable.

use chrono::{DateTime, Duration, Utc};

/// Wall-clock instant attached to every sample
pub type Timestamp = DateTime<Utc>;

/// Minimum representable instant, used as a rejected sentinel
pub const MIN_INSTANT: Timestamp = DateTime::<Utc>::MIN_UTC;

/// Maximum representable instant, used as a rejected sentinel
pub const MAX_INSTANT: Timestamp = DateTime::<Utc>::MAX_UTC;

/// True when both instants fall on the same calendar day (UTC)
pub fn same_calendar_day(a: Timestamp, b: Timestamp) -> bool {
    a.date_naive() == b.date_naive()
}

/// Elapsed seconds from `earlier` to `later`, negative when reversed
pub fn seconds_between(earlier: Timestamp, later: Timestamp) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Convert fractional seconds back to a `Duration` (millisecond precision)
pub fn duration_from_seconds(seconds: f64) -> Duration {
    Duration::milliseconds((seconds * 1000.0) as i64)
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub(crate) mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(d)?;
        Ok(Duration::milliseconds(ms))
    }
}

/// Serde adapter storing an `Option<Duration>` as whole milliseconds
pub(crate) mod opt_duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.num_milliseconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let ms = Option::<i64>::deserialize(d)?;
        Ok(ms.map(Duration::milliseconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn day_boundary() {
        // 1_700_000_000 = 2023-11-14 22:13:20 UTC
        let t = at(1_700_000_000);
        assert!(same_calendar_day(t, t + Duration::minutes(30)));
        assert!(!same_calendar_day(t, t + Duration::hours(3)));
    }

    #[test]
    fn seconds_are_fractional() {
        let t = at(1_700_000_000);
        assert_eq!(seconds_between(t, t + Duration::milliseconds(1500)), 1.5);
        assert_eq!(seconds_between(t + Duration::seconds(10), t), -10.0);
    }

    #[test]
    fn sentinels_are_extremes() {
        assert!(MIN_INSTANT < at(0));
        assert!(MAX_INSTANT > at(4_000_000_000));
    }
}
