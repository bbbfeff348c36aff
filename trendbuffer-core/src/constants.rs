//! Constants for trendbuffer-core
//!
//! Centralized, documented constants used throughout the crate. Values come
//! from building-telemetry operating experience; where a number is a tuning
//! choice rather than a hard requirement, the rationale is noted on the
//! constant itself.

// ===== DATA QUALITY =====

/// Number of processed samples required before a point can be called stuck.
///
/// Short plateaus are normal (night setback, unoccupied floors); only a
/// sensor that has never moved across this many samples is suspicious.
pub const STUCK_MIN_SAMPLES: u64 = 50;

/// A point with no data for longer than this is offline regardless of its
/// configured interval.
pub const OFFLINE_MAX_AGE_DAYS: i64 = 7;

/// Multiplier on the expected sampling period before a silent point is
/// declared offline. Telemetry routinely arrives a few periods late; ten
/// missed periods is not jitter.
pub const OFFLINE_PERIOD_MULTIPLIER: f64 = 10.0;

/// Estimated period below this fraction of the configured trend interval is
/// out of range (sensor chattering).
pub const PERIOD_LOW_FRACTION: f64 = 0.1;

/// Estimated period above this fraction of the configured trend interval is
/// out of range (sensor lagging).
pub const PERIOD_HIGH_FRACTION: f64 = 1.9;

/// Model id of the fully generic sensor, exempt from stuck detection.
pub const GENERIC_SENSOR_MODEL: &str = "dtmi:com:buildingtwin:Sensor;1";

// ===== COMPRESSION =====

/// Default compression tolerance: 5% of the observed value range.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Span between oldest and newest retained sample that triggers the
/// age-tiered re-compression pass.
pub const RECOMPRESS_MIN_SPAN_DAYS: i64 = 15;

/// Samples older than this keep the default tolerance in a re-compression
/// pass; beyond it the first aggressive tier applies.
pub const RECOMPRESS_TIER1_DAYS: i64 = 15;

/// Tolerance for samples aged 15-31 days.
pub const RECOMPRESS_TIER1_TOLERANCE: f64 = 0.5;

/// Age threshold for the second re-compression tier.
pub const RECOMPRESS_TIER2_DAYS: i64 = 31;

/// Tolerance for samples aged 31-60 days.
pub const RECOMPRESS_TIER2_TOLERANCE: f64 = 1.0;

/// Age threshold for the most aggressive re-compression tier.
pub const RECOMPRESS_TIER3_DAYS: i64 = 60;

/// Tolerance for samples older than 60 days.
pub const RECOMPRESS_TIER3_TOLERANCE: f64 = 5.0;

// ===== BUFFER SIZING =====

/// Fractional capacity growth step. Buffers grow in 5% increments rather
/// than doubling so that very large per-point buffers do not over-allocate.
pub const BUFFER_GROWTH_STEP: f64 = 0.05;

/// Minimum number of slots added per growth step.
pub const BUFFER_GROWTH_MIN: usize = 5;

// ===== RETENTION =====

/// Fallback count cap for callers that want a bound without a configured
/// per-point limit.
pub const DEFAULT_MAX_POINTS: usize = 2_500;

/// Points retained by a series that no rule consumes. Enough for last-value
/// and gap queries; marked used-by-rule points keep full history instead.
pub const UNUSED_SERIES_MAX_POINTS: usize = 3;

/// Grace period past the retention floor before a leading stale point may be
/// chopped even below the usual two-point minimum. Catches single points
/// orphaned months in the past.
pub const STALE_GRACE_DAYS: i64 = 7;

/// Minimum points a retention pass leaves behind unless the caller allows
/// removing everything.
pub const RETENTION_FLOOR: usize = 2;
