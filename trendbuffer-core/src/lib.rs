//! Streaming telemetry buffer for trendbuffer
//!
//! Maintains, per building-sensor point, a bounded-memory rolling window of
//! timestamped samples for downstream rule evaluation.
//!
//! Key constraints:
//! - Tolerates out-of-order and duplicate arrivals
//! - Online lossy compression bounds memory per point
//! - Incremental Kalman-style filters estimate data-quality signals
//! - Retention runs only at explicit checkpoints, never mid-stream
//!
//! ```
//! use chrono::{DateTime, Duration, Utc};
//! use trendbuffer_core::{Sample, TimeSeries};
//!
//! let mut series = TimeSeries::new("supply-air-temp-01", "°C").unwrap();
//! series.set_trend_interval(Some(300));
//!
//! let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
//! let outcome = series.add_point(&Sample::new_float(at, 21.5), true, true, true);
//! assert!(outcome.was_stored());
//!
//! // Quality flags are derived, never set directly.
//! series.set_status(at + Duration::seconds(60));
//! assert!(series.get_status().is_valid() || !series.has_twin());
//! ```
//!
//! A single instance is owned by exactly one writer; cross-point parallelism
//! comes from sharding instances, not from locking inside one. Persistence is
//! an external collaborator: the whole series (buffer, compression state and
//! estimator states) serializes as one unit via serde.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod compress;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod sample;
pub mod series;
pub mod time;
pub mod units;

// Public API
pub use buffer::{AddOutcome, TimeSeriesBuffer};
pub use compress::{Compressor, CompressorState};
pub use errors::SeriesError;
pub use filters::{BinaryKalman, Kalman, ScalarKalman};
pub use sample::{Sample, SampleValue};
pub use series::{TimeSeries, TimeSeriesStatus};
pub use time::Timestamp;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
