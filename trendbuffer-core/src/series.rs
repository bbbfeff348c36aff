//! Per-point telemetry series
//!
//! ## Overview
//!
//! [`TimeSeries`] wraps one telemetry point's [`TimeSeriesBuffer`] with the
//! metadata and running statistics that describe the point itself: identity
//! fields linking it to a digital twin, min/max/average accumulators, and
//! the Kalman-filtered data-quality estimators that drive the health flags
//! surfaced through [`TimeSeriesStatus`].
//!
//! ## Health flags
//!
//! Four independent conditions are evaluated at [`TimeSeries::set_status`]
//! checkpoints, never per sample:
//!
//! - **Offline**: no data within the expected reporting window
//! - **Stuck**: a sensor that has reported the same non-zero value for a
//!   long run of samples
//! - **Value out of range**: smoothed physical-plausibility failures
//! - **Period out of range**: reporting much faster or slower than the
//!   configured trend interval
//!
//! The out-of-range flag is smoothed through a [`BinaryKalman`] so a single
//! spurious reading cannot flip a point unhealthy, but every individual
//! out-of-range sample is still refused storage.
//!
//! ## Serialization
//!
//! The whole series serializes with `serde`, estimator state included, so a
//! reloaded process resumes smoothing exactly where it left off. Only the
//! compressor configuration is skipped; it is re-derived from the model.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    buffer::{AddOutcome, TimeSeriesBuffer},
    compress::Compressor,
    constants::{
        GENERIC_SENSOR_MODEL, OFFLINE_MAX_AGE_DAYS, OFFLINE_PERIOD_MULTIPLIER,
        PERIOD_HIGH_FRACTION, PERIOD_LOW_FRACTION, STUCK_MIN_SAMPLES, UNUSED_SERIES_MAX_POINTS,
    },
    errors::SeriesError,
    filters::{BinaryKalman, Kalman, ScalarKalman},
    sample::Sample,
    time::{duration_from_seconds, duration_millis, seconds_between, Timestamp, MAX_INSTANT,
        MIN_INSTANT},
    units,
};

/// Model suffixes whose points legitimately sit at one value for long runs
const STUCK_EXEMPT_MODEL_SUFFIXES: &[&str] = &["Actuator;1", "Setpoint;1", "Energy;1"];

/// Refrigerant pressure telemetry is noisy enough that the default
/// tolerance barely compresses it; these points get a wider corridor.
const HIGH_NOISE_MODEL_SUFFIX: &str = "RefrigerantPressureSensor;1";
const HIGH_NOISE_TOLERANCE: f64 = 0.3;

/// Health flags for a series, combinable as a bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeriesStatus(u8);

impl TimeSeriesStatus {
    /// No problems detected
    pub const VALID: Self = Self(0);
    /// No data within the expected reporting window
    pub const OFFLINE: Self = Self(1 << 0);
    /// Same non-zero value reported for a long run of samples
    pub const STUCK: Self = Self(1 << 1);
    /// Smoothed physical-plausibility estimator above its benchmark
    pub const VALUE_OUT_OF_RANGE: Self = Self(1 << 2);
    /// Reporting period far from the configured trend interval
    pub const PERIOD_OUT_OF_RANGE: Self = Self(1 << 3);
    /// Point is not linked to any twin
    pub const NO_TWIN: Self = Self(1 << 4);

    /// Empty flag set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Set the given flag(s)
    pub fn set(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    /// True when all of `flag`'s bits are present
    pub fn contains(&self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// True when no health flag is raised
    pub fn is_valid(&self) -> bool {
        self.0 == 0
    }

    /// Raw bits
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl Default for TimeSeriesStatus {
    fn default() -> Self {
        Self::VALID
    }
}

/// One telemetry point's buffered history, statistics and health state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeries {
    /// External point id (timeseries id from the ingestion pipeline)
    id: String,
    /// Twin linked to this point, empty until mapped
    twin_id: String,
    /// Ontology model of the linked twin
    model_id: String,
    /// Connector that delivers this point
    connector_id: String,
    /// Point id on the connector side
    external_id: String,
    /// Expected reporting interval in seconds, from twin metadata
    trend_interval: Option<u32>,
    /// Earliest timestamp ever observed
    earliest_seen: Timestamp,
    /// Latest timestamp ever observed, including refused samples
    last_seen: Timestamp,
    /// Count of accepted numeric samples over the series lifetime,
    /// surviving compression and retention
    total_values_processed: u64,
    buffer: TimeSeriesBuffer,
    /// Smoothed reporting period, fed by observed gaps
    period_estimator: Option<Kalman>,
    #[serde(with = "duration_millis")]
    estimated_period: Duration,
    /// Smoothed rate of physically implausible readings
    value_out_of_range_estimator: Option<BinaryKalman>,
    /// Smoothed ingestion latency
    latency_estimator: Option<ScalarKalman>,
    #[serde(with = "duration_millis")]
    latency: Duration,
    average_value: Option<f64>,
    last_value_float: Option<f64>,
    last_value_bool: Option<bool>,
    last_value_text: Option<String>,
    /// Running max over accepted numeric samples. Sentinel until the first
    /// numeric value arrives.
    max_value: f64,
    /// Running min over accepted numeric samples
    min_value: f64,
    /// Running total, stops accumulating once it overflows to non-finite
    total_value: f64,
    is_value_out_of_range: bool,
    is_period_out_of_range: bool,
    is_stuck: bool,
    is_offline: bool,
    compression_enabled: bool,
    /// Derived from the model, not persisted
    #[serde(skip)]
    compressor: Compressor,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self {
            id: String::new(),
            twin_id: String::new(),
            model_id: String::new(),
            connector_id: String::new(),
            external_id: String::new(),
            trend_interval: None,
            earliest_seen: MAX_INSTANT,
            last_seen: MIN_INSTANT,
            total_values_processed: 0,
            buffer: TimeSeriesBuffer::default(),
            period_estimator: None,
            estimated_period: Duration::zero(),
            value_out_of_range_estimator: None,
            latency_estimator: None,
            latency: Duration::zero(),
            average_value: None,
            last_value_float: None,
            last_value_bool: None,
            last_value_text: None,
            max_value: -1.0e300,
            min_value: 1.0e300,
            total_value: 0.0,
            is_value_out_of_range: false,
            is_period_out_of_range: false,
            is_stuck: false,
            is_offline: false,
            compression_enabled: true,
            compressor: Compressor::default(),
        }
    }
}

impl TimeSeries {
    /// New series for a point id and unit of measure.
    ///
    /// Series start capped at a handful of retained points; see
    /// [`set_used_by_rule`](Self::set_used_by_rule).
    pub fn new(id: impl Into<String>, unit_of_measure: impl Into<String>) -> Result<Self, SeriesError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SeriesError::EmptyId);
        }
        let mut buffer = TimeSeriesBuffer::new(unit_of_measure);
        buffer.set_max_buffer_count(Some(UNUSED_SERIES_MAX_POINTS));
        Ok(Self { id, buffer, ..Self::default() })
    }

    /// Point id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Linked twin id, empty until mapped
    pub fn twin_id(&self) -> &str {
        &self.twin_id
    }

    /// Ontology model of the linked twin
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Connector delivering this point
    pub fn connector_id(&self) -> &str {
        &self.connector_id
    }

    /// Point id on the connector side
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Unit of measure
    pub fn unit_of_measure(&self) -> &str {
        self.buffer.unit_of_measure()
    }

    /// Underlying sample buffer
    pub fn buffer(&self) -> &TimeSeriesBuffer {
        &self.buffer
    }

    /// Underlying sample buffer, mutable
    pub fn buffer_mut(&mut self) -> &mut TimeSeriesBuffer {
        &mut self.buffer
    }

    /// Earliest timestamp ever observed
    pub fn earliest_seen(&self) -> Timestamp {
        self.earliest_seen
    }

    /// Latest timestamp ever observed, including refused samples
    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    /// Count of accepted numeric samples over the series lifetime
    pub fn total_values_processed(&self) -> u64 {
        self.total_values_processed
    }

    /// Smoothed reporting period
    pub fn estimated_period(&self) -> Duration {
        self.estimated_period
    }

    /// Smoothed ingestion latency
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Running average over accepted numeric samples
    pub fn average_value(&self) -> Option<f64> {
        self.average_value
    }

    /// Running min over accepted numeric samples, if any arrived
    pub fn min_value(&self) -> Option<f64> {
        (self.min_value <= self.max_value).then_some(self.min_value)
    }

    /// Running max over accepted numeric samples, if any arrived
    pub fn max_value(&self) -> Option<f64> {
        (self.min_value <= self.max_value).then_some(self.max_value)
    }

    /// Most recent accepted float value
    pub fn last_value_float(&self) -> Option<f64> {
        self.last_value_float
    }

    /// Most recent accepted bool value
    pub fn last_value_bool(&self) -> Option<bool> {
        self.last_value_bool
    }

    /// Most recent accepted text value
    pub fn last_value_text(&self) -> Option<&str> {
        self.last_value_text.as_deref()
    }

    /// True when the point is mapped to a twin
    pub fn has_twin(&self) -> bool {
        !self.twin_id.is_empty()
    }

    /// Link the point to a twin and pick the compression tolerance for its
    /// model
    pub fn set_twin(&mut self, twin_id: impl Into<String>, model_id: impl Into<String>) {
        self.twin_id = twin_id.into();
        self.model_id = model_id.into();
        self.set_compression_for_model();
    }

    /// Record the connector identity for this point
    pub fn set_connector(&mut self, connector_id: impl Into<String>, external_id: impl Into<String>) {
        self.connector_id = connector_id.into();
        self.external_id = external_id.into();
    }

    /// Expected reporting interval in seconds, from twin metadata
    pub fn set_trend_interval(&mut self, trend_interval: Option<u32>) {
        self.trend_interval = trend_interval;
    }

    /// Lift the unused-series retention cap: a rule now reads this point
    /// and needs real history.
    pub fn set_used_by_rule(&mut self) {
        self.buffer.set_max_buffer_count(None);
    }

    /// Override the compression tolerance
    pub fn set_compression(&mut self, tolerance: f64) {
        self.compressor = Compressor::new(tolerance);
    }

    /// Pick the compression tolerance from the twin model
    pub fn set_compression_for_model(&mut self) {
        if self.model_id.ends_with(HIGH_NOISE_MODEL_SUFFIX) {
            self.compressor = Compressor::new(HIGH_NOISE_TOLERANCE);
        } else {
            self.compressor = Compressor::default();
        }
    }

    /// Stop compressing and drop the live corridor state. Existing points
    /// are untouched.
    pub fn disable_compression(&mut self) {
        self.compression_enabled = false;
        *self.buffer.compression_state_mut() = None;
    }

    /// Start the out-of-range estimator, provided the unit carries
    /// plausibility bounds. If the unit/model no longer has a range (a unit
    /// change, say) the estimator and its flag are cleared: text points
    /// never feed the filter, so a stale one would hold its flag forever.
    pub fn enable_validation(&mut self) {
        if units::has_range(self.buffer.unit_of_measure(), &self.model_id) {
            if self.value_out_of_range_estimator.is_none() {
                self.value_out_of_range_estimator = Some(BinaryKalman::default());
            }
        } else {
            self.value_out_of_range_estimator = None;
            self.is_value_out_of_range = false;
        }
    }

    /// Stop out-of-range estimation and clear the flag
    pub fn disable_validation(&mut self) {
        self.value_out_of_range_estimator = None;
        self.is_value_out_of_range = false;
    }

    /// Start estimating the reporting period from observed gaps
    pub fn enable_estimated_period(&mut self) {
        if self.period_estimator.is_none() {
            self.period_estimator = Some(Kalman::default());
        }
    }

    /// Stop period estimation and forget the estimate
    pub fn disable_estimated_period(&mut self) {
        self.period_estimator = None;
        self.estimated_period = Duration::zero();
        self.is_period_out_of_range = false;
    }

    /// Stop latency estimation
    pub fn disable_latency_estimator(&mut self) {
        self.latency_estimator = None;
    }

    /// Fold one observed ingestion delay into the smoothed latency
    pub fn set_latency_estimate(&mut self, observed: Duration) {
        let seconds = observed.num_milliseconds() as f64 / 1000.0;
        let estimator = self
            .latency_estimator
            .get_or_insert_with(|| ScalarKalman::new(self.latency.num_milliseconds() as f64 / 1000.0));
        let estimate = estimator.update(seconds);
        self.latency = duration_from_seconds(estimate);
    }

    /// Offer one sample to the series.
    ///
    /// `apply_compression` requests compressed insertion for this call; it
    /// is honored only while compression is enabled on the series, so a
    /// caller replaying raw history can force verbatim inserts.
    ///
    /// With `include_quality_check` the data-quality estimators are
    /// auto-enabled and a physically implausible reading is refused: it
    /// advances [`last_seen`](Self::last_seen) (the point did report) but is
    /// not stored and does not count as processed. Without it the filter
    /// still observes the reading but the sample is stored regardless.
    ///
    /// `re_apply_compression` permits the buffer's once-per-day re-tiering
    /// pass; pass false when replaying history.
    pub fn add_point(
        &mut self,
        sample: &Sample,
        apply_compression: bool,
        include_quality_check: bool,
        re_apply_compression: bool,
    ) -> AddOutcome {
        if !sample.is_valid() {
            return AddOutcome::Rejected;
        }

        if include_quality_check {
            self.enable_validation();
            self.enable_estimated_period();
        }

        if let (Some(estimator), Some(value)) =
            (&mut self.value_out_of_range_estimator, sample.value_float())
        {
            let out_of_range =
                units::is_out_of_range(self.buffer.unit_of_measure(), &self.model_id, value);
            estimator.update(out_of_range);
            if out_of_range && include_quality_check {
                if sample.timestamp > self.last_seen {
                    self.last_seen = sample.timestamp;
                }
                return AddOutcome::OutOfRange;
            }
        }

        let outcome = self.buffer.add_point(
            sample,
            apply_compression && self.compression_enabled,
            &self.compressor,
            re_apply_compression,
        );

        if outcome.was_stored() {
            self.update_counters(sample);
        }

        outcome
    }

    fn update_counters(&mut self, sample: &Sample) {
        if sample.timestamp < self.earliest_seen {
            self.earliest_seen = sample.timestamp;
        }
        if sample.timestamp > self.last_seen {
            self.last_seen = sample.timestamp;
        }

        if let Some(text) = sample.value_text() {
            self.last_value_text = Some(text.to_string());
        }
        if let Some(value) = sample.value_bool() {
            self.last_value_bool = Some(value);
        }

        let numeric = match (sample.value_float(), sample.value_bool()) {
            (Some(v), _) => {
                self.last_value_float = Some(v);
                Some(v)
            }
            (None, Some(b)) => Some(if b { 1.0 } else { 0.0 }),
            (None, None) => None,
        };

        // Text-only samples track recency but never the numeric statistics;
        // counting them would dilute the average.
        if let Some(v) = numeric {
            self.total_values_processed += 1;
            if v > self.max_value {
                self.max_value = v;
            }
            if v < self.min_value {
                self.min_value = v;
            }
            if self.total_value.is_finite() {
                self.total_value += v;
                self.average_value = Some(self.total_value / self.total_values_processed as f64);
            }
        }

        let gap = self.buffer.last_gap();
        if gap > Duration::zero() {
            if let Some(estimator) = &mut self.period_estimator {
                let estimate = estimator.update(gap.num_milliseconds() as f64 / 1000.0);
                self.estimated_period = duration_from_seconds(estimate);
            }
        }
    }

    /// Re-evaluate the health flags against the clock. Called at
    /// checkpoints, never per sample.
    pub fn set_status(&mut self, now: Timestamp) {
        self.is_value_out_of_range = self
            .value_out_of_range_estimator
            .as_ref()
            .is_some_and(BinaryKalman::is_above_benchmark);

        self.is_stuck = self.compute_stuck();
        self.is_offline = self.compute_offline(now);
        self.is_period_out_of_range = self.compute_period_out_of_range();
    }

    /// Current health flags, as last evaluated by
    /// [`set_status`](Self::set_status)
    pub fn get_status(&self) -> TimeSeriesStatus {
        let mut status = TimeSeriesStatus::empty();
        if self.is_offline {
            status.set(TimeSeriesStatus::OFFLINE);
        }
        if self.is_stuck {
            status.set(TimeSeriesStatus::STUCK);
        }
        if self.is_value_out_of_range {
            status.set(TimeSeriesStatus::VALUE_OUT_OF_RANGE);
        }
        if self.is_period_out_of_range {
            status.set(TimeSeriesStatus::PERIOD_OUT_OF_RANGE);
        }
        if !self.has_twin() {
            status.set(TimeSeriesStatus::NO_TWIN);
        }
        status
    }

    /// Retention checkpoint on the underlying buffer. Returns the number of
    /// samples removed.
    pub fn apply_limits(
        &mut self,
        now: Timestamp,
        default_max_age: Duration,
        time_cap: Duration,
        can_remove_all_points: bool,
    ) -> usize {
        self.buffer.apply_limits(now, default_max_age, time_cap, can_remove_all_points)
    }

    fn compute_stuck(&self) -> bool {
        if self.total_values_processed <= STUCK_MIN_SAMPLES {
            return false;
        }
        // min==max never holds before the first numeric sample, and a sensor
        // pinned at exactly zero is more likely off than stuck
        if self.min_value != self.max_value || self.min_value == 0.0 {
            return false;
        }
        if self.buffer.unit_of_measure().eq_ignore_ascii_case("bool") {
            return false;
        }
        if self.model_id == GENERIC_SENSOR_MODEL {
            return false;
        }
        if STUCK_EXEMPT_MODEL_SUFFIXES.iter().any(|s| self.model_id.ends_with(s)) {
            return false;
        }
        true
    }

    fn compute_offline(&self, now: Timestamp) -> bool {
        if self.last_seen == MIN_INSTANT {
            return false;
        }
        // Text points come from irregular sources and have no cadence
        if self.last_value_text.is_some() && self.last_value_float.is_none() {
            return false;
        }
        let gap = now - self.last_seen;
        if gap > Duration::days(OFFLINE_MAX_AGE_DAYS) {
            return true;
        }
        if let Some(trend_interval) = self.trend_interval {
            let expected = (trend_interval as f64)
                .max(self.estimated_period.num_milliseconds() as f64 / 1000.0);
            let gap_seconds = seconds_between(self.last_seen, now);
            if expected > 0.0 && gap_seconds > OFFLINE_PERIOD_MULTIPLIER * expected {
                return true;
            }
        }
        false
    }

    fn compute_period_out_of_range(&self) -> bool {
        if self.total_values_processed <= 1 {
            return false;
        }
        let Some(trend_interval) = self.trend_interval else {
            return false;
        };
        if self.estimated_period <= Duration::zero() {
            return false;
        }
        let expected = trend_interval as f64;
        let estimated = self.estimated_period.num_milliseconds() as f64 / 1000.0;
        estimated < PERIOD_LOW_FRACTION * expected || estimated > PERIOD_HIGH_FRACTION * expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(secs: i64) -> Timestamp {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn temp_series() -> TimeSeries {
        let mut series = TimeSeries::new("supply-air-temp-01", "°C").unwrap();
        series.set_twin("AHU-1-SAT", "dtmi:com:buildingtwin:TemperatureSensor;1");
        series.set_used_by_rule();
        series
    }

    #[test]
    fn empty_id_refused() {
        assert!(matches!(TimeSeries::new("", "°C"), Err(SeriesError::EmptyId)));
        assert!(matches!(TimeSeries::new("   ", "°C"), Err(SeriesError::EmptyId)));
    }

    #[test]
    fn counters_track_accepted_samples() {
        let mut series = temp_series();
        for (i, v) in [20.0, 21.0, 19.5, 22.0].iter().enumerate() {
            series.add_point(&Sample::new_float(at(i as i64 * 60), *v), true, false, false);
        }
        assert_eq!(series.total_values_processed(), 4);
        assert_eq!(series.min_value(), Some(19.5));
        assert_eq!(series.max_value(), Some(22.0));
        assert_eq!(series.average_value(), Some(82.5 / 4.0));
        assert_eq!(series.last_value_float(), Some(22.0));
        assert_eq!(series.earliest_seen(), at(0));
        assert_eq!(series.last_seen(), at(180));
    }

    #[test]
    fn duplicates_do_not_count() {
        let mut series = temp_series();
        let sample = Sample::new_float(at(0), 20.0);
        assert!(series.add_point(&sample, true, false, false).was_stored());
        assert_eq!(series.add_point(&sample, true, false, false), AddOutcome::DuplicateDropped);
        assert_eq!(series.total_values_processed(), 1);
    }

    #[test]
    fn out_of_range_sample_refused_but_advances_last_seen() {
        let mut series = temp_series();
        series.add_point(&Sample::new_float(at(0), 21.0), true, true, false);
        let outcome = series.add_point(&Sample::new_float(at(60), 4000.0), true, true, false);
        assert_eq!(outcome, AddOutcome::OutOfRange);
        assert_eq!(series.total_values_processed(), 1);
        assert_eq!(series.buffer().len(), 1);
        assert_eq!(series.last_seen(), at(60));
    }

    #[test]
    fn out_of_range_flag_needs_a_run_of_failures() {
        let mut series = temp_series();
        series.add_point(&Sample::new_float(at(0), 21.0), true, true, false);
        series.set_status(at(60));
        assert!(!series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));

        // One spurious reading does not flip the flag
        series.add_point(&Sample::new_float(at(60), 4000.0), true, true, false);
        series.set_status(at(120));
        assert!(!series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));

        for i in 2..6 {
            series.add_point(&Sample::new_float(at(i * 60), 4000.0), true, true, false);
        }
        series.set_status(at(400));
        assert!(series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));
    }

    #[test]
    fn validation_recovers_after_good_data() {
        let mut series = temp_series();
        for i in 0..5 {
            series.add_point(&Sample::new_float(at(i * 60), 4000.0), true, true, false);
        }
        series.set_status(at(300));
        assert!(series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));

        for i in 5..25 {
            series.add_point(&Sample::new_float(at(i * 60), 21.0 + (i % 3) as f64), true, true, false);
        }
        series.set_status(at(25 * 60));
        assert!(!series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));
    }

    #[test]
    fn stuck_needs_more_than_threshold_samples() {
        let mut series = temp_series();
        for i in 0..50 {
            series.add_point(&Sample::new_float(at(i * 60), 21.5), true, false, false);
        }
        series.set_status(at(50 * 60));
        assert!(!series.get_status().contains(TimeSeriesStatus::STUCK));

        series.add_point(&Sample::new_float(at(50 * 60), 21.5), true, false, false);
        series.set_status(at(51 * 60));
        assert!(series.get_status().contains(TimeSeriesStatus::STUCK));
    }

    #[test]
    fn stuck_exemptions() {
        // Setpoints legitimately hold a value
        let mut setpoint = TimeSeries::new("sp-1", "°C").unwrap();
        setpoint.set_twin("SP-1", "dtmi:com:buildingtwin:TemperatureSetpoint;1");
        // Zero looks more like off than stuck
        let mut zeroed = temp_series();
        // Bool points flip rarely by nature
        let mut boolean = TimeSeries::new("b-1", "bool").unwrap();
        boolean.set_twin("B-1", "dtmi:com:buildingtwin:OccupancySensor;1");
        boolean.set_used_by_rule();

        for i in 0..60 {
            setpoint.add_point(&Sample::new_float(at(i * 60), 21.5), true, false, false);
            zeroed.add_point(&Sample::new_float(at(i * 60), 0.0), true, false, false);
            boolean.add_point(&Sample::new_bool(at(i * 120), true), true, false, false);
        }
        setpoint.set_status(at(60 * 60));
        zeroed.set_status(at(60 * 60));
        boolean.set_status(at(60 * 120));
        assert!(!setpoint.get_status().contains(TimeSeriesStatus::STUCK));
        assert!(!zeroed.get_status().contains(TimeSeriesStatus::STUCK));
        assert!(!boolean.get_status().contains(TimeSeriesStatus::STUCK));
    }

    #[test]
    fn offline_when_gap_exceeds_expected_period() {
        let mut series = temp_series();
        series.set_trend_interval(Some(60));
        series.add_point(&Sample::new_float(at(0), 21.0), true, true, false);
        series.add_point(&Sample::new_float(at(60), 21.5), true, true, false);

        series.set_status(at(300));
        assert!(!series.get_status().contains(TimeSeriesStatus::OFFLINE));

        // 650s silent with a 60s expected period crosses the 10x multiplier
        series.set_status(at(60 + 650));
        assert!(series.get_status().contains(TimeSeriesStatus::OFFLINE));
    }

    #[test]
    fn offline_after_a_week_regardless_of_interval() {
        let mut series = temp_series();
        series.add_point(&Sample::new_float(at(0), 21.0), true, false, false);
        series.set_status(at(8 * 86_400));
        assert!(series.get_status().contains(TimeSeriesStatus::OFFLINE));
    }

    #[test]
    fn never_offline_without_data() {
        let mut series = temp_series();
        series.set_status(at(8 * 86_400));
        assert!(!series.get_status().contains(TimeSeriesStatus::OFFLINE));
    }

    #[test]
    fn period_out_of_range_when_reporting_slow() {
        let mut series = temp_series();
        series.set_trend_interval(Some(60));
        // Reporting every 5 minutes against a 60s interval
        for i in 0..5 {
            series.add_point(&Sample::new_float(at(i * 300), 21.0 + i as f64), true, true, false);
        }
        series.set_status(at(5 * 300));
        assert!(series.get_status().contains(TimeSeriesStatus::PERIOD_OUT_OF_RANGE));

        series.disable_estimated_period();
        series.set_status(at(5 * 300));
        assert!(!series.get_status().contains(TimeSeriesStatus::PERIOD_OUT_OF_RANGE));
    }

    #[test]
    fn no_twin_flag_clears_on_mapping() {
        let mut series = TimeSeries::new("p-1", "°C").unwrap();
        assert!(series.get_status().contains(TimeSeriesStatus::NO_TWIN));
        series.set_twin("T-1", "dtmi:com:buildingtwin:TemperatureSensor;1");
        assert!(!series.get_status().contains(TimeSeriesStatus::NO_TWIN));
    }

    #[test]
    fn model_picks_compression_tolerance() {
        let mut series = TimeSeries::new("p-1", "kPa").unwrap();
        series.set_twin("T-1", "dtmi:com:buildingtwin:RefrigerantPressureSensor;1");
        assert_eq!(series.compressor.tolerance(), HIGH_NOISE_TOLERANCE);
        series.set_twin("T-1", "dtmi:com:buildingtwin:TemperatureSensor;1");
        assert_eq!(series.compressor.tolerance(), crate::constants::DEFAULT_TOLERANCE);
    }

    #[test]
    fn unused_series_stays_tiny() {
        let mut series = TimeSeries::new("p-1", "°C").unwrap();
        for i in 0..20 {
            series.add_point(&Sample::new_float(at(i * 60), 20.0 + i as f64), true, false, false);
        }
        series.apply_limits(at(20 * 60), Duration::days(1), Duration::days(30), false);
        assert!(series.buffer().len() <= UNUSED_SERIES_MAX_POINTS);
        // Lifetime counter survives retention
        assert_eq!(series.total_values_processed(), 20);
    }

    #[test]
    fn latency_estimate_smooths_observations() {
        let mut series = temp_series();
        series.set_latency_estimate(Duration::seconds(10));
        let first = series.latency();
        assert!(first > Duration::zero());
        series.set_latency_estimate(Duration::seconds(10));
        series.set_latency_estimate(Duration::seconds(10));
        let settled = series.latency();
        assert!(settled <= Duration::seconds(10));
        assert!(settled > first);

        series.disable_latency_estimator();
        series.set_latency_estimate(Duration::seconds(2));
        assert!(series.latency() < settled);
    }

    #[test]
    fn text_samples_track_without_numeric_stats() {
        let mut series = TimeSeries::new("mode-1", "no unit").unwrap();
        series.set_used_by_rule();
        series.add_point(&Sample::new_text(at(0), "Heating"), true, false, false);
        series.add_point(&Sample::new_text(at(60), "Cooling"), true, false, false);
        assert_eq!(series.last_value_text(), Some("Cooling"));
        assert_eq!(series.min_value(), None);
        assert_eq!(series.average_value(), None);
        assert_eq!(series.total_values_processed(), 0);
        assert_eq!(series.buffer().len(), 2);
        series.set_status(at(8 * 86_400));
        assert!(!series.get_status().contains(TimeSeriesStatus::OFFLINE));
    }

    #[test]
    fn per_call_flag_forces_uncompressed_insert() {
        let mut series = temp_series();
        // A steady ramp would collapse under compression
        for i in 0..20 {
            series.add_point(&Sample::new_float(at(i * 60), i as f64), false, false, false);
        }
        assert_eq!(series.buffer().len(), 20);

        let mut compressed = temp_series();
        for i in 0..20 {
            compressed.add_point(&Sample::new_float(at(i * 60), i as f64), true, false, false);
        }
        assert!(compressed.buffer().len() < 20);
    }

    #[test]
    fn text_samples_do_not_dilute_average() {
        let mut series = TimeSeries::new("mixed-1", "°C").unwrap();
        series.set_used_by_rule();
        series.add_point(&Sample::new_float(at(0), 10.0), true, false, false);
        series.add_point(&Sample::new_text(at(60), "Fault"), true, false, false);
        series.add_point(&Sample::new_float(at(120), 10.0), true, false, false);
        assert_eq!(series.average_value(), Some(10.0));
        assert_eq!(series.total_values_processed(), 2);
        assert_eq!(series.last_value_text(), Some("Fault"));
    }

    #[test]
    fn unit_change_clears_stale_out_of_range_flag() {
        let mut series = temp_series();
        for i in 0..5 {
            series.add_point(&Sample::new_float(at(i * 60), 4000.0), true, true, false);
        }
        series.set_status(at(300));
        assert!(series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));

        // Point metadata is corrected to an unbounded unit; the next
        // quality-checked ingest must drop the estimator with its flag
        series.buffer_mut().set_unit_of_measure("no unit");
        series.add_point(&Sample::new_float(at(6 * 60), 4000.0), true, true, false);
        series.set_status(at(7 * 60));
        assert!(!series.get_status().contains(TimeSeriesStatus::VALUE_OUT_OF_RANGE));
    }

    #[test]
    fn refusal_requires_quality_check() {
        let mut series = temp_series();
        // Enables the estimator
        series.add_point(&Sample::new_float(at(0), 21.0), true, true, false);

        // Without the quality check the reading is stored, the estimator
        // merely observes it
        let outcome = series.add_point(&Sample::new_float(at(60), 4000.0), true, false, false);
        assert!(outcome.was_stored());
        assert_eq!(series.buffer().len(), 2);
        assert_eq!(series.max_value(), Some(4000.0));

        // With the check back on the next implausible reading is refused
        assert_eq!(
            series.add_point(&Sample::new_float(at(120), 4000.0), true, true, false),
            AddOutcome::OutOfRange
        );
        assert_eq!(series.buffer().len(), 2);
    }

    #[test]
    fn serde_round_trip_preserves_estimators() {
        let mut series = temp_series();
        series.set_trend_interval(Some(60));
        for i in 0..10 {
            series.add_point(&Sample::new_float(at(i * 60), 20.0 + (i % 4) as f64), true, true, false);
        }
        series.set_latency_estimate(Duration::seconds(3));

        let json = serde_json::to_string(&series).unwrap();
        let restored: TimeSeries = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id(), series.id());
        assert_eq!(restored.total_values_processed(), series.total_values_processed());
        assert_eq!(restored.buffer().len(), series.buffer().len());
        assert_eq!(restored.estimated_period(), series.estimated_period());
        assert_eq!(restored.latency(), series.latency());
        assert_eq!(restored.min_value(), series.min_value());
        assert_eq!(restored.last_seen(), series.last_seen());
    }
}
