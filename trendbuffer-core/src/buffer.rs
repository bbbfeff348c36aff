//! Rolling sample buffer
//!
//! ## Overview
//!
//! [`TimeSeriesBuffer`] is the ordered container behind every series: an
//! append-mostly, time-ordered `Vec` of [`Sample`]s with compression-aware
//! insertion, rewind handling for replayed telemetry, range queries skewed
//! toward recent data, and two retention policies (max age, max count) that
//! run only at explicit checkpoints.
//!
//! ## Invariants
//!
//! - Samples are non-decreasing by timestamp. Disorder is detectable with
//!   [`TimeSeriesBuffer::check_in_order`] and self-healing via a stable
//!   [`TimeSeriesBuffer::sort`]; it is never fatal.
//! - A retention pass never drops the buffer below two points unless the
//!   caller explicitly allows removing everything (data known to be wholly
//!   stale).
//! - True duplicates (same value or same timestamp as the current last
//!   point) are dropped, never stored twice.
//!
//! ## Memory
//!
//! Capacity grows in 5% steps (minimum 5 slots) instead of doubling: a site
//! can hold tens of thousands of buffers and doubling a 10k-point `Vec` for
//! one more sample wastes real memory. Retention shrinks the allocation back
//! when it removed anything.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    compress::{Compressor, CompressorState},
    constants::{
        BUFFER_GROWTH_MIN, BUFFER_GROWTH_STEP, RECOMPRESS_MIN_SPAN_DAYS, RECOMPRESS_TIER1_DAYS,
        RECOMPRESS_TIER1_TOLERANCE, RECOMPRESS_TIER2_DAYS, RECOMPRESS_TIER2_TOLERANCE,
        RECOMPRESS_TIER3_DAYS, RECOMPRESS_TIER3_TOLERANCE, RETENTION_FLOOR, STALE_GRACE_DAYS,
    },
    sample::Sample,
    time::{duration_millis, opt_duration_millis, same_calendar_day, Timestamp},
};

/// What happened to a sample offered to `add_point`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Accepted into the buffer (possibly merged by compression)
    Stored,
    /// Exact duplicate of the current last point, dropped
    DuplicateDropped,
    /// Sentinel timestamp or non-finite value, rejected at the boundary
    Rejected,
    /// Failed the data-quality range check (series layer only)
    OutOfRange,
}

impl AddOutcome {
    /// True when the sample was accepted
    pub fn was_stored(&self) -> bool {
        matches!(self, AddOutcome::Stored)
    }
}

/// Ordered, retention-limited, compressible container of samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesBuffer {
    points: Vec<Sample>,
    /// Maximum age of retained samples, enforced only at checkpoints
    #[serde(default, with = "opt_duration_millis")]
    max_time_to_keep: Option<Duration>,
    /// Maximum count of retained samples, enforced only at checkpoints
    max_count_to_keep: Option<usize>,
    /// Unit of measure for the point feeding this buffer
    unit_of_measure: String,
    /// Gap between the last stored value and the one before. Tracked here
    /// because compression merges points and the buffer alone can no longer
    /// show the real gap after a reload.
    #[serde(with = "duration_millis")]
    last_gap: Duration,
    compression_state: Option<CompressorState>,
}

impl Default for TimeSeriesBuffer {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            max_time_to_keep: None,
            max_count_to_keep: None,
            unit_of_measure: String::new(),
            last_gap: Duration::zero(),
            compression_state: None,
        }
    }
}

impl TimeSeriesBuffer {
    /// Empty buffer for the given unit of measure
    pub fn new(unit_of_measure: impl Into<String>) -> Self {
        Self { unit_of_measure: unit_of_measure.into(), ..Self::default() }
    }

    /// Retained samples, oldest first
    pub fn points(&self) -> &[Sample] {
        &self.points
    }

    /// Retained samples, newest first
    pub fn points_reversed(&self) -> impl Iterator<Item = &Sample> {
        self.points.iter().rev()
    }

    /// Count of retained samples
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when nothing is retained
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Unit of measure for the point feeding this buffer
    pub fn unit_of_measure(&self) -> &str {
        &self.unit_of_measure
    }

    /// Change the unit of measure (configuration collaborator)
    pub fn set_unit_of_measure(&mut self, unit: impl Into<String>) {
        self.unit_of_measure = unit.into();
    }

    /// Most recent sample, if any
    pub fn last(&self) -> Option<&Sample> {
        self.points.last()
    }

    /// Oldest retained sample, if any
    pub fn first(&self) -> Option<&Sample> {
        self.points.first()
    }

    /// Timestamp of the most recent sample, if any
    pub fn last_seen(&self) -> Option<Timestamp> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Timestamp of the oldest retained sample, if any
    pub fn first_seen(&self) -> Option<Timestamp> {
        self.points.first().map(|p| p.timestamp)
    }

    /// Float value of the most recent sample
    pub fn last_float(&self) -> Option<f64> {
        self.points.last().and_then(Sample::value_float)
    }

    /// Bool value of the most recent sample
    pub fn last_bool(&self) -> Option<bool> {
        self.points.last().and_then(Sample::value_bool)
    }

    /// Text value of the most recent sample
    pub fn last_text(&self) -> Option<&str> {
        self.points.last().and_then(Sample::value_text)
    }

    /// Gap between the last stored value and the one before
    pub fn last_gap(&self) -> Duration {
        self.last_gap
    }

    /// Configured max age, if any
    pub fn max_time_to_keep(&self) -> Option<Duration> {
        self.max_time_to_keep
    }

    /// Configured max count, if any
    pub fn max_count_to_keep(&self) -> Option<usize> {
        self.max_count_to_keep
    }

    /// Grow the max age if the incoming value is larger. Non-positive input
    /// is ignored.
    pub fn set_max_buffer_time(&mut self, max_time: Duration) {
        if max_time <= Duration::zero() {
            return;
        }
        if self.max_time_to_keep.map_or(true, |current| max_time > current) {
            self.max_time_to_keep = Some(max_time);
        }
    }

    /// Set or clear the max count
    pub fn set_max_buffer_count(&mut self, max_count: Option<usize>) {
        self.max_count_to_keep = max_count;
    }

    /// Compression state accessor (series layer clears it when compression
    /// is disabled)
    pub(crate) fn compression_state_mut(&mut self) -> &mut Option<CompressorState> {
        &mut self.compression_state
    }

    /// Last and previous samples, when at least two are retained
    pub fn try_last_and_previous(&self) -> Option<(&Sample, &Sample)> {
        if self.points.len() > 1 {
            Some((&self.points[self.points.len() - 1], &self.points[self.points.len() - 2]))
        } else {
            None
        }
    }

    /// Last real value delta between observations, avoiding compression
    /// artifacts where the state is available
    pub fn last_delta(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        if let Some(state) = &self.compression_state {
            return state.last_delta();
        }
        match self.try_last_and_previous() {
            Some((last, previous)) => last.numeric_value() - previous.numeric_value(),
            None => 0.0,
        }
    }

    /// Last real time delta (seconds) between observations
    pub fn last_delta_time(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        if let Some(state) = &self.compression_state {
            return state.last_delta_time();
        }
        match self.try_last_and_previous() {
            Some((last, previous)) => {
                crate::time::seconds_between(previous.timestamp, last.timestamp)
            }
            None => 0.0,
        }
    }

    /// Adds a point to the buffer.
    ///
    /// We always keep the last value prior to a query start date so rules
    /// can interpolate right up to it; if there is only ever one of a value
    /// we still keep it.
    pub fn add_point(
        &mut self,
        sample: &Sample,
        apply_compression: bool,
        compressor: &Compressor,
        re_apply_compression: bool,
    ) -> AddOutcome {
        if !sample.is_valid() {
            return AddOutcome::Rejected;
        }

        // Once per calendar-day crossing, re-tier old history.
        if apply_compression && re_apply_compression {
            if let Some(last) = self.points.last() {
                if !same_calendar_day(last.timestamp, sample.timestamp) {
                    self.re_apply_compression();
                }
            }
        }

        // Rewind: remove anything after this timestamp if we have gone
        // backward in time. We are about to replay a window that was already
        // partially processed.
        if self.points.last().is_some_and(|last| last.timestamp > sample.timestamp) {
            if self.points.first().is_some_and(|first| first.timestamp > sample.timestamp) {
                // Entire set is beyond the new start time
                self.points.clear();
            } else {
                let cut = sample.timestamp;
                self.points.retain(|p| p.timestamp <= cut);
                self.points.shrink_to_fit();
            }
            self.compression_state = Some(CompressorState::default());
        }

        if let Some(last) = self.points.last() {
            if last.is_same_as(sample) || last.timestamp == sample.timestamp {
                return AddOutcome::DuplicateDropped;
            }
            self.last_gap = sample.timestamp - last.timestamp;
        }

        if apply_compression && !self.points.is_empty() {
            if self.compression_state.is_none() {
                self.rebuild_compression_state(compressor);
            }

            let mut state = self.compression_state.take().unwrap_or_default();
            let (mut append, mut replace) = (false, false);
            compressor.add(
                &mut state,
                sample.timestamp,
                sample.numeric_value(),
                |_, _| append = true,
                |_, _| replace = true,
            );
            self.compression_state = Some(state);

            if append {
                self.ensure_capacity();
                self.points.push(sample.clone());
            } else if replace {
                let last = self.points.len() - 1;
                self.points[last] = sample.clone();
            }
        } else {
            self.ensure_capacity();
            self.points.push(sample.clone());
        }

        AddOutcome::Stored
    }

    /// Gets the retained samples whose timestamps fall in `[start, end]`.
    ///
    /// Scans from the rear: queries overwhelmingly target recent data.
    pub fn get_range(&self, start: Timestamp, end: Timestamp) -> &[Sample] {
        let mut end_index = None;
        for i in (0..self.points.len()).rev() {
            let t = self.points[i].timestamp;
            if t <= end && t >= start {
                end_index = Some(i);
                break;
            }
        }
        let Some(end_index) = end_index else {
            return &[];
        };

        let mut start_index = end_index;
        for i in (0..end_index).rev() {
            if self.points[i].timestamp >= start {
                start_index = i;
            } else {
                break;
            }
        }

        &self.points[start_index..=end_index]
    }

    /// Debug check that samples are non-decreasing by timestamp
    pub fn check_in_order(&self) -> bool {
        self.points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Stable re-sort by timestamp. Disorder is an invariant violation that
    /// self-heals; callers invoke this when `check_in_order` reports false.
    pub fn sort(&mut self) {
        log::warn!("re-sorting out-of-order buffer of {} samples", self.points.len());
        self.points.sort_by_key(|p| p.timestamp);
    }

    /// Retention checkpoint: converts the configured or default max age to a
    /// floor instant (capped by `time_cap` even when a larger per-point
    /// override exists) and enforces the count cap. Returns the number of
    /// samples removed.
    pub fn apply_limits(
        &mut self,
        now: Timestamp,
        default_max_age: Duration,
        time_cap: Duration,
        can_remove_all_points: bool,
    ) -> usize {
        let mut min_date = now - default_max_age;

        if let Some(max_keep) = self.max_time_to_keep {
            min_date = now - max_keep;
            if now - min_date > time_cap {
                min_date = now - time_cap;
            }
        }

        self.prune(self.max_count_to_keep, Some(min_date), can_remove_all_points)
    }

    /// Lower-level retention pass. `max_count` falls back to
    /// [`DEFAULT_MAX_POINTS`](crate::constants::DEFAULT_MAX_POINTS) at the
    /// call sites that want a bound without a configured one.
    pub fn prune(
        &mut self,
        max_count: Option<usize>,
        min_date: Option<Timestamp>,
        can_remove_all_points: bool,
    ) -> usize {
        let mut removed = 0;
        let min_count = if can_remove_all_points { 0 } else { RETENTION_FLOOR };

        if let Some(min_date) = min_date {
            // If the first point is stupidly far before the floor, chop it
            // off even past the two-point rule: single points orphaned
            // months ago otherwise hang around forever.
            let grace = Duration::days(STALE_GRACE_DAYS);
            while self.points.len() > min_count
                && self.points[0].timestamp + grace < min_date
            {
                self.points.remove(0);
                removed += 1;
            }

            // Always keep at least two, and at least one before the floor
            // so rules can interpolate across it.
            while self.points.len() > RETENTION_FLOOR && self.points[1].timestamp < min_date {
                self.points.remove(0);
                removed += 1;
            }
        }

        if let Some(cap) = max_count {
            while self.points.len() > RETENTION_FLOOR && self.points.len() > cap {
                self.points.remove(0);
                removed += 1;
            }
        }

        if removed > 0 {
            log::debug!("retention checkpoint removed {removed} samples");
            self.points.shrink_to_fit();
        }

        removed
    }

    /// Removes points after a certain date.
    ///
    /// Used when the buffer is about to re-process a window it has already
    /// seen; without this the replay would store duplicates.
    pub fn remove_points_after(&mut self, date: Timestamp) {
        let before = self.points.len();
        self.points.retain(|p| p.timestamp <= date);
        if self.points.len() != before {
            self.compression_state = None;
            self.last_gap = Duration::zero();
        }
    }

    /// Re-compress the buffer with tolerances tiered by sample age: recent
    /// history keeps full fidelity, older history is simplified harder.
    fn re_apply_compression(&mut self) {
        let Some(last) = self.points.last() else {
            return;
        };
        let last_seen = last.timestamp;
        let Some(first) = self.points.first() else {
            return;
        };
        if last_seen - first.timestamp < Duration::days(RECOMPRESS_MIN_SPAN_DAYS) {
            return;
        }

        log::trace!("re-tiering compression across {} samples", self.points.len());

        // Keep the live state for future values; the pass below rebuilds a
        // temporary state of its own.
        let live_state = self.compression_state.take();

        let old_points = core::mem::take(&mut self.points);
        let mut compressor = Compressor::new(RECOMPRESS_TIER1_TOLERANCE);

        for sample in old_points {
            let age = last_seen - sample.timestamp;

            // Recent samples are already at the default tolerance.
            if age < Duration::days(RECOMPRESS_TIER1_DAYS) {
                self.ensure_capacity();
                self.points.push(sample);
                continue;
            }

            let tolerance = if age > Duration::days(RECOMPRESS_TIER3_DAYS) {
                RECOMPRESS_TIER3_TOLERANCE
            } else if age > Duration::days(RECOMPRESS_TIER2_DAYS) {
                RECOMPRESS_TIER2_TOLERANCE
            } else {
                RECOMPRESS_TIER1_TOLERANCE
            };

            if compressor.tolerance() != tolerance {
                compressor = Compressor::new(tolerance);
            }

            self.add_point(&sample, true, &compressor, false);
        }

        self.compression_state = live_state;
    }

    /// Replay the retained samples through a fresh compression state,
    /// pruning points the compressor would have merged. Used after a rewind
    /// or a state-less reload.
    fn rebuild_compression_state(&mut self, compressor: &Compressor) {
        let mut state = CompressorState::default();
        let mut rebuilt: Vec<Sample> = Vec::with_capacity(self.points.len());

        for sample in self.points.drain(..) {
            let (mut append, mut replace) = (false, false);
            compressor.add(
                &mut state,
                sample.timestamp,
                sample.numeric_value(),
                |_, _| append = true,
                |_, _| replace = true,
            );
            if append {
                rebuilt.push(sample);
            } else if replace {
                match rebuilt.last_mut() {
                    Some(last) => *last = sample,
                    None => rebuilt.push(sample),
                }
            }
        }

        self.points = rebuilt;
        self.compression_state = Some(state);
    }

    /// Make room for one more element, growing in 5% steps rather than
    /// doubling.
    fn ensure_capacity(&mut self) {
        if self.points.capacity() == self.points.len() {
            let step = ((self.points.len() as f64 * BUFFER_GROWTH_STEP) as usize)
                .max(BUFFER_GROWTH_MIN);
            self.points.reserve_exact(step);
        }
    }
}
