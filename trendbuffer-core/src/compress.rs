//! Online trajectory compression
//!
//! ## Overview
//!
//! Building telemetry is dominated by slow ramps and long plateaus. Storing
//! every raw sample wastes memory without adding information a rule could
//! use, so insertion runs each point through a streaming simplifier that
//! decides one of three fates:
//!
//! - **append** — the point starts a new segment and is retained verbatim,
//! - **replace-last** — the point extends the current straight-line segment,
//!   so it replaces the segment's endpoint in the buffer,
//! - **drop** — the point is indistinguishable from the retained endpoint at
//!   the configured tolerance.
//!
//! ## Algorithm
//!
//! Two stages, both driven by a deviation band of
//! `tolerance × observed value range`:
//!
//! 1. An exception deadband: a point within half the band of the current
//!    segment endpoint carries no new information and is dropped.
//! 2. A swinging-door envelope: the remaining points either fit inside the
//!    slope corridor opened from the segment anchor (the corridor tightens
//!    with every point, and the endpoint slides forward — replace-last) or
//!    close the door, committing the old endpoint as the new anchor and
//!    appending the point as the start of the next segment.
//!
//! A tolerance of zero disables both stages; every point appends.
//!
//! ## State
//!
//! [`CompressorState`] is owned by the buffer that created it and carries
//! just enough history to place the next point: the segment anchor and
//! endpoint, the slope corridor, the observed range, and the raw deltas
//! between the last two observations (rules ask for real deltas, which the
//! retained points no longer show once compression merges them). Resetting
//! to `Default` and replaying historical samples reproduces the state
//! deterministically.

use serde::{Deserialize, Serialize};

use crate::time::{seconds_between, Timestamp};

/// Streaming point simplifier bounded by a fractional tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressor {
    tolerance: f64,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_TOLERANCE)
    }
}

/// Per-buffer state carried across [`Compressor::add`] calls
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressorState {
    /// Committed start of the current segment
    anchor: Option<(Timestamp, f64)>,
    /// Current segment endpoint (the buffer's last retained point)
    pending: Option<(Timestamp, f64)>,
    slope_min: f64,
    slope_max: f64,
    /// Observed (min, max) of all values ever offered, compressed or not
    range: Option<(f64, f64)>,
    /// Last raw observation, for delta tracking
    last_observed: Option<(Timestamp, f64)>,
    last_delta: f64,
    last_delta_time: f64,
}

impl CompressorState {
    /// Value delta between the last two raw observations
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    /// Time delta (seconds) between the last two raw observations
    pub fn last_delta_time(&self) -> f64 {
        self.last_delta_time
    }
}

impl Compressor {
    /// Compressor with the given tolerance (fraction of the observed value
    /// range, e.g. 0.05 = 5%). Negative input is treated as zero.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance: tolerance.max(0.0) }
    }

    /// Configured tolerance fraction
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Offer one `(timestamp, value)` pair. Exactly one of three things
    /// happens: `on_append` fires, `on_replace_last` fires, or neither does
    /// and the point is dropped.
    ///
    /// Timestamps are assumed strictly increasing; the buffer filters
    /// duplicates and rewinds before delegating here.
    pub fn add(
        &self,
        state: &mut CompressorState,
        timestamp: Timestamp,
        value: f64,
        mut on_append: impl FnMut(Timestamp, f64),
        mut on_replace_last: impl FnMut(Timestamp, f64),
    ) {
        if let Some((last_t, last_v)) = state.last_observed {
            state.last_delta = value - last_v;
            state.last_delta_time = seconds_between(last_t, timestamp);
        }
        state.last_observed = Some((timestamp, value));

        state.range = Some(match state.range {
            None => (value, value),
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
        });

        if self.tolerance == 0.0 {
            // Lossless mode: keep the segment chain consistent so a later
            // tolerance change can pick up from here.
            state.anchor = state.pending.or(state.anchor);
            state.pending = Some((timestamp, value));
            on_append(timestamp, value);
            return;
        }

        let (lo, hi) = state.range.unwrap_or((value, value));
        let deviation = self.tolerance * (hi - lo);

        let Some(anchor) = state.anchor else {
            state.anchor = Some((timestamp, value));
            on_append(timestamp, value);
            return;
        };

        let Some(pending) = state.pending else {
            let dt = seconds_between(anchor.0, timestamp).max(f64::EPSILON);
            state.slope_min = (value - deviation - anchor.1) / dt;
            state.slope_max = (value + deviation - anchor.1) / dt;
            state.pending = Some((timestamp, value));
            on_append(timestamp, value);
            return;
        };

        // Stage 1: exception deadband against the segment endpoint.
        if deviation > 0.0 && (value - pending.1).abs() <= deviation * 0.5 {
            return;
        }

        // Stage 2: swinging door from the anchor.
        let dt = seconds_between(anchor.0, timestamp).max(f64::EPSILON);
        let slope = (value - anchor.1) / dt;

        if slope >= state.slope_min && slope <= state.slope_max {
            // Door still open: the segment endpoint slides forward.
            state.slope_min = state.slope_min.max((value - deviation - anchor.1) / dt);
            state.slope_max = state.slope_max.min((value + deviation - anchor.1) / dt);
            state.pending = Some((timestamp, value));
            on_replace_last(timestamp, value);
        } else {
            // Door closed: commit the old endpoint, start a new segment.
            let dt = seconds_between(pending.0, timestamp).max(f64::EPSILON);
            state.slope_min = (value - deviation - pending.1) / dt;
            state.slope_max = (value + deviation - pending.1) / dt;
            state.anchor = Some(pending);
            state.pending = Some((timestamp, value));
            on_append(timestamp, value);
        }
    }
}
