//! Incremental signal estimators
//!
//! ## Overview
//!
//! Three small Kalman-style filters turn noisy per-sample observations into
//! stable quality signals:
//!
//! - [`Kalman`] smooths the inter-arrival period of a point,
//! - [`BinaryKalman`] tracks the likelihood that a point is persistently
//!   out of range,
//! - [`ScalarKalman`] smooths ingestion latency.
//!
//! Each filter is a plain value type holding its full state, updated in
//! place by a single `update` call per observation. There is no shared
//! state, no I/O and no allocation; feeding the same observation sequence
//! from a default state always reproduces the same state, which is what lets
//! a series be serialized mid-stream and resumed elsewhere.
//!
//! ## Filter model
//!
//! All three run the one-dimensional predict/update cycle:
//!
//! ```text
//! P' = P + Q                  (predict: uncertainty grows)
//! K  = P' / (P' + R)          (gain)
//! x  = x + K * (z - x)        (update toward observation z)
//! P  = (1 - K) * P'
//! ```
//!
//! Noise parameters are fixed per filter role rather than configurable:
//! the period estimator favors responsiveness (a changed trend interval
//! should show within a handful of samples), the out-of-range estimator
//! favors inertia (one bad reading must not raise a flag).

use serde::{Deserialize, Serialize};

/// One-dimensional predict/update step shared by all three filters
fn kalman_step(estimate: &mut f64, covariance: &mut f64, q: f64, r: f64, observation: f64) {
    let predicted = *covariance + q;
    let gain = predicted / (predicted + r);
    *estimate += gain * (observation - *estimate);
    *covariance = (1.0 - gain) * predicted;
}

/// Scalar smoother for the inter-arrival period estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kalman {
    estimate: f64,
    covariance: f64,
    initialized: bool,
}

impl Default for Kalman {
    fn default() -> Self {
        Self { estimate: 0.0, covariance: 1.0, initialized: false }
    }
}

impl Kalman {
    /// Process noise: sampling periods drift when schedules change
    const PROCESS_NOISE: f64 = 0.125;
    /// Measurement noise: individual gaps jitter a lot
    const MEASUREMENT_NOISE: f64 = 4.0;

    /// Fold in one observed gap (seconds) and return the new estimate
    pub fn update(&mut self, observation: f64) -> f64 {
        if !self.initialized {
            // First gap is the best guess we have; converging up from zero
            // would misreport slow points as fast for dozens of samples.
            self.estimate = observation;
            self.initialized = true;
            return self.estimate;
        }
        kalman_step(
            &mut self.estimate,
            &mut self.covariance,
            Self::PROCESS_NOISE,
            Self::MEASUREMENT_NOISE,
            observation,
        );
        self.estimate
    }

    /// Current smoothed estimate (seconds)
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}

/// Binary-state smoother: probability estimate over a stream of yes/no
/// observations, with a benchmark threshold for raising a flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryKalman {
    state: f64,
    covariance: f64,
    benchmark: f64,
}

impl Default for BinaryKalman {
    fn default() -> Self {
        Self { state: 0.0, covariance: 1.0, benchmark: Self::DEFAULT_BENCHMARK }
    }
}

impl BinaryKalman {
    /// Flag threshold: the smoothed state must exceed this before the
    /// condition is reported. A cold filter needs several consecutive
    /// positive observations to cross it.
    pub const DEFAULT_BENCHMARK: f64 = 0.75;

    const PROCESS_NOISE: f64 = 0.01;
    const MEASUREMENT_NOISE: f64 = 1.0;

    /// Fold in one binary observation and return the new state
    pub fn update(&mut self, observed: bool) -> f64 {
        let z = if observed { 1.0 } else { 0.0 };
        kalman_step(
            &mut self.state,
            &mut self.covariance,
            Self::PROCESS_NOISE,
            Self::MEASUREMENT_NOISE,
            z,
        );
        self.state = self.state.clamp(0.0, 1.0);
        self.state
    }

    /// Current smoothed state in [0, 1]
    pub fn state(&self) -> f64 {
        self.state
    }

    /// Benchmark threshold the state is compared against
    pub fn benchmark(&self) -> f64 {
        self.benchmark
    }

    /// True when the smoothed state exceeds the benchmark
    pub fn is_above_benchmark(&self) -> bool {
        self.state > self.benchmark
    }
}

/// One-dimensional smoother for latency, seeded with an initial estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalarKalman {
    estimate: f64,
    covariance: f64,
}

impl ScalarKalman {
    const PROCESS_NOISE: f64 = 0.05;
    const MEASUREMENT_NOISE: f64 = 2.0;

    /// Filter seeded with a prior estimate (seconds)
    pub fn new(initial_estimate: f64) -> Self {
        Self { estimate: initial_estimate, covariance: 1.0 }
    }

    /// Fold in one observation and return the new estimate
    pub fn update(&mut self, observation: f64) -> f64 {
        kalman_step(
            &mut self.estimate,
            &mut self.covariance,
            Self::PROCESS_NOISE,
            Self::MEASUREMENT_NOISE,
            observation,
        );
        self.estimate
    }

    /// Current smoothed estimate
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}
