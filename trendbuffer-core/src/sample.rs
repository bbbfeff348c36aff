//! Timestamped telemetry samples
//!
//! ## Overview
//!
//! A [`Sample`] is one immutable observation from a building sensor: an
//! instant plus a numeric, boolean or text payload. Samples are created by
//! the ingestion collaborator, owned by whichever buffer slot holds them, and
//! replaced (never mutated) when compression merges them into a neighbor.
//!
//! ## Numeric coercion
//!
//! Rule evaluation treats every sample as a number. The derived
//! interpretation is:
//!
//! ```text
//! Float(v)        -> v
//! FloatText(v, _) -> v
//! Bool(true)      -> 1.0
//! Bool(false)     -> 0.0
//! Text(_)         -> 0.0
//! ```
//!
//! ## Validity
//!
//! Telemetry connectors occasionally emit sentinel timestamps (epoch zero in
//! some upstream clock domain serializes as the minimum instant) and
//! non-finite floats. Those samples are never stored; [`Sample::is_valid`]
//! is the boundary check every insertion path applies first.

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, MAX_INSTANT, MIN_INSTANT};

/// Payload of a sample: exactly one of the variants is meaningful
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleValue {
    /// Plain numeric reading
    Float(f64),
    /// Binary state (occupancy, run status, alarm contact)
    Bool(bool),
    /// Text payload, typically sparse event data
    Text(String),
    /// Numeric reading paired with its display text
    FloatText(f64, String),
}

/// One immutable timestamped observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Instant the observation was taken
    pub timestamp: Timestamp,
    value: SampleValue,
}

impl Sample {
    /// Numeric sample
    pub fn new_float(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value: SampleValue::Float(value) }
    }

    /// Boolean sample
    pub fn new_bool(timestamp: Timestamp, value: bool) -> Self {
        Self { timestamp, value: SampleValue::Bool(value) }
    }

    /// Text sample
    pub fn new_text(timestamp: Timestamp, text: impl Into<String>) -> Self {
        Self { timestamp, value: SampleValue::Text(text.into()) }
    }

    /// Numeric sample carrying display text
    pub fn new_float_with_text(timestamp: Timestamp, value: f64, text: impl Into<String>) -> Self {
        Self { timestamp, value: SampleValue::FloatText(value, text.into()) }
    }

    /// The raw payload
    pub fn value(&self) -> &SampleValue {
        &self.value
    }

    /// Float payload, if any
    pub fn value_float(&self) -> Option<f64> {
        match self.value {
            SampleValue::Float(v) | SampleValue::FloatText(v, _) => Some(v),
            _ => None,
        }
    }

    /// Bool payload, if any
    pub fn value_bool(&self) -> Option<bool> {
        match self.value {
            SampleValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Text payload, if any
    pub fn value_text(&self) -> Option<&str> {
        match &self.value {
            SampleValue::Text(t) | SampleValue::FloatText(_, t) => Some(t),
            _ => None,
        }
    }

    /// True when this sample is text-only (no numeric interpretation)
    pub fn is_text(&self) -> bool {
        matches!(self.value, SampleValue::Text(_))
    }

    /// Derived numeric interpretation (see module docs)
    pub fn numeric_value(&self) -> f64 {
        match self.value {
            SampleValue::Float(v) | SampleValue::FloatText(v, _) => v,
            SampleValue::Bool(true) => 1.0,
            SampleValue::Bool(false) => 0.0,
            SampleValue::Text(_) => 0.0,
        }
    }

    /// Exact duplicate check: timestamp, bool and float interpretations all
    /// equal. Used to suppress true duplicates at insertion.
    pub fn is_same_as(&self, other: &Sample) -> bool {
        self.timestamp == other.timestamp
            && self.value_bool() == other.value_bool()
            && self.value_float() == other.value_float()
    }

    /// Boundary check: sentinel timestamps and non-finite floats are never
    /// stored.
    pub fn is_valid(&self) -> bool {
        if self.timestamp == MIN_INSTANT || self.timestamp == MAX_INSTANT {
            return false;
        }
        match self.value_float() {
            Some(v) => v.is_finite(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(secs: i64) -> Timestamp {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn numeric_coercion() {
        let t = at(1000);
        assert_eq!(Sample::new_float(t, 21.5).numeric_value(), 21.5);
        assert_eq!(Sample::new_bool(t, true).numeric_value(), 1.0);
        assert_eq!(Sample::new_bool(t, false).numeric_value(), 0.0);
        assert_eq!(Sample::new_text(t, "fault").numeric_value(), 0.0);
        assert_eq!(Sample::new_float_with_text(t, 3.2, "3.2 bar").numeric_value(), 3.2);
    }

    #[test]
    fn duplicate_detection() {
        let t = at(1000);
        let a = Sample::new_float(t, 21.5);
        assert!(a.is_same_as(&Sample::new_float(t, 21.5)));
        assert!(!a.is_same_as(&Sample::new_float(t, 21.6)));
        assert!(!a.is_same_as(&Sample::new_float(at(1001), 21.5)));
        // Text payload does not participate in duplicate comparison
        assert!(Sample::new_text(t, "a").is_same_as(&Sample::new_text(t, "b")));
    }

    #[test]
    fn rejects_sentinels_and_non_finite() {
        let t = at(1000);
        assert!(Sample::new_float(t, 21.5).is_valid());
        assert!(!Sample::new_float(MIN_INSTANT, 21.5).is_valid());
        assert!(!Sample::new_float(MAX_INSTANT, 21.5).is_valid());
        assert!(!Sample::new_float(t, f64::NAN).is_valid());
        assert!(!Sample::new_float(t, f64::INFINITY).is_valid());
        assert!(!Sample::new_float(t, f64::NEG_INFINITY).is_valid());
        assert!(Sample::new_text(t, "event").is_valid());
    }
}
