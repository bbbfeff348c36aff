//! Physically plausible value ranges per unit of measure
//!
//! Maps a telemetry point's unit string to the widest physically plausible
//! range for a sensor reporting in that unit. These are sanity bounds, not
//! operating envelopes: a reading outside them is sensor fault or garbage,
//! not an unusual condition. Ranges follow sensor datasheet limits where a
//! common part family exists (temperature, humidity, pressure).
//!
//! Unit strings arrive from external metadata and are messy; lookup
//! normalizes case and surrounding whitespace. Unknown units and explicitly
//! unbounded ones ("bool", "no unit") have no range and disable the
//! out-of-range quality check entirely.

/// Inclusive plausibility bounds for a unit of measure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Smallest plausible reading
    pub min: f64,
    /// Largest plausible reading
    pub max: f64,
}

impl ValueRange {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when the value lies inside the bounds
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Model suffix that widens the ppm range: CO2 sensors legitimately report
/// into the tens of thousands in ducts and plant rooms.
const CO2_MODEL_SUFFIX: &str = "CO2AirQualitySensor;1";

/// Plausible range for a unit of measure, refined by the twin model where
/// the unit alone is ambiguous. `None` means no quality check applies.
pub fn valid_range(unit_of_measure: &str, model_id: &str) -> Option<ValueRange> {
    let unit = unit_of_measure.trim().to_lowercase();
    let range = match unit.as_str() {
        // Temperatures: industrial sensor element limits
        "°c" | "degc" | "celsius" => ValueRange::new(-80.0, 125.0),
        "°f" | "degf" | "fahrenheit" => ValueRange::new(-112.0, 257.0),
        "k" | "kelvin" => ValueRange::new(193.0, 398.0),

        // Ratios
        "%" | "percent" => ValueRange::new(0.0, 100.0),

        // Pressures
        "hpa" | "mbar" => ValueRange::new(300.0, 1100.0),
        "kpa" => ValueRange::new(0.0, 2000.0),
        "pa" => ValueRange::new(-5000.0, 5000.0),
        "psi" => ValueRange::new(0.0, 300.0),
        "inh2o" | "inwc" => ValueRange::new(-20.0, 20.0),

        // Gas concentrations
        "ppm" => {
            if model_id.ends_with(CO2_MODEL_SUFFIX) {
                ValueRange::new(0.0, 50_000.0)
            } else {
                ValueRange::new(0.0, 10_000.0)
            }
        }
        "ppb" => ValueRange::new(0.0, 1_000_000.0),

        // Flow and speed
        "l/s" => ValueRange::new(-50_000.0, 50_000.0),
        "m3/h" | "m³/h" => ValueRange::new(-200_000.0, 200_000.0),
        "cfm" => ValueRange::new(-120_000.0, 120_000.0),
        "m/s" => ValueRange::new(-150.0, 150.0),

        // Electrical
        "v" | "volt" | "volts" => ValueRange::new(-1500.0, 1500.0),
        "a" | "amp" | "amps" => ValueRange::new(-10_000.0, 10_000.0),
        "kw" => ValueRange::new(-100_000.0, 100_000.0),
        "kwh" => ValueRange::new(0.0, 1.0e12),
        "hz" => ValueRange::new(0.0, 1000.0),

        // Illuminance
        "lux" => ValueRange::new(0.0, 200_000.0),

        _ => return None,
    };
    Some(range)
}

/// True when the unit carries plausibility bounds at all
pub fn has_range(unit_of_measure: &str, model_id: &str) -> bool {
    valid_range(unit_of_measure, model_id).is_some()
}

/// True when `value` falls outside the plausible range for the unit.
/// Unbounded units are never out of range.
pub fn is_out_of_range(unit_of_measure: &str, model_id: &str, value: f64) -> bool {
    match valid_range(unit_of_measure, model_id) {
        Some(range) => !range.contains(value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_bounds() {
        let range = valid_range("°C", "").unwrap();
        assert!(range.contains(21.5));
        assert!(range.contains(-80.0));
        assert!(!range.contains(1000.0));
        assert!(!range.contains(-120.0));
    }

    #[test]
    fn lookup_normalizes_case_and_whitespace() {
        assert_eq!(valid_range(" PERCENT ", ""), valid_range("%", ""));
        assert_eq!(valid_range("DegC", ""), valid_range("°c", ""));
    }

    #[test]
    fn unknown_and_bool_units_have_no_range() {
        assert!(valid_range("bool", "").is_none());
        assert!(valid_range("", "").is_none());
        assert!(valid_range("widgets-per-fortnight", "").is_none());
        assert!(!is_out_of_range("bool", "", 1.0e300));
    }

    #[test]
    fn co2_model_widens_ppm_range() {
        let generic = valid_range("ppm", "dtmi:com:buildingtwin:Sensor;1").unwrap();
        let co2 = valid_range("ppm", "dtmi:com:buildingtwin:CO2AirQualitySensor;1").unwrap();
        assert!(co2.max > generic.max);
        assert!(is_out_of_range("ppm", "", 20_000.0));
        assert!(!is_out_of_range("ppm", "dtmi:com:buildingtwin:CO2AirQualitySensor;1", 20_000.0));
    }

    #[test]
    fn percent_is_bounded_both_ends() {
        assert!(is_out_of_range("%", "", -0.1));
        assert!(is_out_of_range("%", "", 100.1));
        assert!(!is_out_of_range("%", "", 0.0));
        assert!(!is_out_of_range("%", "", 100.0));
    }
}
