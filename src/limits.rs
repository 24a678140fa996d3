//! Range validation and the device limits cache.
//!
//! Every quantity setter in the crate funnels through [`check_in_range`]
//! before anything is written to the transport. [`DeviceLimits`] holds the
//! hard limits reported by the device, fetched once at session open (and on
//! explicit refresh) so that validation does not cost a round trip.

use crate::config::SessionConfig;
use crate::error::{DlcError, Result};
use crate::transport::{self, paths, Transport};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Bounds
// =============================================================================

/// An inclusive `[min, max]` interval in device-native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl Bounds {
    /// Create a bounds pair. `min` is expected to be <= `max`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The unconstrained interval `(-inf, +inf)`.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Inclusive containment check; exact boundary values pass.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Whether both edges are infinite.
    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Check that `value` lies within `bounds`, inclusive at both edges.
///
/// `parameter` labels the quantity in the error message. This is the single
/// range check used by every setter; it has no side effects.
pub fn check_in_range(value: f64, parameter: &str, bounds: Bounds) -> Result<()> {
    if bounds.contains(value) {
        Ok(())
    } else {
        Err(DlcError::OutOfRange {
            value,
            parameter: parameter.to_string(),
            min: bounds.min,
            max: bounds.max,
        })
    }
}

// =============================================================================
// DeviceLimits
// =============================================================================

/// Hard limits for the settable quantities, cached per connection.
///
/// Voltage bounds and the current clip come from the device. The current
/// floor and the scan frequency bounds are firmware-specific and supplied by
/// [`SessionConfig`] rather than queried (the device does not report them).
/// Wavelength and temperature bounds exist only on laser heads that expose
/// the corresponding setpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLimits {
    /// Piezo voltage range in V.
    pub voltage: Bounds,
    /// Laser current range in mA (floor from config, clip from device).
    pub current: Bounds,
    /// Internal scan frequency range in Hz (from config).
    pub frequency: Bounds,
    /// Wavelength setpoint range in nm, when the head supports it.
    pub wavelength: Option<Bounds>,
    /// Diode temperature setpoint range in °C, when the head supports it.
    pub temperature: Option<Bounds>,
}

impl DeviceLimits {
    /// Query the device for its hard limits.
    ///
    /// Transport failures propagate unchanged; nothing is retried. The
    /// result is handed to the caller, which decides how to cache it.
    pub async fn fetch(transport: &dyn Transport, config: &SessionConfig) -> Result<Self> {
        let voltage = Bounds::new(
            transport::get_f64(transport, paths::VOLTAGE_MIN).await?,
            transport::get_f64(transport, paths::VOLTAGE_MAX).await?,
        );
        let current = Bounds::new(
            config.current_floor_ma,
            transport::get_f64(transport, paths::CURRENT_CLIP).await?,
        );

        let wavelength = if config.wavelength_setting {
            Some(Bounds::new(
                transport::get_f64(transport, paths::WAVELENGTH_MIN).await?,
                transport::get_f64(transport, paths::WAVELENGTH_MAX).await?,
            ))
        } else {
            None
        };
        let temperature = if config.temperature_setting {
            Some(Bounds::new(
                transport::get_f64(transport, paths::TEMP_SET_MIN).await?,
                transport::get_f64(transport, paths::TEMP_SET_MAX).await?,
            ))
        } else {
            None
        };

        Ok(Self {
            voltage,
            current,
            frequency: config.scan_frequency,
            wavelength,
            temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive_at_both_edges() {
        let bounds = Bounds::new(-10.0, 10.0);
        assert!(check_in_range(-10.0, "v", bounds).is_ok());
        assert!(check_in_range(10.0, "v", bounds).is_ok());
        assert!(check_in_range(0.0, "v", bounds).is_ok());
        assert!(check_in_range(-10.000001, "v", bounds).is_err());
        assert!(check_in_range(10.000001, "v", bounds).is_err());
    }

    #[test]
    fn check_reports_value_label_and_bounds() {
        assert!(check_in_range(42.0, "scan frequency", Bounds::new(0.02, 400.0)).is_ok());
        match check_in_range(500.0, "scan frequency", Bounds::new(0.02, 400.0)) {
            Err(DlcError::OutOfRange {
                value,
                parameter,
                min,
                max,
            }) => {
                assert_eq!(value, 500.0);
                assert_eq!(parameter, "scan frequency");
                assert_eq!(min, 0.02);
                assert_eq!(max, 400.0);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn unbounded_contains_everything() {
        let bounds = Bounds::unbounded();
        assert!(bounds.is_unbounded());
        assert!(bounds.contains(f64::MAX));
        assert!(bounds.contains(f64::MIN));
        assert!(check_in_range(1e300, "aux", bounds).is_ok());
    }
}
