//! Session configuration.
//!
//! Everything that used to be a module-level default in older control
//! scripts is an explicit field here, passed at session construction. The
//! struct derives serde so it can be loaded straight from a TOML file.

use crate::limits::Bounds;
use serde::{Deserialize, Serialize};

/// Configuration for one controller session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Address of the controller (informational to this crate; the
    /// transport implementation owns the actual connection).
    pub host: String,

    /// Whether the laser head exposes a wavelength setpoint.
    #[serde(default)]
    pub wavelength_setting: bool,

    /// Whether the laser head exposes a diode temperature setpoint.
    #[serde(default)]
    pub temperature_setting: bool,

    /// Lower bound of the permitted laser current in mA.
    ///
    /// Firmware- and unit-specific (some units use 0.0, others a lasing
    /// threshold such as 60.0); the device does not report it, so it must be
    /// stated explicitly. There is deliberately no default.
    pub current_floor_ma: f64,

    /// Permitted internal scan frequency range in Hz.
    ///
    /// The hardware manual does not document the upper bound; 400 Hz is the
    /// conventional working value. Override if your unit differs.
    #[serde(default = "default_scan_frequency")]
    pub scan_frequency: Bounds,

    /// Scan amplitude/offset range applied when the scan is routed to the
    /// auxiliary outputs OutA/OutB. `None` leaves those outputs
    /// unconstrained (a warning is logged when that happens).
    #[serde(default)]
    pub aux_output_range: Option<Bounds>,
}

fn default_scan_frequency() -> Bounds {
    Bounds::new(0.02, 400.0)
}

impl SessionConfig {
    /// Minimal configuration: host plus the mandatory current floor, both
    /// optional capabilities off.
    pub fn new(host: impl Into<String>, current_floor_ma: f64) -> Self {
        Self {
            host: host.into(),
            wavelength_setting: false,
            temperature_setting: false,
            current_floor_ma,
            scan_frequency: default_scan_frequency(),
            aux_output_range: None,
        }
    }

    /// Enable or disable the wavelength setpoint capability.
    pub fn with_wavelength_setting(mut self, present: bool) -> Self {
        self.wavelength_setting = present;
        self
    }

    /// Enable or disable the temperature setpoint capability.
    pub fn with_temperature_setting(mut self, present: bool) -> Self {
        self.temperature_setting = present;
        self
    }

    /// Override the scan frequency bounds.
    pub fn with_scan_frequency(mut self, bounds: Bounds) -> Self {
        self.scan_frequency = bounds;
        self
    }

    /// Constrain the scan range used for the auxiliary outputs.
    pub fn with_aux_output_range(mut self, bounds: Bounds) -> Self {
        self.aux_output_range = Some(bounds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_capabilities_off() {
        let cfg = SessionConfig::new("192.168.100.100", 0.0);
        assert!(!cfg.wavelength_setting);
        assert!(!cfg.temperature_setting);
        assert_eq!(cfg.scan_frequency, Bounds::new(0.02, 400.0));
        assert!(cfg.aux_output_range.is_none());
    }

    #[test]
    fn loads_from_toml_with_required_current_floor() {
        let cfg: SessionConfig = toml::from_str(
            r#"
            host = "10.0.0.5"
            wavelength_setting = true
            current_floor_ma = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.host, "10.0.0.5");
        assert!(cfg.wavelength_setting);
        assert_eq!(cfg.current_floor_ma, 60.0);

        // current_floor_ma has no default on purpose.
        let missing: Result<SessionConfig, _> = toml::from_str(r#"host = "10.0.0.5""#);
        assert!(missing.is_err());
    }
}
