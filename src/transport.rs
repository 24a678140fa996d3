//! Device transport capability.
//!
//! The control layer talks to the laser controller exclusively through the
//! [`Transport`] trait: `get`/`set` on opaque, colon-separated parameter
//! paths, plus connection lifecycle and a coarse user-privilege change. How
//! values are encoded on the wire is entirely the transport's business; this
//! crate never sees it.
//!
//! Transport implementations report failures as `anyhow::Result`, the same
//! contract the hardware capability traits in our other drivers use. The
//! session layer wraps those failures once into
//! [`DlcError::Transport`](crate::error::DlcError) and never retries.

use crate::error::{DlcError, Result};
use anyhow::Result as TransportResult;
use async_trait::async_trait;
use serde_json::Value;

/// Connection to a single DLC pro class controller.
///
/// All methods take `&self`; implementations use interior mutability so a
/// session can hold the transport behind an `Arc`. The call model is
/// sequential: one session, one caller, every get/set a blocking round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection. Opening an already-open transport is an error.
    async fn open(&self) -> TransportResult<()>;

    /// Close the connection. Closing an already-closed transport is a no-op.
    async fn close(&self) -> TransportResult<()>;

    /// Read a parameter. `path` is an opaque hierarchical key such as
    /// `laser1:scan:frequency`.
    async fn get(&self, path: &str) -> TransportResult<Value>;

    /// Write a parameter.
    async fn set(&self, path: &str, value: Value) -> TransportResult<()>;

    /// Change the privilege level of this connection (not of the device
    /// console). Returns the level now in effect.
    async fn change_user_level(&self, level: i64, password: &str) -> TransportResult<i64>;
}

// =============================================================================
// Typed accessors
// =============================================================================

pub(crate) async fn get_f64(transport: &dyn Transport, path: &str) -> Result<f64> {
    let value = transport.get(path).await?;
    value.as_f64().ok_or_else(|| DlcError::UnexpectedValue {
        path: path.to_string(),
        value,
    })
}

pub(crate) async fn get_bool(transport: &dyn Transport, path: &str) -> Result<bool> {
    let value = transport.get(path).await?;
    value.as_bool().ok_or_else(|| DlcError::UnexpectedValue {
        path: path.to_string(),
        value,
    })
}

pub(crate) async fn get_i64(transport: &dyn Transport, path: &str) -> Result<i64> {
    let value = transport.get(path).await?;
    value.as_i64().ok_or_else(|| DlcError::UnexpectedValue {
        path: path.to_string(),
        value,
    })
}

pub(crate) async fn set_f64(transport: &dyn Transport, path: &str, value: f64) -> Result<()> {
    transport.set(path, Value::from(value)).await?;
    Ok(())
}

pub(crate) async fn set_bool(transport: &dyn Transport, path: &str, value: bool) -> Result<()> {
    transport.set(path, Value::from(value)).await?;
    Ok(())
}

pub(crate) async fn set_i64(transport: &dyn Transport, path: &str, value: i64) -> Result<()> {
    transport.set(path, Value::from(value)).await?;
    Ok(())
}

// =============================================================================
// Parameter paths
// =============================================================================

/// Parameter paths in the controller's hierarchy.
///
/// These match the DLC pro naming scheme (`laser1:dl:pc:voltage-min` and
/// friends) but the crate treats them as opaque keys.
pub mod paths {
    use crate::channel::Addressee;

    /// Actual emission state of the laser (read only, authoritative).
    pub const EMISSION: &str = "emission";
    /// Front-panel emission button state (read only).
    pub const EMISSION_BUTTON: &str = "emission-button-enabled";
    /// Connection privilege level.
    pub const USER_LEVEL: &str = "ul";

    /// Piezo voltage hard minimum in V.
    pub const VOLTAGE_MIN: &str = "laser1:dl:pc:voltage-min";
    /// Piezo voltage hard maximum in V.
    pub const VOLTAGE_MAX: &str = "laser1:dl:pc:voltage-max";
    /// Laser current clip level in mA.
    pub const CURRENT_CLIP: &str = "laser1:dl:cc:current-clip";
    /// Laser current driver enabled flag.
    pub const CURRENT_ENABLED: &str = "laser1:dl:cc:enabled";

    /// Wavelength setpoint minimum in nm (CTL heads only).
    pub const WAVELENGTH_MIN: &str = "laser1:ctl:wavelength-min";
    /// Wavelength setpoint maximum in nm (CTL heads only).
    pub const WAVELENGTH_MAX: &str = "laser1:ctl:wavelength-max";
    /// Wavelength setpoint in nm.
    pub const WAVELENGTH_SET: &str = "laser1:ctl:wavelength-set";
    /// Measured wavelength in nm (read only).
    pub const WAVELENGTH_ACT: &str = "laser1:ctl:wavelength-act";

    /// Diode temperature setpoint minimum in °C.
    pub const TEMP_SET_MIN: &str = "laser1:dl:tc:temp-set-min";
    /// Diode temperature setpoint maximum in °C.
    pub const TEMP_SET_MAX: &str = "laser1:dl:tc:temp-set-max";
    /// Diode temperature setpoint in °C.
    pub const TEMP_SET: &str = "laser1:dl:tc:temp-set";
    /// Measured diode temperature in °C (read only).
    pub const TEMP_ACT: &str = "laser1:dl:tc:temp-act";

    /// Internal scan generator on/off.
    pub const SCAN_ENABLED: &str = "laser1:scan:enabled";
    /// Internal scan output channel code.
    pub const SCAN_OUTPUT_CHANNEL: &str = "laser1:scan:output-channel";
    /// Internal scan frequency in Hz.
    pub const SCAN_FREQUENCY: &str = "laser1:scan:frequency";
    /// Internal scan peak-to-peak amplitude.
    pub const SCAN_AMPLITUDE: &str = "laser1:scan:amplitude";
    /// Internal scan offset.
    pub const SCAN_OFFSET: &str = "laser1:scan:offset";
    /// Internal scan span start.
    pub const SCAN_START: &str = "laser1:scan:start";
    /// Internal scan span end.
    pub const SCAN_END: &str = "laser1:scan:end";

    /// Analogue remote control parameter path for one addressee.
    ///
    /// `field` is one of `enabled`, `factor`, `signal`.
    pub fn external_input(addressee: Addressee, field: &str) -> String {
        format!("laser1:dl:{}:external-input:{}", addressee.as_str(), field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Addressee;

    #[test]
    fn external_input_paths() {
        assert_eq!(
            paths::external_input(Addressee::Cc, "signal"),
            "laser1:dl:cc:external-input:signal"
        );
        assert_eq!(
            paths::external_input(Addressee::Pc, "enabled"),
            "laser1:dl:pc:external-input:enabled"
        );
    }
}
