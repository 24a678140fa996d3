//! Session facade over one controller connection.
//!
//! [`DlcSession`] owns the transport, the cached device limits, the scan
//! controller and the analogue remote router, and exposes the flat surface
//! the rest of the lab code talks to: emission, wavelength, temperature,
//! snapshots and the scan-stepping routine. Construction order matters: the
//! limits are fetched before the scan controller derives its active range
//! from them.

use crate::config::SessionConfig;
use crate::error::{DlcError, Result};
use crate::limits::{check_in_range, DeviceLimits};
use crate::remote::RemoteControl;
use crate::scan::{self, ScanController};
use crate::snapshot::{
    ParameterSnapshot, RemoteSnapshot, TemperatureSnapshot, WavelengthSnapshot,
};
use crate::transport::{self, paths, Transport};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Emission state report: the button is the hardware interlock, the current
/// driver is the software side, emission needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionStatus {
    /// Front-panel emission button state.
    pub button_enabled: bool,
    /// Laser current driver state.
    pub current_enabled: bool,
    /// Actual emission state as reported by the device.
    pub emission: bool,
}

impl fmt::Display for EmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "ENABLED" } else { "DISABLED" };
        writeln!(f, "Emission button is {}", on_off(self.button_enabled))?;
        writeln!(f, "Laser current is {}", on_off(self.current_enabled))?;
        write!(
            f,
            "Therefore, emission is {}",
            if self.emission { "ON" } else { "OFF" }
        )
    }
}

/// One open connection to a DLC pro class controller.
pub struct DlcSession {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    limits: DeviceLimits,
    scan: ScanController,
    remote: RemoteControl,
    calibration: Option<f64>,
}

impl fmt::Debug for DlcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DlcSession")
            .field("config", &self.config)
            .field("limits", &self.limits)
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}

impl DlcSession {
    /// Open the transport and populate every cache: device limits first,
    /// then the scan controller (whose active range derives from them),
    /// then the remote router. If populating fails the transport is closed
    /// again before the error propagates.
    pub async fn open(transport: Arc<dyn Transport>, config: SessionConfig) -> Result<Self> {
        transport.open().await?;
        match Self::populate(transport.clone(), config).await {
            Ok(session) => Ok(session),
            Err(err) => {
                if let Err(close_err) = transport.close().await {
                    warn!(%close_err, "closing after failed session setup also failed");
                }
                Err(err)
            }
        }
    }

    async fn populate(transport: Arc<dyn Transport>, config: SessionConfig) -> Result<Self> {
        let limits = DeviceLimits::fetch(transport.as_ref(), &config).await?;
        let scan =
            ScanController::populate(transport.clone(), limits.clone(), config.aux_output_range)
                .await?;
        let remote = RemoteControl::populate(transport.clone()).await?;
        info!(host = %config.host, "session open");
        Ok(Self {
            transport,
            config,
            limits,
            scan,
            remote,
            calibration: None,
        })
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }

    /// The scan generator controller.
    pub fn scan(&mut self) -> &mut ScanController {
        &mut self.scan
    }

    /// The analogue remote router.
    pub fn remote(&mut self) -> &mut RemoteControl {
        &mut self.remote
    }

    /// The cached device limits.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Re-query the device limits and propagate them to the scan controller
    /// so its active range is recomputed.
    pub async fn refresh_limits(&mut self) -> Result<&DeviceLimits> {
        self.limits = DeviceLimits::fetch(self.transport.as_ref(), &self.config).await?;
        self.scan.set_limits(self.limits.clone());
        Ok(&self.limits)
    }

    // Emission ---------------------------------------------------------------

    /// Actual emission state (read only).
    pub async fn emission(&self) -> Result<bool> {
        transport::get_bool(self.transport.as_ref(), paths::EMISSION).await
    }

    /// Front-panel emission button state (read only).
    pub async fn emission_button_enabled(&self) -> Result<bool> {
        transport::get_bool(self.transport.as_ref(), paths::EMISSION_BUTTON).await
    }

    /// Laser current driver state.
    pub async fn current_enabled(&self) -> Result<bool> {
        transport::get_bool(self.transport.as_ref(), paths::CURRENT_ENABLED).await
    }

    /// Switch the laser current driver, the software half of emission
    /// control. With the front-panel button disabled the write still goes
    /// through (it takes effect once the button is pressed), but a warning
    /// is logged since no light will appear yet.
    pub async fn set_current_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && !self.emission_button_enabled().await? {
            warn!("emission button on the controller is not enabled, no emission until it is");
        }
        transport::set_bool(self.transport.as_ref(), paths::CURRENT_ENABLED, enabled).await
    }

    /// Read all three emission-related states in one report.
    pub async fn emission_status(&self) -> Result<EmissionStatus> {
        Ok(EmissionStatus {
            button_enabled: self.emission_button_enabled().await?,
            current_enabled: self.current_enabled().await?,
            emission: self.emission().await?,
        })
    }

    // Wavelength and temperature ---------------------------------------------

    /// Wavelength setpoint in nm, `Ok(None)` on heads without one.
    pub async fn wavelength_setpoint(&self) -> Result<Option<f64>> {
        if !self.config.wavelength_setting {
            return Ok(None);
        }
        Ok(Some(
            transport::get_f64(self.transport.as_ref(), paths::WAVELENGTH_SET).await?,
        ))
    }

    /// Measured wavelength in nm, `Ok(None)` on heads without the readout.
    pub async fn wavelength_actual(&self) -> Result<Option<f64>> {
        if !self.config.wavelength_setting {
            return Ok(None);
        }
        Ok(Some(
            transport::get_f64(self.transport.as_ref(), paths::WAVELENGTH_ACT).await?,
        ))
    }

    /// Set the wavelength setpoint, validated against the head's range.
    #[instrument(skip(self), err)]
    pub async fn set_wavelength_setpoint(&self, nm: f64) -> Result<()> {
        let bounds = self
            .limits
            .wavelength
            .ok_or(DlcError::CapabilityAbsent("wavelength"))?;
        check_in_range(nm, "wavelength", bounds)?;
        transport::set_f64(self.transport.as_ref(), paths::WAVELENGTH_SET, nm).await
    }

    /// Diode temperature setpoint in degC, `Ok(None)` when not exposed.
    pub async fn temperature_setpoint(&self) -> Result<Option<f64>> {
        if !self.config.temperature_setting {
            return Ok(None);
        }
        Ok(Some(
            transport::get_f64(self.transport.as_ref(), paths::TEMP_SET).await?,
        ))
    }

    /// Measured diode temperature in degC, `Ok(None)` when not exposed.
    pub async fn temperature_actual(&self) -> Result<Option<f64>> {
        if !self.config.temperature_setting {
            return Ok(None);
        }
        Ok(Some(
            transport::get_f64(self.transport.as_ref(), paths::TEMP_ACT).await?,
        ))
    }

    /// Set the diode temperature setpoint, validated against the head's
    /// range.
    #[instrument(skip(self), err)]
    pub async fn set_temperature_setpoint(&self, celsius: f64) -> Result<()> {
        let bounds = self
            .limits
            .temperature
            .ok_or(DlcError::CapabilityAbsent("temperature"))?;
        check_in_range(celsius, "temperature", bounds)?;
        transport::set_f64(self.transport.as_ref(), paths::TEMP_SET, celsius).await
    }

    // User level -------------------------------------------------------------

    /// Privilege level of this connection.
    pub async fn user_level(&self) -> Result<i64> {
        transport::get_i64(self.transport.as_ref(), paths::USER_LEVEL).await
    }

    /// Change the privilege level of this connection. Returns the level now
    /// in effect.
    pub async fn change_user_level(&self, level: i64, password: &str) -> Result<i64> {
        let level = self.transport.change_user_level(level, password).await?;
        Ok(level)
    }

    // Snapshots --------------------------------------------------------------

    /// Assemble a snapshot of every settable parameter. The scan state is
    /// re-read first since its fields are interdependent and drift with the
    /// offset/amplitude coupling.
    pub async fn all_parameters(&mut self) -> Result<ParameterSnapshot> {
        let scan = *self.scan.refresh().await?;
        let (cc, pc) = self.remote.states();
        let analogue_remote = RemoteSnapshot { cc: *cc, pc: *pc };
        let wavelength = WavelengthSnapshot {
            setpoint: self.wavelength_setpoint().await?,
            actual: self.wavelength_actual().await?,
        };
        let temperature = TemperatureSnapshot {
            setpoint: self.temperature_setpoint().await?,
            actual: self.temperature_actual().await?,
        };
        Ok(ParameterSnapshot::new(
            scan,
            analogue_remote,
            wavelength,
            temperature,
        ))
    }

    /// Snapshot the parameters and write them to a JSON file. Never
    /// overwrites; returns the path actually written.
    pub async fn save_parameters(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        self.all_parameters().await?.save(path)
    }

    /// Read a snapshot from disk. Needs no live session.
    pub fn read_parameters(path: impl AsRef<Path>) -> Result<ParameterSnapshot> {
        ParameterSnapshot::read(path)
    }

    /// Push a saved snapshot back to the device.
    pub async fn apply_parameters(&mut self, _snapshot: &ParameterSnapshot) -> Result<()> {
        Err(DlcError::NotImplemented(
            "applying a saved parameter snapshot",
        ))
    }

    // Sweep rate -------------------------------------------------------------

    /// Frequency span swept per second in MHz/s, from the current scan
    /// settings. `calibration` is in MHz per device unit (MHz/V on the piezo
    /// channel, MHz/mA on the current channel); pass `None` to reuse the
    /// last one given.
    pub async fn sweep_rate_mhz_per_sec(&mut self, calibration: Option<f64>) -> Result<f64> {
        if let Some(value) = calibration {
            self.calibration = Some(value);
        }
        let calibration = self.calibration.ok_or(DlcError::CalibrationUnset)?;
        let state = self.scan.refresh().await?;
        Ok(scan::sweep_rate(
            state.frequency,
            state.amplitude,
            1.0,
            calibration,
        ))
    }

    // Scan stepping ----------------------------------------------------------

    /// Step the scan offset down through the span currently in use.
    ///
    /// The amplitude is zeroed, then the offset walks from the span end down
    /// by one full amplitude in `steps` evenly spaced points, dwelling
    /// `dwell` at each. Stops early when a step leaves the permitted range
    /// or on Ctrl-C. The initial offset and amplitude are restored on every
    /// exit path before the first error (if any) is reported.
    pub async fn step_through_scan_range(&mut self, steps: usize, dwell: Duration) -> Result<()> {
        let state = *self.scan.state();
        let outcome = self
            .run_scan_steps(steps, dwell, state.end, state.amplitude)
            .await;

        info!("restoring initial scan state");
        let offset_restored = self.scan.set_offset(state.offset).await;
        let amplitude_restored = self.scan.set_amplitude(state.amplitude).await;
        outcome.and(offset_restored).and(amplitude_restored)
    }

    async fn run_scan_steps(
        &mut self,
        steps: usize,
        dwell: Duration,
        initial_end: f64,
        initial_amplitude: f64,
    ) -> Result<()> {
        self.scan.set_amplitude(0.0).await?;
        for step in 0..steps {
            // Evenly spaced from 0 down to -amplitude, both ends included.
            let change = if steps > 1 {
                -initial_amplitude * step as f64 / (steps - 1) as f64
            } else {
                0.0
            };
            let target = initial_end + change;
            info!(step, target, "stepping scan offset");
            match self.scan.set_offset(target).await {
                Ok(()) => {}
                Err(err @ DlcError::OutOfRange { .. }) => {
                    warn!(%err, "stopping scan early");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
            tokio::select! {
                _ = tokio::time::sleep(dwell) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping scan");
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
