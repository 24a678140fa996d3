//! Internal scan generator control.
//!
//! The scan generator drives one output channel with a triangular waveform.
//! Its amplitude and offset are two views of the same interval: the swept
//! envelope is `[offset - amplitude/2, offset + amplitude/2]`, and that
//! envelope must stay inside the range of whichever channel the scan is
//! routed to (piezo voltage range, laser current range, or the configured
//! auxiliary range). [`ScanController`] keeps a local mirror of the scan
//! state so each setter can validate against the other half of the pair
//! without a device round trip.
//!
//! Every setter validates first, writes through the transport second, and
//! mirrors into the cache only after the write succeeded. A validation
//! failure therefore leaves both the device and the cache untouched.

use crate::channel::OutputChannel;
use crate::limits::{check_in_range, Bounds, DeviceLimits};
use crate::snapshot::ParameterSnapshot;
use crate::transport::{self, paths, Transport};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Cached state of the internal scan generator.
///
/// Serde field names match the snapshot file layout; the output channel
/// serializes as its integer wire code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanState {
    /// Scan generator on/off.
    pub enabled: bool,
    /// Channel the waveform is routed to.
    #[serde(rename = "output channel")]
    pub output_channel: OutputChannel,
    /// Scan frequency in Hz.
    pub frequency: f64,
    /// Peak-to-peak amplitude in the active channel's units.
    pub amplitude: f64,
    /// Waveform centre in the active channel's units.
    pub offset: f64,
    /// Span start (derived view of amplitude/offset).
    pub start: f64,
    /// Span end (derived view of amplitude/offset).
    pub end: f64,
}

/// Range-checked access to the scan generator.
///
/// Owned by the session facade; not safe for concurrent callers.
pub struct ScanController {
    transport: Arc<dyn Transport>,
    limits: DeviceLimits,
    aux_output_range: Option<Bounds>,
    state: ScanState,
    range: Bounds,
}

impl ScanController {
    /// Read the full scan state from the device and derive the active range
    /// from the just-read channel. Requires the limits to be fetched first.
    pub(crate) async fn populate(
        transport: Arc<dyn Transport>,
        limits: DeviceLimits,
        aux_output_range: Option<Bounds>,
    ) -> Result<Self> {
        let state = read_state(transport.as_ref()).await?;
        let range = active_range_for(state.output_channel, &limits, aux_output_range);
        debug!(?state, %range, "scan state populated");
        Ok(Self {
            transport,
            limits,
            aux_output_range,
            state,
            range,
        })
    }

    /// The cached scan state. Pure cache read, no transport access; call
    /// [`refresh`](Self::refresh) first when freshness matters.
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// The amplitude/offset/start/end range for the current output channel.
    pub fn active_range(&self) -> Bounds {
        self.range
    }

    /// Re-read every scan field from the device and recompute the range.
    pub async fn refresh(&mut self) -> Result<&ScanState> {
        self.state = read_state(self.transport.as_ref()).await?;
        self.range =
            active_range_for(self.state.output_channel, &self.limits, self.aux_output_range);
        Ok(&self.state)
    }

    /// Replace the cached device limits (after an explicit limits refresh)
    /// and recompute the active range.
    pub(crate) fn set_limits(&mut self, limits: DeviceLimits) {
        self.limits = limits;
        self.range =
            active_range_for(self.state.output_channel, &self.limits, self.aux_output_range);
    }

    /// Switch the scan generator on or off.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        transport::set_bool(self.transport.as_ref(), paths::SCAN_ENABLED, enabled).await?;
        self.state.enabled = enabled;
        Ok(())
    }

    /// Route the scan waveform to a different output channel.
    ///
    /// Recomputes the active range: voltage range for `Pc`, current range
    /// for `Cc`, the configured auxiliary range (or unbounded, with a
    /// warning) for `OutA`/`OutB`.
    #[instrument(skip(self), err)]
    pub async fn set_output_channel(&mut self, channel: OutputChannel) -> Result<()> {
        transport::set_i64(
            self.transport.as_ref(),
            paths::SCAN_OUTPUT_CHANNEL,
            channel.code(),
        )
        .await?;
        self.state.output_channel = channel;
        self.range = active_range_for(channel, &self.limits, self.aux_output_range);
        Ok(())
    }

    /// Set the scan frequency, validated against the configured bounds.
    pub async fn set_frequency(&mut self, hz: f64) -> Result<()> {
        check_in_range(hz, "scan frequency", self.limits.frequency)?;
        transport::set_f64(self.transport.as_ref(), paths::SCAN_FREQUENCY, hz).await?;
        self.state.frequency = hz;
        Ok(())
    }

    /// Set the peak-to-peak amplitude.
    ///
    /// The envelope implied by the new amplitude and the *current cached*
    /// offset must fit the active range; sequential offset/amplitude calls
    /// therefore compose.
    #[instrument(skip(self), err)]
    pub async fn set_amplitude(&mut self, amplitude: f64) -> Result<()> {
        self.check_envelope(amplitude, self.state.offset)?;
        transport::set_f64(self.transport.as_ref(), paths::SCAN_AMPLITUDE, amplitude).await?;
        self.state.amplitude = amplitude;
        Ok(())
    }

    /// Set the waveform centre; symmetric counterpart of
    /// [`set_amplitude`](Self::set_amplitude).
    #[instrument(skip(self), err)]
    pub async fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.check_envelope(self.state.amplitude, offset)?;
        transport::set_f64(self.transport.as_ref(), paths::SCAN_OFFSET, offset).await?;
        self.state.offset = offset;
        Ok(())
    }

    /// Set the span start, validated directly against the active range.
    pub async fn set_start(&mut self, start: f64) -> Result<()> {
        check_in_range(start, "scan start", self.range)?;
        transport::set_f64(self.transport.as_ref(), paths::SCAN_START, start).await?;
        self.state.start = start;
        Ok(())
    }

    /// Set the span end, validated directly against the active range.
    pub async fn set_end(&mut self, end: f64) -> Result<()> {
        check_in_range(end, "scan end", self.range)?;
        transport::set_f64(self.transport.as_ref(), paths::SCAN_END, end).await?;
        self.state.end = end;
        Ok(())
    }

    /// Check that the `[offset - amplitude/2, offset + amplitude/2]`
    /// envelope fits the active range.
    fn check_envelope(&self, amplitude: f64, offset: f64) -> Result<()> {
        check_in_range(offset - amplitude / 2.0, "scan", self.range)?;
        check_in_range(offset + amplitude / 2.0, "scan", self.range)
    }
}

async fn read_state(transport: &dyn Transport) -> Result<ScanState> {
    let channel_code = transport::get_i64(transport, paths::SCAN_OUTPUT_CHANNEL).await?;
    Ok(ScanState {
        enabled: transport::get_bool(transport, paths::SCAN_ENABLED).await?,
        output_channel: OutputChannel::try_from(channel_code)?,
        frequency: transport::get_f64(transport, paths::SCAN_FREQUENCY).await?,
        amplitude: transport::get_f64(transport, paths::SCAN_AMPLITUDE).await?,
        offset: transport::get_f64(transport, paths::SCAN_OFFSET).await?,
        start: transport::get_f64(transport, paths::SCAN_START).await?,
        end: transport::get_f64(transport, paths::SCAN_END).await?,
    })
}

fn active_range_for(
    channel: OutputChannel,
    limits: &DeviceLimits,
    aux_output_range: Option<Bounds>,
) -> Bounds {
    match channel {
        OutputChannel::Pc => limits.voltage,
        OutputChannel::Cc => limits.current,
        OutputChannel::OutA | OutputChannel::OutB => match aux_output_range {
            Some(bounds) => bounds,
            None => {
                warn!(%channel, "scan range for auxiliary outputs is not limited");
                Bounds::unbounded()
            }
        },
    }
}

// =============================================================================
// Sweep rate arithmetic
// =============================================================================

/// Frequency span swept per second, in MHz/s, for a triangular scan.
///
/// `scan_freq` in Hz, `peak_to_peak` in Vpp (or mA), `scaling` in mA/V or
/// V/V, `calibration` in MHz/mA or MHz/V. The factor of two in the period
/// accounts for the triangle wave covering the span twice per cycle.
pub fn sweep_rate(scan_freq: f64, peak_to_peak: f64, scaling: f64, calibration: f64) -> f64 {
    let scan_period = 1.0 / (2.0 * scan_freq);
    peak_to_peak * scaling * calibration / scan_period
}

/// Sweep rate computed from a saved snapshot (unit scaling assumed 1).
pub fn sweep_rate_from_snapshot(snapshot: &ParameterSnapshot, calibration: f64) -> f64 {
    sweep_rate(snapshot.scan.frequency, snapshot.scan.amplitude, 1.0, calibration)
}
