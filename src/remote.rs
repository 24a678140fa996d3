//! Analogue remote control (ARC) routing.
//!
//! The controller has two independent ARC instances, one feeding the laser
//! current loop and one feeding the piezo voltage loop; both may be active
//! at the same time. [`RemoteControl`] keeps a cached mirror of each and a
//! cursor saying which instance the property accessors currently address.
//! Moving the cursor is purely local; the non-addressed instance keeps its
//! state.

use crate::channel::{Addressee, InputChannel};
use crate::error::{DlcError, Result};
use crate::transport::{self, paths, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Cached settings of one ARC instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Whether this remote is active.
    pub enabled: bool,
    /// Scale factor applied to the input signal.
    pub factor: f64,
    /// Which physical input port feeds this remote.
    pub signal: InputChannel,
}

/// Cursor-addressed access to the two ARC instances.
pub struct RemoteControl {
    transport: Arc<dyn Transport>,
    selected: Addressee,
    cc: RemoteState,
    pc: RemoteState,
}

impl RemoteControl {
    /// Read both ARC instances from the device. The cursor starts on the
    /// current-channel remote.
    pub(crate) async fn populate(transport: Arc<dyn Transport>) -> Result<Self> {
        let cc = read_state(transport.as_ref(), Addressee::Cc).await?;
        let pc = read_state(transport.as_ref(), Addressee::Pc).await?;
        debug!(?cc, ?pc, "remote control state populated");
        Ok(Self {
            transport,
            selected: Addressee::Cc,
            cc,
            pc,
        })
    }

    /// Move the cursor. Local only; no transport access, no state change on
    /// either instance.
    pub fn select(&mut self, addressee: Addressee) {
        self.selected = addressee;
    }

    /// The currently addressed instance.
    pub fn selected(&self) -> Addressee {
        self.selected
    }

    /// Cached state of one instance.
    pub fn state(&self, addressee: Addressee) -> &RemoteState {
        match addressee {
            Addressee::Cc => &self.cc,
            Addressee::Pc => &self.pc,
        }
    }

    /// Cached state of both instances, `(cc, pc)`.
    pub fn states(&self) -> (&RemoteState, &RemoteState) {
        (&self.cc, &self.pc)
    }

    /// Read the enabled flag of the addressed remote from the device.
    pub async fn enabled(&mut self) -> Result<bool> {
        let path = paths::external_input(self.selected, "enabled");
        let value = transport::get_bool(self.transport.as_ref(), &path).await?;
        self.state_mut().enabled = value;
        Ok(value)
    }

    /// Enable or disable the addressed remote.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        let path = paths::external_input(self.selected, "enabled");
        transport::set_bool(self.transport.as_ref(), &path, enabled).await?;
        self.state_mut().enabled = enabled;
        Ok(())
    }

    /// Read the scale factor of the addressed remote from the device.
    pub async fn factor(&mut self) -> Result<f64> {
        let path = paths::external_input(self.selected, "factor");
        let value = transport::get_f64(self.transport.as_ref(), &path).await?;
        self.state_mut().factor = value;
        Ok(value)
    }

    /// Set the scale factor of the addressed remote.
    pub async fn set_factor(&mut self, factor: f64) -> Result<()> {
        let path = paths::external_input(self.selected, "factor");
        transport::set_f64(self.transport.as_ref(), &path, factor).await?;
        self.state_mut().factor = factor;
        Ok(())
    }

    /// Read the input port feeding the addressed remote from the device.
    pub async fn signal(&mut self) -> Result<InputChannel> {
        let path = paths::external_input(self.selected, "signal");
        let code = transport::get_i64(self.transport.as_ref(), &path).await?;
        let input = InputChannel::try_from(code)?;
        self.state_mut().signal = input;
        Ok(input)
    }

    /// Route an input port into the addressed remote.
    ///
    /// `NotSelected` is a read-back state, not a routable input.
    pub async fn set_signal(&mut self, input: InputChannel) -> Result<()> {
        if input == InputChannel::NotSelected {
            return Err(DlcError::InvalidInputChannel(input.name().to_string()));
        }
        let path = paths::external_input(self.selected, "signal");
        transport::set_i64(self.transport.as_ref(), &path, input.code()).await?;
        self.state_mut().signal = input;
        Ok(())
    }

    fn state_mut(&mut self) -> &mut RemoteState {
        match self.selected {
            Addressee::Cc => &mut self.cc,
            Addressee::Pc => &mut self.pc,
        }
    }
}

async fn read_state(transport: &dyn Transport, addressee: Addressee) -> Result<RemoteState> {
    let enabled =
        transport::get_bool(transport, &paths::external_input(addressee, "enabled")).await?;
    let factor =
        transport::get_f64(transport, &paths::external_input(addressee, "factor")).await?;
    let code = transport::get_i64(transport, &paths::external_input(addressee, "signal")).await?;
    Ok(RemoteState {
        enabled,
        factor,
        signal: InputChannel::try_from(code)?,
    })
}
