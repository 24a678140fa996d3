//! Channel code registry.
//!
//! Bidirectional mapping between the symbolic names the DLC pro manual uses
//! and the integer codes the device protocol expects. The conversions here
//! are the only place in the crate that knows the wire codes; everything
//! else handles the typed enums.
//!
//! All conversions are pure and deterministic. String parsing is
//! case-insensitive. Serde serializes the enums as their integer codes so a
//! saved snapshot matches what the device reports verbatim.

use crate::error::DlcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OutputChannel
// =============================================================================

/// Physical output the internal scan generator drives.
///
/// `Pc` (piezo voltage) and `Cc` (laser current) act on the laser head
/// directly; `OutA`/`OutB` route the waveform to the BNC connectors on the
/// controller's front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum OutputChannel {
    /// Piezo voltage control (wire code 50).
    Pc,
    /// Laser current control (wire code 51).
    Cc,
    /// Auxiliary analogue output A (wire code 20).
    OutA,
    /// Auxiliary analogue output B (wire code 21).
    OutB,
}

impl OutputChannel {
    /// Device-level integer code for this channel.
    pub fn code(self) -> i64 {
        match self {
            OutputChannel::Pc => 50,
            OutputChannel::Cc => 51,
            OutputChannel::OutA => 20,
            OutputChannel::OutB => 21,
        }
    }

    /// Canonical symbolic name, as printed in status output.
    pub fn name(self) -> &'static str {
        match self {
            OutputChannel::Pc => "PC",
            OutputChannel::Cc => "CC",
            OutputChannel::OutA => "OutA",
            OutputChannel::OutB => "OutB",
        }
    }

    /// Whether this channel is one of the auxiliary BNC outputs, for which
    /// the device reports no voltage or current limit.
    pub fn is_auxiliary(self) -> bool {
        matches!(self, OutputChannel::OutA | OutputChannel::OutB)
    }
}

impl From<OutputChannel> for i64 {
    fn from(ch: OutputChannel) -> i64 {
        ch.code()
    }
}

impl TryFrom<i64> for OutputChannel {
    type Error = DlcError;

    fn try_from(code: i64) -> Result<Self, DlcError> {
        match code {
            50 => Ok(OutputChannel::Pc),
            51 => Ok(OutputChannel::Cc),
            20 => Ok(OutputChannel::OutA),
            21 => Ok(OutputChannel::OutB),
            other => Err(DlcError::InvalidChannelName(other.to_string())),
        }
    }
}

impl FromStr for OutputChannel {
    type Err = DlcError;

    fn from_str(s: &str) -> Result<Self, DlcError> {
        match s.to_ascii_lowercase().as_str() {
            "pc" => Ok(OutputChannel::Pc),
            "cc" => Ok(OutputChannel::Cc),
            "outa" => Ok(OutputChannel::OutA),
            "outb" => Ok(OutputChannel::OutB),
            _ => Err(DlcError::InvalidChannelName(s.to_string())),
        }
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// InputChannel
// =============================================================================

/// Analogue remote control input port.
///
/// `NotSelected` is what the device reports when no input is routed; it is
/// never accepted as a value to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum InputChannel {
    /// No input routed (wire code -3, read-back only).
    NotSelected,
    /// Fine input 1 (wire code 0).
    Fine1,
    /// Fine input 2 (wire code 1).
    Fine2,
    /// Fast input 3 (wire code 2).
    Fast3,
    /// Fast input 4 (wire code 3).
    Fast4,
}

impl InputChannel {
    /// Device-level integer code for this input.
    pub fn code(self) -> i64 {
        match self {
            InputChannel::NotSelected => -3,
            InputChannel::Fine1 => 0,
            InputChannel::Fine2 => 1,
            InputChannel::Fast3 => 2,
            InputChannel::Fast4 => 3,
        }
    }

    /// Canonical symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            InputChannel::NotSelected => "NotSelected",
            InputChannel::Fine1 => "Fine1",
            InputChannel::Fine2 => "Fine2",
            InputChannel::Fast3 => "Fast3",
            InputChannel::Fast4 => "Fast4",
        }
    }
}

impl From<InputChannel> for i64 {
    fn from(ch: InputChannel) -> i64 {
        ch.code()
    }
}

impl TryFrom<i64> for InputChannel {
    type Error = DlcError;

    fn try_from(code: i64) -> Result<Self, DlcError> {
        match code {
            -3 => Ok(InputChannel::NotSelected),
            0 => Ok(InputChannel::Fine1),
            1 => Ok(InputChannel::Fine2),
            2 => Ok(InputChannel::Fast3),
            3 => Ok(InputChannel::Fast4),
            other => Err(DlcError::InvalidInputChannel(other.to_string())),
        }
    }
}

impl FromStr for InputChannel {
    type Err = DlcError;

    fn from_str(s: &str) -> Result<Self, DlcError> {
        match s.to_ascii_lowercase().as_str() {
            "fine1" => Ok(InputChannel::Fine1),
            "fine2" => Ok(InputChannel::Fine2),
            "fast3" => Ok(InputChannel::Fast3),
            "fast4" => Ok(InputChannel::Fast4),
            _ => Err(DlcError::InvalidInputChannel(s.to_string())),
        }
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Addressee
// =============================================================================

/// Which of the two analogue remote control instances subsequent remote
/// property accessors operate on.
///
/// Both remotes (current channel and piezo voltage channel) exist and may be
/// active simultaneously; selecting one is a cursor move, not a destructive
/// switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Addressee {
    /// The laser-current remote (`cc`).
    Cc,
    /// The piezo-voltage remote (`pc`).
    Pc,
}

impl Addressee {
    /// Path fragment used in the device parameter hierarchy.
    pub fn as_str(self) -> &'static str {
        match self {
            Addressee::Cc => "cc",
            Addressee::Pc => "pc",
        }
    }
}

impl FromStr for Addressee {
    type Err = DlcError;

    fn from_str(s: &str) -> Result<Self, DlcError> {
        match s.to_ascii_lowercase().as_str() {
            "cc" => Ok(Addressee::Cc),
            "pc" => Ok(Addressee::Pc),
            _ => Err(DlcError::InvalidAddressee(s.to_string())),
        }
    }
}

impl fmt::Display for Addressee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_channel_codes_round_trip() {
        for ch in [
            OutputChannel::Pc,
            OutputChannel::Cc,
            OutputChannel::OutA,
            OutputChannel::OutB,
        ] {
            assert_eq!(OutputChannel::try_from(ch.code()).unwrap(), ch);
        }
    }

    #[test]
    fn output_channel_parse_is_case_insensitive() {
        for s in ["pc", "PC", "Pc", "pC"] {
            assert_eq!(s.parse::<OutputChannel>().unwrap(), OutputChannel::Pc);
        }
        assert_eq!("outa".parse::<OutputChannel>().unwrap(), OutputChannel::OutA);
        assert_eq!("OUTB".parse::<OutputChannel>().unwrap(), OutputChannel::OutB);
    }

    #[test]
    fn output_channel_rejects_unknown_names_and_codes() {
        assert!(matches!(
            "piezo".parse::<OutputChannel>(),
            Err(DlcError::InvalidChannelName(_))
        ));
        assert!(OutputChannel::try_from(42).is_err());
    }

    #[test]
    fn input_channel_parse_matches_codes() {
        assert_eq!("Fine1".parse::<InputChannel>().unwrap().code(), 0);
        assert_eq!("fast4".parse::<InputChannel>().unwrap().code(), 3);
        assert_eq!(InputChannel::try_from(-3).unwrap(), InputChannel::NotSelected);
    }

    #[test]
    fn input_channel_rejects_not_selected_by_name() {
        // NotSelected is a read-back state, not a routable input.
        assert!("notselected".parse::<InputChannel>().is_err());
    }

    #[test]
    fn addressee_parse() {
        for s in ["cc", "CC", "Cc"] {
            assert_eq!(s.parse::<Addressee>().unwrap(), Addressee::Cc);
        }
        assert!(matches!(
            "dc".parse::<Addressee>(),
            Err(DlcError::InvalidAddressee(_))
        ));
    }

    #[test]
    fn channels_serialize_as_wire_codes() {
        let json = serde_json::to_value(OutputChannel::Pc).unwrap();
        assert_eq!(json, serde_json::json!(50));
        let json = serde_json::to_value(InputChannel::NotSelected).unwrap();
        assert_eq!(json, serde_json::json!(-3));
        let back: OutputChannel = serde_json::from_value(serde_json::json!(51)).unwrap();
        assert_eq!(back, OutputChannel::Cc);
    }
}
