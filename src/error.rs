//! Error types for the control layer.
//!
//! `DlcError` is the single error type exposed by this crate. Validation
//! errors (`OutOfRange`, the invalid-identifier variants, `CapabilityAbsent`)
//! are raised strictly before any transport write, so a failed setter leaves
//! both the device and the local cache untouched. Transport failures are
//! wrapped once in `Transport` and propagated unchanged; they are never
//! retried and never swallowed.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, DlcError>;

/// Primary error type for DLC pro session operations.
#[derive(Error, Debug)]
pub enum DlcError {
    /// A value failed an inclusive range check. No write has occurred.
    #[error("{value} is not within the permitted {parameter} range [{min}, {max}]")]
    OutOfRange {
        /// The rejected value (for envelope checks, the offending edge).
        value: f64,
        /// Label of the checked quantity (e.g. "scan frequency", "scan").
        parameter: String,
        /// Inclusive lower bound of the permitted range.
        min: f64,
        /// Inclusive upper bound of the permitted range.
        max: f64,
    },

    /// A scan output channel name or code matched no known channel.
    #[error("'{0}' is not a scan output channel (expected PC, CC, OutA or OutB)")]
    InvalidChannelName(String),

    /// A remote-control addressee matched neither 'cc' nor 'pc'.
    #[error("'{0}' is not a remote-control addressee (expected 'cc' or 'pc')")]
    InvalidAddressee(String),

    /// A remote-control input name or code matched no known input port.
    #[error("'{0}' is not an analogue remote input (expected Fine1, Fine2, Fast3 or Fast4)")]
    InvalidInputChannel(String),

    /// A wavelength or temperature setter was invoked on a session
    /// configured without that capability.
    #[error("laser has no {0} setting (capability disabled in session config)")]
    CapabilityAbsent(&'static str),

    /// Snapshot save target already exists; snapshots are never overwritten.
    #[error("snapshot file '{}' already exists", .0.display())]
    SnapshotExists(PathBuf),

    /// Operation is deliberately unsupported, not transiently failing.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A sweep-rate calculation was requested before any calibration was set.
    #[error("no scan calibration set; pass a MHz-per-unit calibration first")]
    CalibrationUnset,

    /// The transport returned a JSON value of an unexpected shape.
    #[error("unexpected value {value} for parameter '{path}'")]
    UnexpectedValue {
        /// Hierarchical parameter path that was read.
        path: String,
        /// The value the transport handed back.
        value: serde_json::Value,
    },

    /// Failure raised by the transport collaborator, propagated unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    /// Snapshot file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display_names_parameter_and_bounds() {
        let err = DlcError::OutOfRange {
            value: 22.0,
            parameter: "scan".into(),
            min: -10.0,
            max: 10.0,
        };
        assert_eq!(
            err.to_string(),
            "22 is not within the permitted scan range [-10, 10]"
        );
    }

    #[test]
    fn capability_absent_display() {
        let err = DlcError::CapabilityAbsent("wavelength");
        assert!(err.to_string().contains("wavelength"));
    }
}
