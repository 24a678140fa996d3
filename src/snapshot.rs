//! Parameter snapshots.
//!
//! A [`ParameterSnapshot`] captures every settable laser parameter at one
//! instant. The JSON layout is fixed: files written by earlier lab tooling
//! use these exact nested keys ("analogue remote", "wl setpoint", ...), and
//! snapshots taken here must stay readable by the plotting scripts that
//! consume them. Channels appear as their integer wire codes.

use crate::error::{DlcError, Result};
use crate::remote::RemoteState;
use crate::scan::ScanState;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Both analogue remote instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Remote feeding the laser current loop.
    pub cc: RemoteState,
    /// Remote feeding the piezo voltage loop.
    pub pc: RemoteState,
}

/// Wavelength setpoint and readback, `None` on heads without the capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthSnapshot {
    /// Commanded wavelength in nm.
    #[serde(rename = "wl setpoint")]
    pub setpoint: Option<f64>,
    /// Measured wavelength in nm.
    #[serde(rename = "wl actual")]
    pub actual: Option<f64>,
}

/// Diode temperature setpoint and readback, `None` when not exposed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSnapshot {
    /// Commanded diode temperature in degC.
    #[serde(rename = "temp setpoint")]
    pub setpoint: Option<f64>,
    /// Measured diode temperature in degC.
    #[serde(rename = "temp actual")]
    pub actual: Option<f64>,
}

/// All settable parameters of the controller at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    /// When the snapshot was taken (local time).
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// Internal scan generator settings.
    pub scan: ScanState,
    /// Analogue remote control settings, both instances.
    #[serde(rename = "analogue remote")]
    pub analogue_remote: RemoteSnapshot,
    /// Wavelength setpoint and readback.
    pub wavelength: WavelengthSnapshot,
    /// Temperature setpoint and readback.
    pub temperature: TemperatureSnapshot,
}

impl ParameterSnapshot {
    /// Assemble a snapshot timestamped now.
    pub fn new(
        scan: ScanState,
        analogue_remote: RemoteSnapshot,
        wavelength: WavelengthSnapshot,
        temperature: TemperatureSnapshot,
    ) -> Self {
        // Truncated to microseconds, the precision the file format keeps.
        let now = Local::now().naive_local();
        let timestamp = now
            .with_nanosecond(now.nanosecond() / 1000 * 1000)
            .unwrap_or(now);
        Self {
            timestamp,
            scan,
            analogue_remote,
            wavelength,
            temperature,
        }
    }

    /// Write the snapshot as pretty-printed JSON, appending a `.json`
    /// extension when missing. Refuses to overwrite: an existing file at the
    /// resolved path raises [`DlcError::SnapshotExists`] and is left intact.
    /// Returns the path actually written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_json_extension(path.as_ref());
        if path.exists() {
            return Err(DlcError::SnapshotExists(path));
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "parameter snapshot saved");
        Ok(path)
    }

    /// Read a snapshot from disk, appending a `.json` extension when
    /// missing. Needs no live session.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = ensure_json_extension(path.as_ref());
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl fmt::Display for ParameterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        let rule_len = match &value {
            serde_json::Value::Object(map) => map
                .keys()
                .map(String::len)
                .max()
                .unwrap_or(0)
                .max(50),
            _ => 50,
        };
        let rule = "-".repeat(rule_len);
        writeln!(f, "{rule}")?;
        write_table(f, &value, 0)?;
        writeln!(f, "{rule}")
    }
}

/// Recursive key/value table: nested objects indent with a ` | ` gutter,
/// scalar values align on the longest key of their object.
fn write_table(f: &mut fmt::Formatter<'_>, value: &serde_json::Value, depth: usize) -> fmt::Result {
    let serde_json::Value::Object(map) = value else {
        return writeln!(f, "{value}");
    };
    let pad = map
        .iter()
        .filter(|(_, v)| !v.is_object())
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0);
    let gutter = " | ".repeat(depth);
    for (key, val) in map {
        match val {
            serde_json::Value::Object(_) => {
                writeln!(f, "{gutter}{key}:")?;
                write_table(f, val, depth + 1)?;
            }
            serde_json::Value::String(s) => writeln!(f, "{gutter}{key:<pad$}: {s}")?,
            serde_json::Value::Null => writeln!(f, "{gutter}{key:<pad$}: -")?,
            other => writeln!(f, "{gutter}{key:<pad$}: {other}")?,
        }
    }
    Ok(())
}

fn ensure_json_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        let mut os = path.as_os_str().to_os_string();
        os.push(".json");
        PathBuf::from(os)
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    // Matches what older tooling wrote: "2021-03-16 14:25:03.614023".
    const WRITE: &str = "%Y-%m-%d %H:%M:%S%.6f";
    const READ: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(WRITE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, READ).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{InputChannel, OutputChannel};

    fn sample() -> ParameterSnapshot {
        let remote = RemoteState {
            enabled: false,
            factor: 1.0,
            signal: InputChannel::NotSelected,
        };
        ParameterSnapshot::new(
            ScanState {
                enabled: true,
                output_channel: OutputChannel::Pc,
                frequency: 20.0,
                amplitude: 10.0,
                offset: 70.0,
                start: 65.0,
                end: 75.0,
            },
            RemoteSnapshot {
                cc: remote,
                pc: RemoteState {
                    signal: InputChannel::Fine1,
                    ..remote
                },
            },
            WavelengthSnapshot {
                setpoint: Some(1550.0),
                actual: Some(1550.02),
            },
            TemperatureSnapshot {
                setpoint: None,
                actual: None,
            },
        )
    }

    #[test]
    fn json_uses_legacy_key_names_and_integer_codes() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["scan"]["output channel"], serde_json::json!(50));
        assert_eq!(
            value["analogue remote"]["pc"]["signal"],
            serde_json::json!(0)
        );
        assert_eq!(value["wavelength"]["wl setpoint"], serde_json::json!(1550.0));
        assert_eq!(value["temperature"]["temp setpoint"], serde_json::json!(null));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn save_appends_json_extension_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let snap = sample();
        let written = snap.save(dir.path().join("params")).unwrap();
        assert_eq!(written, dir.path().join("params.json"));
        let back = ParameterSnapshot::read(dir.path().join("params")).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn save_never_overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("params.json");
        std::fs::write(&target, "precious").unwrap();

        let err = sample().save(&target).unwrap_err();
        assert!(matches!(err, DlcError::SnapshotExists(p) if p == target));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "precious");
    }

    #[test]
    fn reads_a_legacy_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = serde_json::to_value(sample()).unwrap();
        value["timestamp"] = serde_json::json!("2021-03-16 14:25:03.614023");
        let target = dir.path().join("legacy.json");
        std::fs::write(&target, serde_json::to_string(&value).unwrap()).unwrap();
        let snap = ParameterSnapshot::read(&target).unwrap();
        assert_eq!(snap.timestamp.format("%Y").to_string(), "2021");
    }

    #[test]
    fn display_nests_remote_states() {
        let text = sample().to_string();
        assert!(text.contains("scan:"));
        assert!(text.contains("analogue remote:"));
        assert!(text.contains(" | cc:"));
        assert!(text.contains("temp setpoint"));
    }
}
