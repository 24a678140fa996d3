//! `dlc-control`
//!
//! Host-side control layer for Toptica DLC pro class tunable diode laser
//! controllers.
//!
//! The crate models the controller as a flat parameter tree behind a
//! [`Transport`] and layers range-checked, cache-coherent access on top:
//!
//! - [`DlcSession`]: the facade the lab code talks to (emission, wavelength,
//!   temperature, snapshots, scan stepping)
//! - [`ScanController`]: internal scan generator with amplitude/offset
//!   envelope validation against the active output channel's range
//! - [`RemoteControl`]: cursor-addressed analogue remote routing
//! - [`DeviceLimits`]: hard limits fetched once per connection
//! - [`SimTransport`]: in-memory device model for tests and dry runs
//!
//! Every setter validates before it writes and mirrors into its cache only
//! after the write succeeded, so a rejected value leaves both the device and
//! the local state untouched.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dlc_control::{DlcSession, SessionConfig, SimTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> dlc_control::Result<()> {
//! let config = SessionConfig::new("192.168.1.34", 0.0);
//! let mut session = DlcSession::open(Arc::new(SimTransport::new()), config).await?;
//! session.scan().set_offset(70.0).await?;
//! println!("{}", session.all_parameters().await?);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod limits;
pub mod remote;
pub mod scan;
pub mod session;
pub mod sim;
pub mod snapshot;
pub mod transport;

pub use channel::{Addressee, InputChannel, OutputChannel};
pub use config::SessionConfig;
pub use error::{DlcError, Result};
pub use limits::{Bounds, DeviceLimits};
pub use remote::{RemoteControl, RemoteState};
pub use scan::{sweep_rate, sweep_rate_from_snapshot, ScanController, ScanState};
pub use session::{DlcSession, EmissionStatus};
pub use sim::SimTransport;
pub use snapshot::{ParameterSnapshot, RemoteSnapshot, TemperatureSnapshot, WavelengthSnapshot};
pub use transport::Transport;
