//! `dlcctl`: command-line laser control.
//!
//! Mirrors the handful of operations the lab actually runs from a shell:
//! print the emission status, dump or save the parameter snapshot, and step
//! through the active scan span. Only the simulated controller is built in;
//! wire transports live out of tree and plug in through the `Transport`
//! trait.
//!
//! # Usage
//!
//! ```bash
//! dlcctl --sim -e -p
//! dlcctl --sim -s monday_morning -f /data/laser
//! dlcctl --sim -n 20
//! ```

use anyhow::Context;
use clap::Parser;
use dlc_control::{DlcSession, SessionConfig, SimTransport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dlcctl")]
#[command(about = "Control a DLC pro tunable laser controller", long_about = None)]
struct Cli {
    /// Controller host address (overrides the config file)
    #[arg(short = 'i', long)]
    host: Option<String>,

    /// TOML session config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lower bound of the permitted laser current in mA (overrides the
    /// config file; the device does not report it)
    #[arg(long)]
    current_floor_ma: Option<f64>,

    /// Print the emission status
    #[arg(short, long)]
    emission_status: bool,

    /// Print the laser parameters
    #[arg(short, long)]
    parameters: bool,

    /// Save all laser parameters to a json file with this name
    #[arg(short, long, value_name = "FILENAME")]
    save_filename: Option<PathBuf>,

    /// Folder to save the parameter file in
    #[arg(short, long, default_value = "")]
    folder: PathBuf,

    /// Step through the active scan span in this many steps
    #[arg(short = 'n', long, value_name = "STEPS")]
    steps: Option<usize>,

    /// Dwell per scan step in seconds
    #[arg(long, default_value_t = 1.0)]
    dwell: f64,

    /// Run against the built-in simulated controller
    #[arg(long)]
    sim: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if !cli.sim {
        anyhow::bail!(
            "no wire transport is built into dlcctl; pass --sim to run against \
             the simulated controller"
        );
    }
    let mut session = DlcSession::open(Arc::new(SimTransport::new()), config).await?;

    if cli.emission_status {
        println!("{}", session.emission_status().await?);
    }
    if cli.parameters {
        println!("{}", session.all_parameters().await?);
    }
    if let Some(filename) = &cli.save_filename {
        let written = session.save_parameters(cli.folder.join(filename)).await?;
        println!("Saved parameters to {}", written.display());
    }
    if let Some(steps) = cli.steps {
        session
            .step_through_scan_range(steps, Duration::from_secs_f64(cli.dwell))
            .await?;
    }

    session.close().await?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    if let Some(path) = &cli.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        let mut config: SessionConfig = toml::from_str(&raw)?;
        if let Some(host) = &cli.host {
            config.host = host.clone();
        }
        if let Some(floor) = cli.current_floor_ma {
            config.current_floor_ma = floor;
        }
        Ok(config)
    } else {
        let host = cli.host.clone().unwrap_or_else(|| "sim".to_string());
        let floor = match cli.current_floor_ma {
            Some(floor) => floor,
            None if cli.sim => 0.0,
            None => anyhow::bail!(
                "pass --current-floor-ma or a --config file; the device does not \
                 report the permitted current floor"
            ),
        };
        Ok(SessionConfig::new(host, floor))
    }
}
