//! End-to-end session behaviour against the simulated controller: cache
//! coherence between the scan envelope and the active range, snapshot file
//! round trips, and the restore guarantee of the scan-stepping routine.

use dlc_control::transport::paths;
use dlc_control::{
    Addressee, Bounds, DlcError, DlcSession, InputChannel, OutputChannel, ParameterSnapshot,
    SessionConfig, SimTransport, Transport,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

async fn open_session(
    sim: SimTransport,
    config: SessionConfig,
) -> (Arc<SimTransport>, DlcSession) {
    let sim = Arc::new(sim);
    let session = DlcSession::open(sim.clone(), config).await.unwrap();
    (sim, session)
}

#[tokio::test]
async fn scan_envelope_follows_the_output_channel() {
    let config = SessionConfig::new("sim", 60.0).with_aux_output_range(Bounds::new(-2.0, 2.0));
    let (_sim, mut session) = open_session(SimTransport::new(), config).await;

    // Seeded on the piezo channel: voltage range 0..140.
    assert_eq!(session.scan().active_range(), Bounds::new(0.0, 140.0));
    session.scan().set_offset(100.0).await.unwrap();

    // Current channel: floor from config, clip from the device.
    session
        .scan()
        .set_output_channel(OutputChannel::Cc)
        .await
        .unwrap();
    assert_eq!(session.scan().active_range(), Bounds::new(60.0, 300.0));
    assert!(matches!(
        session.scan().set_offset(30.0).await.unwrap_err(),
        DlcError::OutOfRange { .. }
    ));

    // Auxiliary output: the configured range applies.
    session
        .scan()
        .set_output_channel(OutputChannel::OutA)
        .await
        .unwrap();
    assert_eq!(session.scan().active_range(), Bounds::new(-2.0, 2.0));
}

#[tokio::test]
async fn remote_selection_is_case_insensitive_and_idempotent() {
    let (sim, mut session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;

    for name in ["cc", "CC", "Cc"] {
        session.remote().select(name.parse::<Addressee>().unwrap());
    }
    assert_eq!(session.remote().selected(), Addressee::Cc);
    assert!(sim.set_calls().is_empty());

    session.remote().set_signal(InputChannel::Fast4).await.unwrap();
    assert_eq!(
        sim.value("laser1:dl:cc:external-input:signal"),
        Some(Value::from(3))
    );
}

#[tokio::test]
async fn snapshot_round_trips_through_a_file() {
    let config = SessionConfig::new("sim", 0.0).with_wavelength_setting(true);
    let (_sim, mut session) = open_session(SimTransport::new(), config).await;
    let dir = tempfile::tempdir().unwrap();

    let written = session
        .save_parameters(dir.path().join("bench"))
        .await
        .unwrap();
    assert_eq!(written, dir.path().join("bench.json"));

    let snapshot = DlcSession::read_parameters(&written).unwrap();
    assert_eq!(snapshot.scan.output_channel, OutputChannel::Pc);
    assert_eq!(snapshot.wavelength.setpoint, Some(1550.0));
    assert_eq!(snapshot.temperature.setpoint, None);

    // The file itself uses the legacy keys and integer channel codes.
    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(raw["scan"]["output channel"], Value::from(50));
    assert_eq!(raw["analogue remote"]["cc"]["signal"], Value::from(-3));
    assert_eq!(raw["wavelength"]["wl setpoint"], Value::from(1550.0));
}

#[tokio::test]
async fn saving_over_an_existing_snapshot_fails_without_touching_it() {
    let (_sim, mut session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("bench.json");
    std::fs::write(&target, "precious").unwrap();

    let err = session.save_parameters(&target).await.unwrap_err();
    assert!(matches!(err, DlcError::SnapshotExists(p) if p == target));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "precious");
}

#[tokio::test]
async fn all_parameters_picks_up_device_side_drift() {
    let (sim, mut session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;

    // Another agent (front panel, second script) moved the offset.
    sim.set(paths::SCAN_OFFSET, Value::from(33.0)).await.unwrap();
    let snapshot = session.all_parameters().await.unwrap();
    assert_eq!(snapshot.scan.offset, 33.0);
    // The refresh also updated the setter cache.
    assert_eq!(session.scan().state().offset, 33.0);
}

#[tokio::test]
async fn step_through_restores_offset_and_amplitude() {
    let (sim, mut session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;

    session
        .step_through_scan_range(5, Duration::ZERO)
        .await
        .unwrap();

    // Seeded offset 70 / amplitude 10 are back in place on the device.
    assert_eq!(sim.value(paths::SCAN_OFFSET), Some(Value::from(70.0)));
    assert_eq!(sim.value(paths::SCAN_AMPLITUDE), Some(Value::from(10.0)));
    // The walk really happened: amplitude zeroed, offset stepped from the
    // span end (75) down one amplitude (to 65) before the restore.
    assert_eq!(sim.set_calls()[0], (paths::SCAN_AMPLITUDE.to_string(), Value::from(0.0)));
    assert_eq!(sim.set_count_for(paths::SCAN_OFFSET), 6);
    let offsets: Vec<f64> = sim
        .set_calls()
        .iter()
        .filter(|(p, _)| p == paths::SCAN_OFFSET)
        .map(|(_, v)| v.as_f64().unwrap())
        .collect();
    assert_eq!(offsets, vec![75.0, 72.5, 70.0, 67.5, 65.0, 70.0]);
}

#[tokio::test]
async fn step_through_stops_early_but_still_restores() {
    // Span end right at the range floor: the second step already leaves the
    // permitted range.
    let sim = SimTransport::new()
        .with_value(paths::SCAN_END, Value::from(5.0))
        .with_value(paths::SCAN_OFFSET, Value::from(10.0));
    let (sim, mut session) = open_session(sim, SessionConfig::new("sim", 0.0)).await;

    session
        .step_through_scan_range(11, Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(sim.value(paths::SCAN_OFFSET), Some(Value::from(10.0)));
    assert_eq!(sim.value(paths::SCAN_AMPLITUDE), Some(Value::from(10.0)));
    // Rejected targets were never written to the device.
    assert!(sim
        .set_calls()
        .iter()
        .filter(|(p, _)| p == paths::SCAN_OFFSET)
        .all(|(_, v)| v.as_f64().unwrap() >= 0.0));
}

#[tokio::test]
async fn wavelength_surface_depends_on_the_configured_head() {
    let (_sim, session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;
    assert_eq!(session.wavelength_setpoint().await.unwrap(), None);
    assert!(matches!(
        session.set_wavelength_setpoint(1550.0).await.unwrap_err(),
        DlcError::CapabilityAbsent("wavelength")
    ));

    let config = SessionConfig::new("sim", 0.0).with_wavelength_setting(true);
    let (_sim, session) = open_session(SimTransport::new(), config).await;
    assert_eq!(session.wavelength_actual().await.unwrap(), Some(1550.02));
    session.set_wavelength_setpoint(1520.0).await.unwrap();
    assert!(session.set_wavelength_setpoint(1.0).await.is_err());
}

#[tokio::test]
async fn sweep_rate_matches_a_saved_snapshot() {
    let (_sim, mut session) = open_session(SimTransport::new(), SessionConfig::new("sim", 0.0)).await;
    let dir = tempfile::tempdir().unwrap();
    let written = session.save_parameters(dir.path().join("rate")).await.unwrap();
    let snapshot = ParameterSnapshot::read(written).unwrap();

    let live = session.sweep_rate_mhz_per_sec(Some(50.0)).await.unwrap();
    let from_file = dlc_control::sweep_rate_from_snapshot(&snapshot, 50.0);
    assert_eq!(live, from_file);
}
