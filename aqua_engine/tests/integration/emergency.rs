//! Integration test: emergency stop.
//!
//! Asserting emergency stops the pump on the next cycle and keeps the
//! start command ineffective until the emergency is released.

use std::sync::Arc;

use aqua_common::config::EngineConfig;
use aqua_common::registers::{BoolRegister, RegisterImage};
use aqua_common::state::PlantState;
use aqua_engine::cycle::ScanRunner;

// ── Helpers ─────────────────────────────────────────────────────────

fn engine() -> (ScanRunner, Arc<RegisterImage>) {
    let config = EngineConfig {
        filter_delay_s: 0.1,
        uv_delay_s: 0.1,
        ..EngineConfig::default()
    };
    let image = Arc::new(RegisterImage::new());
    (ScanRunner::new(&config, Arc::clone(&image)), image)
}

fn start_plant(engine: &mut ScanRunner, image: &RegisterImage) {
    image.write_command(BoolRegister::StartButton, true).unwrap();
    for _ in 0..6 {
        engine.step();
    }
    image.write_command(BoolRegister::StartButton, false).unwrap();
    assert_eq!(engine.plant_state(), PlantState::TreatmentActive);
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn emergency_stops_pump_on_next_cycle() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    image
        .write_command(BoolRegister::EmergencyButton, true)
        .unwrap();
    let snap = engine.step();

    // Pump is forced off the cycle the command is sampled; filter and
    // UV fall through the enable chain in the same sweep.
    assert!(!snap.actuators().pump);
    assert!(!snap.actuators().filter);
    assert!(!snap.actuators().uv_reactor);
    assert_eq!(snap.state(), PlantState::Idle);
    assert!(!image.read_bool(BoolRegister::FaultLight), "emergency is not a process fault");
}

#[test]
fn restart_ineffective_while_emergency_held() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    image
        .write_command(BoolRegister::EmergencyButton, true)
        .unwrap();
    engine.step();

    image.write_command(BoolRegister::StartButton, true).unwrap();
    for _ in 0..5 {
        let snap = engine.step();
        assert!(!snap.actuators().pump, "start must not win against emergency");
    }

    // Release: the held start command is sampled on the next cycle and
    // the chain restarts from the beginning of its delays.
    image
        .write_command(BoolRegister::EmergencyButton, false)
        .unwrap();
    let snap = engine.step();
    assert!(snap.actuators().pump);
    assert!(!snap.actuators().filter, "delays restart after an emergency");
    assert_eq!(snap.state(), PlantState::PumpRunning);
}

#[test]
fn emergency_wins_over_simultaneous_start() {
    let (mut engine, image) = engine();

    image.write_command(BoolRegister::StartButton, true).unwrap();
    image
        .write_command(BoolRegister::EmergencyButton, true)
        .unwrap();
    let snap = engine.step();
    assert!(!snap.actuators().pump);
    assert_eq!(snap.state(), PlantState::Idle);
}
