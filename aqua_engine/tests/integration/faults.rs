//! Integration test: fault scenarios.
//!
//! Drives the simulated analog channels through their alarm thresholds
//! from a fully running plant and checks the alarm registers, the
//! aggregated fault, and the safety latch behavior.

use std::sync::Arc;

use aqua_common::config::EngineConfig;
use aqua_common::registers::{AnalogRegister, BoolRegister, RegisterImage};
use aqua_common::state::PlantState;
use aqua_engine::cycle::ScanRunner;

// ── Helpers ─────────────────────────────────────────────────────────

fn engine() -> (ScanRunner, Arc<RegisterImage>) {
    let config = EngineConfig {
        filter_delay_s: 0.1, // 2 cycles
        uv_delay_s: 0.1,
        ..EngineConfig::default()
    };
    let image = Arc::new(RegisterImage::new());
    (ScanRunner::new(&config, Arc::clone(&image)), image)
}

/// Start the plant and run it to TreatmentActive.
fn start_plant(engine: &mut ScanRunner, image: &RegisterImage) {
    image.write_command(BoolRegister::StartButton, true).unwrap();
    for _ in 0..6 {
        engine.step();
    }
    image.write_command(BoolRegister::StartButton, false).unwrap();
    assert_eq!(engine.plant_state(), PlantState::TreatmentActive);
}

/// Send one simulation pulse (rising edge + release) through the engine.
fn pulse(engine: &mut ScanRunner, image: &RegisterImage, reg: BoolRegister) {
    image.write_command(reg, true).unwrap();
    engine.step();
    image.write_command(reg, false).unwrap();
    engine.step();
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn low_pressure_fault_stops_the_chain() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    // 50 → 15 in 7 decrement pulses.
    for _ in 0..6 {
        pulse(&mut engine, &image, BoolRegister::PtDecSim);
        assert!(!image.read_bool(BoolRegister::PtAlert), "20 is not yet an alert");
    }
    // The 7th pulse crosses the threshold; the alert and the aggregated
    // fault land in the same scan cycle as the value change.
    image.write_command(BoolRegister::PtDecSim, true).unwrap();
    let snap = engine.step();
    assert_eq!(snap.analogs[AnalogRegister::PressureValue.index()], 15);
    assert!(image.read_bool(BoolRegister::PtAlert));
    assert!(image.read_bool(BoolRegister::FaultLight));
    assert_eq!(snap.state(), PlantState::Faulted);

    // Pump drops, and filter/UV fall with it through the enable chain.
    assert!(!image.read_bool(BoolRegister::Pump));
    assert!(!image.read_bool(BoolRegister::Filter));
    assert!(!image.read_bool(BoolRegister::UvReactor));
    assert!(!image.read_bool(BoolRegister::GreenLight));
    image.write_command(BoolRegister::PtDecSim, false).unwrap();
    engine.step();

    // Restoring pressure to 20 clears the alert; the latch was never
    // dropped, so the pump resumes without a new start command.
    pulse(&mut engine, &image, BoolRegister::PtIncSim);
    assert_eq!(image.read_analog(AnalogRegister::PressureValue), 20);
    assert!(!image.read_bool(BoolRegister::PtAlert));
    assert!(!image.read_bool(BoolRegister::FaultLight));
    assert!(image.read_bool(BoolRegister::Pump));
}

#[test]
fn high_turbidity_blocks_uv() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    // 5 → 17 in 6 increment pulses (step 2); the alert trips above 15.
    for _ in 0..5 {
        pulse(&mut engine, &image, BoolRegister::TurbIncSim);
        assert!(!image.read_bool(BoolRegister::TurbidityAlert));
    }
    image.write_command(BoolRegister::TurbIncSim, true).unwrap();
    let snap = engine.step();
    assert_eq!(snap.analogs[AnalogRegister::TurbidityValue.index()], 17);

    // UV is gated off the same cycle the alert appears. The alert also
    // raises the aggregated fault, which stops the pump-fed chain.
    assert!(image.read_bool(BoolRegister::TurbidityAlert));
    assert!(!image.read_bool(BoolRegister::UvReactor));
    assert!(image.read_bool(BoolRegister::FaultLight));
    assert!(!image.read_bool(BoolRegister::Pump));
}

#[test]
fn multiple_faults_accumulate_and_clear_independently() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    // Low pressure (7 pulses), low flow (4 pulses), high turbidity (6).
    for _ in 0..7 {
        pulse(&mut engine, &image, BoolRegister::PtDecSim);
    }
    for _ in 0..4 {
        pulse(&mut engine, &image, BoolRegister::FtDecSim);
    }
    for _ in 0..6 {
        pulse(&mut engine, &image, BoolRegister::TurbIncSim);
    }

    assert!(image.read_bool(BoolRegister::PtAlert));
    assert!(image.read_bool(BoolRegister::FtAlert));
    assert!(image.read_bool(BoolRegister::TurbidityAlert));
    assert!(image.read_bool(BoolRegister::FaultLight));

    // Clearing one alert keeps the aggregated fault up.
    pulse(&mut engine, &image, BoolRegister::PtIncSim);
    assert!(!image.read_bool(BoolRegister::PtAlert));
    assert!(image.read_bool(BoolRegister::FaultLight));
    assert!(!image.read_bool(BoolRegister::Pump));
}

#[test]
fn low_level_drops_the_latch() {
    let (mut engine, image) = engine();
    start_plant(&mut engine, &image);

    // 75 → 20 in 11 decrement pulses.
    for _ in 0..11 {
        pulse(&mut engine, &image, BoolRegister::LevelDecSim);
    }
    assert_eq!(image.read_analog(AnalogRegister::WaterLevel), 20);
    assert!(!image.read_bool(BoolRegister::LevelOk));
    assert!(image.read_bool(BoolRegister::FaultLight));
    assert!(!image.read_bool(BoolRegister::Pump));

    // Level restored: unlike a pressure fault, the latch was cleared,
    // so the pump stays off until a fresh start command.
    pulse(&mut engine, &image, BoolRegister::LevelIncSim);
    assert!(image.read_bool(BoolRegister::LevelOk));
    assert!(!image.read_bool(BoolRegister::FaultLight));
    assert!(!image.read_bool(BoolRegister::Pump));

    image.write_command(BoolRegister::StartButton, true).unwrap();
    engine.step();
    assert!(image.read_bool(BoolRegister::Pump));
}
