//! Integration test: register image boundary under concurrency.
//!
//! A transport thread hammers reads and whitelist-violating writes
//! while the engine steps; snapshots must stay internally consistent
//! and rejected writes must never disturb engine state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use aqua_common::config::EngineConfig;
use aqua_common::registers::{AnalogRegister, BoolRegister, RegisterError, RegisterImage};
use aqua_engine::cycle::ScanRunner;

fn engine() -> (ScanRunner, Arc<RegisterImage>) {
    let config = EngineConfig {
        filter_delay_s: 0.1,
        uv_delay_s: 0.1,
        ..EngineConfig::default()
    };
    let image = Arc::new(RegisterImage::new());
    (ScanRunner::new(&config, Arc::clone(&image)), image)
}

#[test]
fn snapshots_stay_consistent_under_concurrent_polling() {
    let (mut engine, image) = engine();
    let stop = Arc::new(AtomicBool::new(false));

    let poller = {
        let image = Arc::clone(&image);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut last_cycle = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let snap = image.read_snapshot();
                // Cycle counter never goes backwards.
                assert!(snap.cycle >= last_cycle);
                last_cycle = snap.cycle;
                // Published invariants hold in every observed snapshot:
                // analogs in band, lights consistent with outputs.
                for value in snap.analogs {
                    assert!(value <= 100);
                }
                let outputs = snap.actuators();
                let fault = snap.alarm_flags().system_fault();
                assert_eq!(outputs.fault_light, fault);
                assert_eq!(outputs.green_light, outputs.pump && !fault);
                assert_eq!(outputs.red_light, outputs.uv_reactor && !fault);
            }
        })
    };

    image.write_command(BoolRegister::StartButton, true).unwrap();
    for _ in 0..200 {
        engine.step();
    }

    stop.store(true, Ordering::Relaxed);
    poller.join().unwrap();
}

#[test]
fn rejected_writes_leave_engine_state_untouched() {
    let (mut engine, image) = engine();
    image.write_command(BoolRegister::StartButton, true).unwrap();
    for _ in 0..6 {
        engine.step();
    }
    let before = image.read_snapshot();

    // Every engine-owned coil rejects, and nothing changes.
    for reg in BoolRegister::ALL {
        if reg.is_command() {
            continue;
        }
        assert_eq!(
            image.write_command(reg, false),
            Err(RegisterError::NotWritable(reg.name()))
        );
    }
    assert!(matches!(
        image.write_named("Water_Level", true),
        Err(RegisterError::NotWritable(_))
    ));
    assert!(matches!(
        image.write_named("LowLevelSensor", true),
        Err(RegisterError::UnknownRegister(_))
    ));

    assert_eq!(image.read_snapshot(), before);
    let after = engine.step();
    assert_eq!(after.actuators(), before.actuators());
    assert_eq!(after.analogs, before.analogs);
}

#[test]
fn command_writes_land_at_most_one_cycle_late() {
    let (mut engine, image) = engine();

    image.write_command(BoolRegister::StartButton, true).unwrap();
    let snap = engine.step();
    assert!(snap.actuators().pump, "command sampled on the very next cycle");

    // A write from the transport never tears: the engine sees either
    // the old or the new value of the whole bit, and analog registers
    // only ever change by whole steps.
    image.write_command(BoolRegister::FtIncSim, true).unwrap();
    let snap = engine.step();
    let flow = snap.analogs[AnalogRegister::FlowValue.index()];
    assert!(flow == 25 || flow == 30);
    let snap = engine.step();
    assert_eq!(snap.analogs[AnalogRegister::FlowValue.index()], 30);
}
