//! Deterministic scan cycle: sample → process → publish.
//!
//! Implements the cyclic executive with fixed-period pacing, cycle time
//! measurement, overrun detection, and the scan body that invokes every
//! logic block exactly once per cycle, in fixed order.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO)`: RT priority.
//!
//! ## Cycle Loop
//! With the `rt` feature: absolute-time sleep on `CLOCK_MONOTONIC` for
//! drift-free pacing. Simulation mode paces with `Instant` + sleep.
//! Overruns are counted and logged; the scan body itself can never abort
//! a cycle.
//!
//! ## Scan Body
//! Sample command bits → analog simulator (edge pulses) → fault
//! evaluation → sequencing controller (timers advance) → one snapshot
//! publish. Outputs are never written incrementally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use aqua_common::config::EngineConfig;
use aqua_common::registers::{OutputSnapshot, RegisterImage};
use aqua_common::state::PlantState;

use crate::logic::sim::AnalogSimulator;
use crate::safety::{evaluate_faults, level_ok};
use crate::state::sequence::{SequenceController, SequenceInputs};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
///
/// Updated every cycle with no allocation. Provides min/max/avg for
/// cycle latency monitoring and overrun detection.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns] (expected vs actual wake).
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
        if latency_ns > self.max_latency_ns {
            self.max_latency_ns = latency_ns;
        }
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup.
///
/// The scan body itself is total; nothing inside a cycle can fail.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages (prevent page faults in the
/// scan loop). No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{mlockall, MlockAllFlags};
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(()) // No-op in simulation mode
}

/// Prefault stack pages to prevent page faults during RT execution.
fn prefault_stack() {
    // Touch 1 MB of stack to prefault pages.
    let mut buf = [0u8; 1024 * 1024];
    // Prevent the compiler from optimizing away the write.
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(()) // No-op in simulation mode
}

/// Set SCHED_FIFO with the given RT priority.
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(()) // No-op in simulation mode
}

/// Perform the full RT setup sequence.
///
/// Must be called before entering the scan loop. In simulation mode
/// (no `rt` feature), all RT calls are no-ops.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Scan Runner ────────────────────────────────────────────────────

/// The cyclic executive.
///
/// Owns every per-cycle state block (edge detectors inside the
/// simulator, both on-delay timers inside the sequencing controller)
/// and the pacing infrastructure. `step()` executes exactly one scan
/// cycle; `run()` paces `step()` at the configured period until the
/// shutdown flag drops.
pub struct ScanRunner {
    image: Arc<RegisterImage>,
    simulator: AnalogSimulator,
    sequence: SequenceController,
    /// Cycle statistics.
    pub stats: CycleStats,
    cycle_count: u64,
    cycle_dt: Duration,
    cycle_time_ns: i64,
}

impl ScanRunner {
    /// Create a scan runner over a shared register image.
    ///
    /// The config must already be validated; presets and the cycle
    /// period are taken as-is.
    pub fn new(config: &EngineConfig, image: Arc<RegisterImage>) -> Self {
        Self {
            image,
            simulator: AnalogSimulator::new(&config.initial),
            sequence: SequenceController::new(config.filter_delay(), config.uv_delay()),
            stats: CycleStats::new(),
            cycle_count: 0,
            cycle_dt: config.cycle_dt(),
            cycle_time_ns: i64::from(config.cycle_time_ms) * 1_000_000,
        }
    }

    /// Execute one scan cycle and return the published snapshot.
    ///
    /// Each logic block is invoked exactly once, in fixed order; the
    /// call discipline here is what makes the edge and timer contracts
    /// hold.
    pub fn step(&mut self) -> OutputSnapshot {
        // ═══ SAMPLE PHASE ═══
        let cmds = self.image.sample_commands();

        // ═══ PROCESS PHASE ═══
        self.simulator.apply(&cmds);
        let values = self.simulator.values();
        let alarms = evaluate_faults(&values);
        let level_ok = level_ok(values.level);

        let outputs = self.sequence.update(
            &SequenceInputs {
                start: cmds.start,
                emergency: cmds.emergency,
                level_ok,
                alarms,
            },
            self.cycle_dt,
        );

        // ═══ PUBLISH PHASE ═══
        self.cycle_count += 1;
        let snapshot = OutputSnapshot {
            cycle: self.cycle_count,
            analogs: [values.pressure, values.flow, values.turbidity, values.level],
            outputs: outputs.pack(),
            alarms: alarms.bits(),
            level_ok,
            plant_state: self.sequence.state() as u8,
            _pad: [0; 4],
        };
        self.image.publish(&snapshot);
        snapshot
    }

    /// Enter the paced scan loop until `running` drops to false.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running);
            Ok(())
        }
    }

    /// RT scan loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

        let clock = ClockId::CLOCK_MONOTONIC;
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

        while running.load(Ordering::SeqCst) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let cycle_start = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            self.step();

            let cycle_end = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            self.stats.record(duration_ns, wake_latency_ns);

            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                warn!(
                    duration_ns,
                    budget_ns = self.cycle_time_ns,
                    "scan cycle overrun"
                );
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation scan loop using `Instant` + `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) {
        use std::time::Instant;

        let cycle_duration = self.cycle_dt;

        while running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            self.step();

            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);

            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
                warn!(
                    duration_ns,
                    budget_ns = self.cycle_time_ns,
                    "scan cycle overrun"
                );
            }

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }

    /// Configured scan period.
    #[inline]
    pub const fn cycle_dt(&self) -> Duration {
        self.cycle_dt
    }

    /// Plant state derived on the last cycle.
    #[inline]
    pub const fn plant_state(&self) -> PlantState {
        self.sequence.state()
    }

    /// Cycles executed so far.
    #[inline]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Compute the difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
