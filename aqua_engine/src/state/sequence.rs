//! Treatment sequencing controller.
//!
//! Produces the actuator commands from operator commands, alarm flags
//! and the two on-delay timers:
//!
//! - Pump latch: set by start, held while running, cleared by emergency
//!   or low level. The latch survives a transient system fault (the pump
//!   output is gated, the latch is not), so the pump resumes when a
//!   fault clears, unless the fault was the level itself.
//! - Filter engages after its on-delay of continuous pump operation.
//! - UV engages after its on-delay of continuous filter operation.
//! - Status lights mirror the chain; the fault light mirrors the
//!   aggregated system fault.
//!
//! All logic is total: every input combination produces an output set.

use std::time::Duration;

use aqua_common::state::{ActuatorOutputs, AlarmFlags, PlantState};

use crate::logic::timer::OnDelayTimer;

// ─── Controller Inputs ──────────────────────────────────────────────

/// Inputs sampled for one sequencing update.
#[derive(Debug, Clone, Copy)]
pub struct SequenceInputs {
    /// Operator start command.
    pub start: bool,
    /// Operator emergency stop.
    pub emergency: bool,
    /// Derived level-adequate bit.
    pub level_ok: bool,
    /// Alarm flags for the current cycle.
    pub alarms: AlarmFlags,
}

// ─── Sequencing Controller ──────────────────────────────────────────

/// Sequencing state machine: pump latch plus the filter and UV
/// on-delay timers.
#[derive(Debug, Clone)]
pub struct SequenceController {
    pump_latch: bool,
    filter_timer: OnDelayTimer,
    uv_timer: OnDelayTimer,
    state: PlantState,
}

impl SequenceController {
    /// Create a controller with the configured on-delay presets.
    pub const fn new(filter_delay: Duration, uv_delay: Duration) -> Self {
        Self {
            pump_latch: false,
            filter_timer: OnDelayTimer::new(filter_delay),
            uv_timer: OnDelayTimer::new(uv_delay),
            state: PlantState::Idle,
        }
    }

    /// Advance one scan cycle and compute the actuator outputs.
    ///
    /// Must be invoked exactly once per cycle; the timers advance as a
    /// side effect.
    pub fn update(&mut self, inputs: &SequenceInputs, dt: Duration) -> ActuatorOutputs {
        let system_fault = inputs.alarms.system_fault();

        // Set/reset latch: emergency and low level dominate, start sets,
        // the latch holds itself.
        self.pump_latch =
            !inputs.emergency && inputs.level_ok && (self.pump_latch || inputs.start);

        let pump = self.pump_latch && !system_fault;

        let filter_elapsed = self.filter_timer.update(pump, dt);
        let filter = filter_elapsed && pump && !inputs.alarms.contains(AlarmFlags::PRESSURE);

        let uv_elapsed = self.uv_timer.update(filter, dt);
        let uv = uv_elapsed && pump && !inputs.alarms.contains(AlarmFlags::TURBIDITY);

        let outputs = ActuatorOutputs {
            pump,
            filter,
            uv_reactor: uv,
            green_light: pump && !system_fault,
            orange_light: filter && !system_fault,
            red_light: uv && !system_fault,
            fault_light: system_fault,
        };

        self.state = self.derive_state(&outputs, system_fault, dt);
        outputs
    }

    /// Derive the auditable plant state from the output set and timers.
    ///
    /// The state is observational only: outputs are always computed from
    /// the equations above, never from this enum, so the output truth
    /// table cannot drift.
    fn derive_state(
        &self,
        outputs: &ActuatorOutputs,
        system_fault: bool,
        dt: Duration,
    ) -> PlantState {
        if system_fault {
            return PlantState::Faulted;
        }
        if !outputs.pump {
            return PlantState::Idle;
        }
        if !outputs.filter {
            // First enabled cycle of the filter delay counts as the pump
            // starting up.
            if self.filter_timer.elapsed() <= dt {
                return PlantState::PumpRunning;
            }
            return PlantState::FilterDelaying;
        }
        if !outputs.uv_reactor {
            if self.uv_timer.elapsed() <= dt {
                return PlantState::FilterActive;
            }
            return PlantState::UvDelaying;
        }
        PlantState::TreatmentActive
    }

    /// Plant state derived on the last update.
    #[inline]
    pub const fn state(&self) -> PlantState {
        self.state
    }

    /// Whether the pump latch is currently set.
    #[inline]
    pub const fn pump_latched(&self) -> bool {
        self.pump_latch
    }

    /// Explicitly drop the latch and restart both delays.
    pub fn reset(&mut self) {
        self.pump_latch = false;
        self.filter_timer.update(false, Duration::ZERO);
        self.uv_timer.update(false, Duration::ZERO);
        self.state = PlantState::Idle;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
