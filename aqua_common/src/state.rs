//! Process state types for the scan engine.
//!
//! All enums use `#[repr(u8)]` for compact memory layout and zero-copy
//! snapshot transport. Includes the plant sequencing state, the alarm
//! flag set, and the actuator output set published every cycle.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ─── Plant Sequencing State ─────────────────────────────────────────

/// Plant sequencing state, derived once per scan cycle.
///
/// An auditable reformulation of the sequencing equations: the state
/// never feeds back into the outputs, it is derived from the pump latch,
/// the two on-delay timers, and the alarm flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlantState {
    /// Pump off, no treatment in progress.
    Idle = 0,
    /// Pump just started, filter delay not yet accumulating.
    PumpRunning = 1,
    /// Pump on, filter on-delay accumulating.
    FilterDelaying = 2,
    /// Filter just engaged, UV delay not yet accumulating.
    FilterActive = 3,
    /// Filter on, UV on-delay accumulating.
    UvDelaying = 4,
    /// Full treatment chain active (pump + filter + UV).
    TreatmentActive = 5,
    /// System fault active; all actuators forced off.
    Faulted = 6,
}

impl PlantState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::PumpRunning),
            2 => Some(Self::FilterDelaying),
            3 => Some(Self::FilterActive),
            4 => Some(Self::UvDelaying),
            5 => Some(Self::TreatmentActive),
            6 => Some(Self::Faulted),
            _ => None,
        }
    }
}

impl Default for PlantState {
    fn default() -> Self {
        Self::Idle
    }
}

// ─── Alarm Flags ────────────────────────────────────────────────────

bitflags! {
    /// Per-cycle alarm flags produced by the fault evaluator.
    ///
    /// Any set flag raises the aggregated system fault.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlarmFlags: u8 {
        /// Pressure outside the [low, high] band.
        const PRESSURE  = 0x01;
        /// Flow below minimum.
        const FLOW      = 0x02;
        /// Turbidity above maximum.
        const TURBIDITY = 0x04;
        /// Water level at or below the low mark.
        const LOW_LEVEL = 0x08;
    }
}

impl AlarmFlags {
    /// Aggregated system fault: true iff any alarm flag is set.
    #[inline]
    pub const fn system_fault(&self) -> bool {
        !self.is_empty()
    }
}

impl Default for AlarmFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Actuator Output Set ────────────────────────────────────────────

/// Actuator and status-light outputs computed by the sequencing
/// controller each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorOutputs {
    /// Intake pump contactor.
    pub pump: bool,
    /// Filtration stage.
    pub filter: bool,
    /// UV disinfection reactor.
    pub uv_reactor: bool,
    /// Pump running light.
    pub green_light: bool,
    /// Filtration active light.
    pub orange_light: bool,
    /// Treatment complete light.
    pub red_light: bool,
    /// System fault light.
    pub fault_light: bool,
}

impl ActuatorOutputs {
    /// All outputs off.
    pub const fn off() -> Self {
        Self {
            pump: false,
            filter: false,
            uv_reactor: false,
            green_light: false,
            orange_light: false,
            red_light: false,
            fault_light: false,
        }
    }

    /// Pack the 7 output bits into a single `u8` for snapshot transport.
    #[inline]
    pub const fn pack(&self) -> u8 {
        (self.pump as u8)
            | ((self.filter as u8) << 1)
            | ((self.uv_reactor as u8) << 2)
            | ((self.green_light as u8) << 3)
            | ((self.orange_light as u8) << 4)
            | ((self.red_light as u8) << 5)
            | ((self.fault_light as u8) << 6)
    }

    /// Unpack from a single `u8`.
    #[inline]
    pub const fn unpack(v: u8) -> Self {
        Self {
            pump: (v & 0x01) != 0,
            filter: (v & 0x02) != 0,
            uv_reactor: (v & 0x04) != 0,
            green_light: (v & 0x08) != 0,
            orange_light: (v & 0x10) != 0,
            red_light: (v & 0x20) != 0,
            fault_light: (v & 0x40) != 0,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
