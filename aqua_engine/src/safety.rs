//! Per-cycle fault evaluation.
//!
//! Pure function of the four analog channels: no internal state, total
//! over the input domain, recomputed every scan cycle. Any set alarm
//! flag raises the aggregated system fault that gates the sequencing
//! chain.

use aqua_common::consts::{FLOW_LOW, LEVEL_LOW, PRESSURE_HIGH, PRESSURE_LOW, TURBIDITY_HIGH};
use aqua_common::state::AlarmFlags;

use crate::logic::sim::AnalogValues;

/// Whether the reservoir level is adequate.
///
/// The physical sensor reads "level adequate" strictly above the low
/// mark; the low-level alarm is the inversion of this bit.
#[inline]
pub const fn level_ok(level: u16) -> bool {
    level > LEVEL_LOW
}

/// Evaluate all alarm flags for the current analog values.
pub fn evaluate_faults(values: &AnalogValues) -> AlarmFlags {
    let mut flags = AlarmFlags::empty();

    if values.pressure < PRESSURE_LOW || values.pressure > PRESSURE_HIGH {
        flags |= AlarmFlags::PRESSURE;
    }
    if values.flow < FLOW_LOW {
        flags |= AlarmFlags::FLOW;
    }
    if values.turbidity > TURBIDITY_HIGH {
        flags |= AlarmFlags::TURBIDITY;
    }
    if !level_ok(values.level) {
        flags |= AlarmFlags::LOW_LEVEL;
    }

    flags
}

// ─── Tests ──────────────────────────────────────────────────────────
