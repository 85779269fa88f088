//! Configuration structures for the scan engine.
//!
//! All config types use `serde::Deserialize` for TOML loading. Optional
//! fields use `#[serde(default)]` so older config files keep loading.
//! `validate()` enforces the numeric bounds; an invalid configuration is
//! fatal before the engine starts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ANALOG_MAX, CYCLE_TIME_MS, CYCLE_TIME_MS_MAX, CYCLE_TIME_MS_MIN, DEFAULT_FLOW, DEFAULT_LEVEL,
    DEFAULT_PRESSURE, DEFAULT_TURBIDITY, DELAY_S_MAX, FILTER_DELAY_S, UV_DELAY_S,
};

// ─── Engine Config ──────────────────────────────────────────────────

/// Top-level scan engine configuration.
///
/// Loaded from TOML at startup, immutable once the engine runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scan cycle period [ms] (default: 50).
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u32,

    /// Filter on-delay preset [s] (default: 5.0).
    #[serde(default = "default_filter_delay_s")]
    pub filter_delay_s: f64,

    /// UV-reactor on-delay preset [s] (default: 5.0).
    #[serde(default = "default_uv_delay_s")]
    pub uv_delay_s: f64,

    /// Initial analog process values.
    #[serde(default)]
    pub initial: InitialValues,
}

/// Analog channel values at engine initialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitialValues {
    #[serde(default = "default_pressure")]
    pub pressure: u16,
    #[serde(default = "default_flow")]
    pub flow: u16,
    #[serde(default = "default_turbidity")]
    pub turbidity: u16,
    #[serde(default = "default_level")]
    pub level: u16,
}

fn default_cycle_time_ms() -> u32 {
    CYCLE_TIME_MS
}
fn default_filter_delay_s() -> f64 {
    FILTER_DELAY_S
}
fn default_uv_delay_s() -> f64 {
    UV_DELAY_S
}
fn default_pressure() -> u16 {
    DEFAULT_PRESSURE
}
fn default_flow() -> u16 {
    DEFAULT_FLOW
}
fn default_turbidity() -> u16 {
    DEFAULT_TURBIDITY
}
fn default_level() -> u16 {
    DEFAULT_LEVEL
}

impl Default for InitialValues {
    fn default() -> Self {
        Self {
            pressure: DEFAULT_PRESSURE,
            flow: DEFAULT_FLOW,
            turbidity: DEFAULT_TURBIDITY,
            level: DEFAULT_LEVEL,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS,
            filter_delay_s: FILTER_DELAY_S,
            uv_delay_s: UV_DELAY_S,
            initial: InitialValues::default(),
        }
    }
}

impl EngineConfig {
    /// Validate parameter bounds.
    ///
    /// Rejects cycle periods outside [1, 1000] ms, negative, non-finite
    /// or oversized timer presets, and initial analog values outside
    /// [0, 100].
    pub fn validate(&self) -> Result<(), String> {
        if !(CYCLE_TIME_MS_MIN..=CYCLE_TIME_MS_MAX).contains(&self.cycle_time_ms) {
            return Err(format!(
                "cycle_time_ms {} outside [{CYCLE_TIME_MS_MIN}, {CYCLE_TIME_MS_MAX}]",
                self.cycle_time_ms
            ));
        }
        for (name, value) in [
            ("filter_delay_s", self.filter_delay_s),
            ("uv_delay_s", self.uv_delay_s),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
            if value > DELAY_S_MAX {
                return Err(format!("{name} {value} exceeds maximum {DELAY_S_MAX}"));
            }
        }
        for (name, value) in [
            ("initial.pressure", self.initial.pressure),
            ("initial.flow", self.initial.flow),
            ("initial.turbidity", self.initial.turbidity),
            ("initial.level", self.initial.level),
        ] {
            if value > ANALOG_MAX {
                return Err(format!("{name} {value} outside [0, {ANALOG_MAX}]"));
            }
        }
        Ok(())
    }

    /// Scan cycle period as a `Duration`.
    ///
    /// Only meaningful after `validate()` succeeded.
    #[inline]
    pub fn cycle_dt(&self) -> Duration {
        Duration::from_millis(u64::from(self.cycle_time_ms))
    }

    /// Filter on-delay preset as a `Duration`.
    #[inline]
    pub fn filter_delay(&self) -> Duration {
        Duration::from_secs_f64(self.filter_delay_s)
    }

    /// UV on-delay preset as a `Duration`.
    #[inline]
    pub fn uv_delay(&self) -> Duration {
        Duration::from_secs_f64(self.uv_delay_s)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
