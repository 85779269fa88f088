//! Plant constants shared by the engine and its tests.
//!
//! Alarm thresholds, simulation step sizes, analog channel band, and
//! initial process values. Numeric config parameters have const MIN/MAX
//! bounds checked by `EngineConfig::validate()`.

// ─── Analog Channel Band ────────────────────────────────────────────

/// Lower bound of every analog process variable.
pub const ANALOG_MIN: u16 = 0;
/// Upper bound of every analog process variable.
pub const ANALOG_MAX: u16 = 100;

// ─── Alarm Thresholds ───────────────────────────────────────────────

/// Pressure alert below this value [unit-less].
pub const PRESSURE_LOW: u16 = 20;
/// Pressure alert above this value.
pub const PRESSURE_HIGH: u16 = 80;
/// Flow alert below this value.
pub const FLOW_LOW: u16 = 10;
/// Turbidity alert above this value.
pub const TURBIDITY_HIGH: u16 = 15;
/// Level is adequate strictly above this value.
pub const LEVEL_LOW: u16 = 20;

// ─── Simulation Step Sizes ──────────────────────────────────────────

/// Pressure adjustment per simulation pulse.
pub const PRESSURE_STEP: u16 = 5;
/// Flow adjustment per simulation pulse.
pub const FLOW_STEP: u16 = 5;
/// Turbidity adjustment per simulation pulse.
pub const TURBIDITY_STEP: u16 = 2;
/// Level adjustment per simulation pulse.
pub const LEVEL_STEP: u16 = 5;

// ─── Initial Process Values ─────────────────────────────────────────

/// Pressure at engine initialization.
pub const DEFAULT_PRESSURE: u16 = 50;
/// Flow at engine initialization.
pub const DEFAULT_FLOW: u16 = 25;
/// Turbidity at engine initialization.
pub const DEFAULT_TURBIDITY: u16 = 5;
/// Water level at engine initialization.
pub const DEFAULT_LEVEL: u16 = 75;

// ─── Scan Cycle Bounds ──────────────────────────────────────────────

/// Default scan cycle period [ms].
pub const CYCLE_TIME_MS: u32 = 50;
/// Minimum scan cycle period [ms].
pub const CYCLE_TIME_MS_MIN: u32 = 1;
/// Maximum scan cycle period [ms].
pub const CYCLE_TIME_MS_MAX: u32 = 1000;

/// Default filter on-delay preset [s].
pub const FILTER_DELAY_S: f64 = 5.0;
/// Default UV-reactor on-delay preset [s].
pub const UV_DELAY_S: f64 = 5.0;
/// Maximum on-delay preset [s].
pub const DELAY_S_MAX: f64 = 3600.0;
