//! Register address map and the concurrent register image.
//!
//! The register image is the boundary between the scan engine and the
//! external transport: the engine samples command bits at the top of each
//! cycle and publishes every output as one consistent snapshot at the end
//! of the cycle. The transport may read any register at any rate and may
//! write only the command whitelist.
//!
//! ## Lock-Free Publication
//!
//! The output snapshot is guarded by an odd/even write sequence:
//! - Odd = publish in progress (reader must retry)
//! - Even = committed (reader can safely copy the snapshot)
//!
//! Command bits are individual atomics: a write landing between cycles is
//! picked up at the next input sample, at most one cycle late, and a
//! single register's value can never tear.

use core::cell::UnsafeCell;
use core::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};

use static_assertions::const_assert_eq;
use thiserror::Error;

use crate::consts::{DEFAULT_FLOW, DEFAULT_LEVEL, DEFAULT_PRESSURE, DEFAULT_TURBIDITY};
use crate::state::{ActuatorOutputs, AlarmFlags, PlantState};

// ─── Boolean Registers ──────────────────────────────────────────────

/// Boolean register identifiers.
///
/// The discriminant is the coil address the transport collaborator
/// depends on. Addresses 13–15 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoolRegister {
    /// Intake pump contactor (engine-owned).
    Pump = 0,
    /// Filtration stage (engine-owned).
    Filter = 1,
    /// UV disinfection reactor (engine-owned).
    UvReactor = 2,
    /// Operator start command.
    StartButton = 3,
    /// Operator emergency stop. Held true until explicitly released.
    EmergencyButton = 4,
    /// Derived level-adequate bit (engine-owned, never writable).
    LevelOk = 5,
    /// Pump running light (engine-owned).
    GreenLight = 6,
    /// Filtration active light (engine-owned).
    OrangeLight = 7,
    /// Treatment complete light (engine-owned).
    RedLight = 8,
    /// System fault light (engine-owned).
    FaultLight = 9,
    /// Pressure alarm (engine-owned).
    PtAlert = 10,
    /// Flow alarm (engine-owned).
    FtAlert = 11,
    /// Turbidity alarm (engine-owned).
    TurbidityAlert = 12,
    /// Pressure increment simulation pulse.
    PtIncSim = 16,
    /// Pressure decrement simulation pulse.
    PtDecSim = 17,
    /// Flow increment simulation pulse.
    FtIncSim = 18,
    /// Flow decrement simulation pulse.
    FtDecSim = 19,
    /// Turbidity increment simulation pulse.
    TurbIncSim = 20,
    /// Turbidity decrement simulation pulse.
    TurbDecSim = 21,
    /// Level increment simulation pulse.
    LevelIncSim = 22,
    /// Level decrement simulation pulse.
    LevelDecSim = 23,
}

impl BoolRegister {
    /// Every boolean register, in coil address order.
    pub const ALL: [Self; 21] = [
        Self::Pump,
        Self::Filter,
        Self::UvReactor,
        Self::StartButton,
        Self::EmergencyButton,
        Self::LevelOk,
        Self::GreenLight,
        Self::OrangeLight,
        Self::RedLight,
        Self::FaultLight,
        Self::PtAlert,
        Self::FtAlert,
        Self::TurbidityAlert,
        Self::PtIncSim,
        Self::PtDecSim,
        Self::FtIncSim,
        Self::FtDecSim,
        Self::TurbIncSim,
        Self::TurbDecSim,
        Self::LevelIncSim,
        Self::LevelDecSim,
    ];

    /// Coil address on the wire.
    #[inline]
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Convert from a coil address. Returns `None` for reserved addresses.
    pub const fn from_address(addr: u8) -> Option<Self> {
        match addr {
            0 => Some(Self::Pump),
            1 => Some(Self::Filter),
            2 => Some(Self::UvReactor),
            3 => Some(Self::StartButton),
            4 => Some(Self::EmergencyButton),
            5 => Some(Self::LevelOk),
            6 => Some(Self::GreenLight),
            7 => Some(Self::OrangeLight),
            8 => Some(Self::RedLight),
            9 => Some(Self::FaultLight),
            10 => Some(Self::PtAlert),
            11 => Some(Self::FtAlert),
            12 => Some(Self::TurbidityAlert),
            16 => Some(Self::PtIncSim),
            17 => Some(Self::PtDecSim),
            18 => Some(Self::FtIncSim),
            19 => Some(Self::FtDecSim),
            20 => Some(Self::TurbIncSim),
            21 => Some(Self::TurbDecSim),
            22 => Some(Self::LevelIncSim),
            23 => Some(Self::LevelDecSim),
            _ => None,
        }
    }

    /// Stable wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pump => "Pump",
            Self::Filter => "Filter",
            Self::UvReactor => "UVReactor",
            Self::StartButton => "StartButton",
            Self::EmergencyButton => "EmergencyButton",
            Self::LevelOk => "LevelOk",
            Self::GreenLight => "GreenLight",
            Self::OrangeLight => "OrangeLight",
            Self::RedLight => "RedLight",
            Self::FaultLight => "FaultLight",
            Self::PtAlert => "PT_Alert",
            Self::FtAlert => "FT_Alert",
            Self::TurbidityAlert => "Turbidity_Alert",
            Self::PtIncSim => "PT_Inc_Sim",
            Self::PtDecSim => "PT_Dec_Sim",
            Self::FtIncSim => "FT_Inc_Sim",
            Self::FtDecSim => "FT_Dec_Sim",
            Self::TurbIncSim => "Turb_Inc_Sim",
            Self::TurbDecSim => "Turb_Dec_Sim",
            Self::LevelIncSim => "Level_Inc_Sim",
            Self::LevelDecSim => "Level_Dec_Sim",
        }
    }

    /// Look up a register by its stable wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.name() == name)
    }

    /// Whether the register belongs to the external command whitelist.
    ///
    /// Everything else is engine-owned and rejected at the write boundary.
    #[inline]
    pub const fn is_command(self) -> bool {
        self.command_slot().is_some()
    }

    /// Slot in the command bit array, `None` for engine-owned registers.
    const fn command_slot(self) -> Option<usize> {
        match self {
            Self::StartButton => Some(0),
            Self::EmergencyButton => Some(1),
            Self::PtIncSim => Some(2),
            Self::PtDecSim => Some(3),
            Self::FtIncSim => Some(4),
            Self::FtDecSim => Some(5),
            Self::TurbIncSim => Some(6),
            Self::TurbDecSim => Some(7),
            Self::LevelIncSim => Some(8),
            Self::LevelDecSim => Some(9),
            _ => None,
        }
    }
}

/// Number of externally writable command bits.
const COMMAND_COUNT: usize = 10;

// ─── Analog Registers ───────────────────────────────────────────────

/// Analog channel identifiers. The discriminant is the holding-register
/// address on the wire. All channels are engine-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnalogRegister {
    /// Line pressure.
    PressureValue = 0,
    /// Intake flow.
    FlowValue = 1,
    /// Water turbidity.
    TurbidityValue = 2,
    /// Reservoir level.
    WaterLevel = 3,
}

impl AnalogRegister {
    /// Every analog register, in address order.
    pub const ALL: [Self; 4] = [
        Self::PressureValue,
        Self::FlowValue,
        Self::TurbidityValue,
        Self::WaterLevel,
    ];

    /// Holding-register address on the wire.
    #[inline]
    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Index into the snapshot's analog array.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PressureValue => "Pressure_Value",
            Self::FlowValue => "Flow_Value",
            Self::TurbidityValue => "Turbidity_Value",
            Self::WaterLevel => "Water_Level",
        }
    }

    /// Look up an analog register by its stable wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.name() == name)
    }
}

// ─── Register Errors ────────────────────────────────────────────────

/// Rejected register access from the external boundary.
///
/// Engine state is never affected by a rejected access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// No register with this name exists.
    #[error("unknown register: {0}")]
    UnknownRegister(String),
    /// The register is engine-owned and not writable from outside.
    #[error("register {0} is engine-owned and read-only at the boundary")]
    NotWritable(&'static str),
}

// ─── Sampled Command Inputs ─────────────────────────────────────────

/// Command bits sampled once at the top of a scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandInputs {
    /// Operator start command.
    pub start: bool,
    /// Operator emergency stop.
    pub emergency: bool,
    /// Raw simulation command bits (edge detection happens in the engine).
    pub pt_inc: bool,
    pub pt_dec: bool,
    pub ft_inc: bool,
    pub ft_dec: bool,
    pub turb_inc: bool,
    pub turb_dec: bool,
    pub level_inc: bool,
    pub level_dec: bool,
}

// ─── Output Snapshot ────────────────────────────────────────────────

/// Engine outputs published as one unit at the end of every scan cycle.
///
/// `repr(C)` with packed bit fields so the layout is stable for any
/// future zero-copy transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct OutputSnapshot {
    /// Scan cycle counter at publication.
    pub cycle: u64,
    /// Analog process values [0,100], indexed by `AnalogRegister::index`.
    pub analogs: [u16; 4],
    /// Packed actuator output bits (`ActuatorOutputs::pack`).
    pub outputs: u8,
    /// Packed alarm flag bits (`AlarmFlags::bits`).
    pub alarms: u8,
    /// Derived level-adequate bit.
    pub level_ok: bool,
    /// Plant sequencing state discriminant.
    pub plant_state: u8,
    /// Padding to an 8-byte multiple.
    pub _pad: [u8; 4],
}

const_assert_eq!(core::mem::size_of::<OutputSnapshot>(), 24);
const_assert_eq!(core::mem::align_of::<OutputSnapshot>(), 8);

impl OutputSnapshot {
    /// Snapshot at engine initialization: all actuators off, no alarms,
    /// analog channels at their plant defaults.
    pub const fn initial() -> Self {
        Self {
            cycle: 0,
            analogs: [
                DEFAULT_PRESSURE,
                DEFAULT_FLOW,
                DEFAULT_TURBIDITY,
                DEFAULT_LEVEL,
            ],
            outputs: 0,
            alarms: 0,
            level_ok: true,
            plant_state: PlantState::Idle as u8,
            _pad: [0; 4],
        }
    }

    /// Unpacked actuator outputs.
    #[inline]
    pub const fn actuators(&self) -> ActuatorOutputs {
        ActuatorOutputs::unpack(self.outputs)
    }

    /// Unpacked alarm flags.
    #[inline]
    pub fn alarm_flags(&self) -> AlarmFlags {
        AlarmFlags::from_bits_truncate(self.alarms)
    }

    /// Decoded plant state (`Idle` if the discriminant is ever invalid).
    #[inline]
    pub fn state(&self) -> PlantState {
        PlantState::from_u8(self.plant_state).unwrap_or_default()
    }
}

impl Default for OutputSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

// ─── Register Image ─────────────────────────────────────────────────

/// Shared store of every register visible at the plant boundary.
///
/// Single-writer (the engine publishes, the transport only reads outputs
/// and writes command bits). Safe for concurrent access from one engine
/// thread and any number of transport threads.
pub struct RegisterImage {
    /// Externally writable command bits.
    commands: [AtomicBool; COMMAND_COUNT],
    /// Odd/even publication sequence guarding `snapshot`.
    seq: AtomicU32,
    /// Last committed output snapshot.
    snapshot: UnsafeCell<OutputSnapshot>,
    /// Count of rejected boundary writes (diagnostic).
    rejected_writes: AtomicU64,
}

// SAFETY: `snapshot` is only written by the single engine thread inside
// `publish`, and concurrent readers discard any copy whose sequence
// changed underneath (odd/even protocol).
unsafe impl Sync for RegisterImage {}

impl RegisterImage {
    /// Create a register image with all commands false and the initial
    /// output snapshot committed.
    pub fn new() -> Self {
        Self {
            commands: [const { AtomicBool::new(false) }; COMMAND_COUNT],
            seq: AtomicU32::new(0),
            snapshot: UnsafeCell::new(OutputSnapshot::initial()),
            rejected_writes: AtomicU64::new(0),
        }
    }

    // ── External boundary ──

    /// Write a command bit from the external boundary.
    ///
    /// # Errors
    /// `RegisterError::NotWritable` for engine-owned registers; engine
    /// state is untouched.
    pub fn write_command(&self, reg: BoolRegister, value: bool) -> Result<(), RegisterError> {
        match reg.command_slot() {
            Some(slot) => {
                self.commands[slot].store(value, Ordering::Release);
                Ok(())
            }
            None => {
                self.rejected_writes.fetch_add(1, Ordering::Relaxed);
                Err(RegisterError::NotWritable(reg.name()))
            }
        }
    }

    /// Write a command bit by its stable wire name.
    ///
    /// # Errors
    /// `UnknownRegister` for names outside the map, `NotWritable` for
    /// engine-owned coils and for analog names (those are not coils).
    pub fn write_named(&self, name: &str, value: bool) -> Result<(), RegisterError> {
        match BoolRegister::from_name(name) {
            Some(reg) => self.write_command(reg, value),
            None => {
                self.rejected_writes.fetch_add(1, Ordering::Relaxed);
                if let Some(analog) = AnalogRegister::from_name(name) {
                    Err(RegisterError::NotWritable(analog.name()))
                } else {
                    Err(RegisterError::UnknownRegister(name.to_owned()))
                }
            }
        }
    }

    /// Read any boolean register: command bits from their atomics,
    /// engine outputs from the committed snapshot.
    pub fn read_bool(&self, reg: BoolRegister) -> bool {
        if let Some(slot) = reg.command_slot() {
            return self.commands[slot].load(Ordering::Acquire);
        }
        let snap = self.read_snapshot();
        let outputs = snap.actuators();
        let alarms = snap.alarm_flags();
        match reg {
            BoolRegister::Pump => outputs.pump,
            BoolRegister::Filter => outputs.filter,
            BoolRegister::UvReactor => outputs.uv_reactor,
            BoolRegister::GreenLight => outputs.green_light,
            BoolRegister::OrangeLight => outputs.orange_light,
            BoolRegister::RedLight => outputs.red_light,
            BoolRegister::FaultLight => outputs.fault_light,
            BoolRegister::PtAlert => alarms.contains(AlarmFlags::PRESSURE),
            BoolRegister::FtAlert => alarms.contains(AlarmFlags::FLOW),
            BoolRegister::TurbidityAlert => alarms.contains(AlarmFlags::TURBIDITY),
            BoolRegister::LevelOk => snap.level_ok,
            // Command registers handled above.
            _ => unreachable!("command registers read from atomics"),
        }
    }

    /// Read an analog channel from the committed snapshot.
    pub fn read_analog(&self, reg: AnalogRegister) -> u16 {
        self.read_snapshot().analogs[reg.index()]
    }

    /// Copy the last committed output snapshot, retrying while a
    /// publication is in flight.
    pub fn read_snapshot(&self) -> OutputSnapshot {
        loop {
            let s1 = self.seq.load(Ordering::Acquire);
            if s1 & 1 != 0 {
                core::hint::spin_loop();
                continue;
            }
            // SAFETY: a torn copy is discarded below when the sequence
            // changed during the read.
            let data = unsafe { core::ptr::read_volatile(self.snapshot.get()) };
            fence(Ordering::Acquire);
            let s2 = self.seq.load(Ordering::Relaxed);
            if s1 == s2 {
                return data;
            }
        }
    }

    /// Number of boundary writes rejected so far.
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes.load(Ordering::Relaxed)
    }

    // ── Engine side ──

    /// Sample every command bit once, at the top of a scan cycle.
    pub fn sample_commands(&self) -> CommandInputs {
        let load = |slot: usize| self.commands[slot].load(Ordering::Acquire);
        CommandInputs {
            start: load(0),
            emergency: load(1),
            pt_inc: load(2),
            pt_dec: load(3),
            ft_inc: load(4),
            ft_dec: load(5),
            turb_inc: load(6),
            turb_dec: load(7),
            level_inc: load(8),
            level_dec: load(9),
        }
    }

    /// Commit a new output snapshot at the end of a scan cycle.
    ///
    /// Must only be called from the engine thread.
    pub fn publish(&self, snapshot: &OutputSnapshot) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        // SAFETY: single engine writer; readers retry while seq is odd.
        unsafe { *self.snapshot.get() = *snapshot };
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
