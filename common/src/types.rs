use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Units {
    #[default]
    C,
    F,
}

impl Units {
    /// Anything other than `F` reads as Celsius.
    pub fn from_device(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("f") {
            Self::F
        } else {
            Self::C
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Device key from `current.F`, e.g. `Probe1`. Stable across renames.
    #[serde(skip)]
    pub key: String,
    pub name: String,
    pub temp: i64,
    pub target: i64,
}

/// Mirrored device state. Owned by a single writer; consumers only see
/// [`StateChange`] values derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub mode: String,
    #[serde(rename = "displayMode")]
    pub display_mode: String,
    pub outpins: BTreeMap<String, bool>,
    #[serde(rename = "lidOpen")]
    pub lid_open: bool,
    #[serde(rename = "smokePlus")]
    pub smoke_plus: bool,
    #[serde(rename = "pMode")]
    pub p_mode: String,
    pub units: Units,
    #[serde(rename = "grillTemp")]
    pub grill_temp: i64,
    #[serde(rename = "setPoint")]
    pub set_point: i64,
    pub probes: Vec<Probe>,
    pub timers: Vec<Value>,
    pub hopper: Map<String, Value>,
    #[serde(rename = "startDuration")]
    pub start_duration: i64,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "startupProgress")]
    pub startup_progress: f64,
    #[serde(rename = "primeDuration")]
    pub prime_duration: i64,
    #[serde(rename = "modeStartTime")]
    pub mode_start_time: f64,
    #[serde(rename = "primeProgress")]
    pub prime_progress: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        let outpins = ["fan", "auger", "igniter", "power"]
            .into_iter()
            .map(|pin| (pin.to_string(), false))
            .collect();

        Self {
            mode: "Disconnected".to_string(),
            display_mode: "Connecting...".to_string(),
            outpins,
            lid_open: false,
            smoke_plus: false,
            p_mode: "--".to_string(),
            units: Units::C,
            grill_temp: 0,
            set_point: 0,
            probes: Vec::new(),
            timers: Vec::new(),
            hopper: Map::new(),
            start_duration: 0,
            start_time: 0.0,
            startup_progress: 0.0,
            prime_duration: 0,
            mode_start_time: 0.0,
            prime_progress: 0.0,
        }
    }
}

/// Snapshot fields, in the order changes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Mode,
    DisplayMode,
    Outpins,
    LidOpen,
    SmokePlus,
    PMode,
    StartDuration,
    StartupProgress,
    StartTime,
    PrimeDuration,
    ModeStartTime,
    PrimeProgress,
    Units,
    GrillTemp,
    SetPoint,
    Timers,
    Hopper,
    Probes,
}

impl Field {
    pub const ALL: [Field; 18] = [
        Field::Mode,
        Field::DisplayMode,
        Field::Outpins,
        Field::LidOpen,
        Field::SmokePlus,
        Field::PMode,
        Field::StartDuration,
        Field::StartupProgress,
        Field::StartTime,
        Field::PrimeDuration,
        Field::ModeStartTime,
        Field::PrimeProgress,
        Field::Units,
        Field::GrillTemp,
        Field::SetPoint,
        Field::Timers,
        Field::Hopper,
        Field::Probes,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            Self::Mode => "modeChanged",
            Self::DisplayMode => "displayModeChanged",
            Self::Outpins => "outpinsChanged",
            Self::LidOpen => "lidOpenChanged",
            Self::SmokePlus => "smokePlusChanged",
            Self::PMode => "pModeChanged",
            Self::StartDuration => "startDurationChanged",
            Self::StartupProgress => "startupProgressChanged",
            Self::StartTime => "startTimeChanged",
            Self::PrimeDuration => "primeDurationChanged",
            Self::ModeStartTime => "modeStartTimeChanged",
            Self::PrimeProgress => "primeProgressChanged",
            Self::Units => "unitsChanged",
            Self::GrillTemp => "grillTempChanged",
            Self::SetPoint => "setPointChanged",
            Self::Timers => "timersChanged",
            Self::Hopper => "hopperChanged",
            Self::Probes => "probesChanged",
        }
    }
}

/// A single field change carrying its new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum StateChange {
    Mode(String),
    DisplayMode(String),
    Outpins(BTreeMap<String, bool>),
    LidOpen(bool),
    SmokePlus(bool),
    PMode(String),
    StartDuration(i64),
    StartupProgress(f64),
    StartTime(f64),
    PrimeDuration(i64),
    ModeStartTime(f64),
    PrimeProgress(f64),
    Units(Units),
    GrillTemp(i64),
    SetPoint(i64),
    Timers(Vec<Value>),
    Hopper(Map<String, Value>),
    Probes(Vec<Probe>),
}

impl StateChange {
    pub fn field(&self) -> Field {
        match self {
            Self::Mode(_) => Field::Mode,
            Self::DisplayMode(_) => Field::DisplayMode,
            Self::Outpins(_) => Field::Outpins,
            Self::LidOpen(_) => Field::LidOpen,
            Self::SmokePlus(_) => Field::SmokePlus,
            Self::PMode(_) => Field::PMode,
            Self::StartDuration(_) => Field::StartDuration,
            Self::StartupProgress(_) => Field::StartupProgress,
            Self::StartTime(_) => Field::StartTime,
            Self::PrimeDuration(_) => Field::PrimeDuration,
            Self::ModeStartTime(_) => Field::ModeStartTime,
            Self::PrimeProgress(_) => Field::PrimeProgress,
            Self::Units(_) => Field::Units,
            Self::GrillTemp(_) => Field::GrillTemp,
            Self::SetPoint(_) => Field::SetPoint,
            Self::Timers(_) => Field::Timers,
            Self::Hopper(_) => Field::Hopper,
            Self::Probes(_) => Field::Probes,
        }
    }
}

impl Snapshot {
    pub fn change_for(&self, field: Field) -> StateChange {
        match field {
            Field::Mode => StateChange::Mode(self.mode.clone()),
            Field::DisplayMode => StateChange::DisplayMode(self.display_mode.clone()),
            Field::Outpins => StateChange::Outpins(self.outpins.clone()),
            Field::LidOpen => StateChange::LidOpen(self.lid_open),
            Field::SmokePlus => StateChange::SmokePlus(self.smoke_plus),
            Field::PMode => StateChange::PMode(self.p_mode.clone()),
            Field::StartDuration => StateChange::StartDuration(self.start_duration),
            Field::StartupProgress => StateChange::StartupProgress(self.startup_progress),
            Field::StartTime => StateChange::StartTime(self.start_time),
            Field::PrimeDuration => StateChange::PrimeDuration(self.prime_duration),
            Field::ModeStartTime => StateChange::ModeStartTime(self.mode_start_time),
            Field::PrimeProgress => StateChange::PrimeProgress(self.prime_progress),
            Field::Units => StateChange::Units(self.units),
            Field::GrillTemp => StateChange::GrillTemp(self.grill_temp),
            Field::SetPoint => StateChange::SetPoint(self.set_point),
            Field::Timers => StateChange::Timers(self.timers.clone()),
            Field::Hopper => StateChange::Hopper(self.hopper.clone()),
            Field::Probes => StateChange::Probes(self.probes.clone()),
        }
    }

    /// Fields whose value differs between `self` and `next`, compared structurally.
    pub fn diff(&self, next: &Snapshot) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.field_eq(next, *field))
            .collect()
    }

    fn field_eq(&self, other: &Snapshot, field: Field) -> bool {
        match field {
            Field::Mode => self.mode == other.mode,
            Field::DisplayMode => self.display_mode == other.display_mode,
            Field::Outpins => self.outpins == other.outpins,
            Field::LidOpen => self.lid_open == other.lid_open,
            Field::SmokePlus => self.smoke_plus == other.smoke_plus,
            Field::PMode => self.p_mode == other.p_mode,
            Field::StartDuration => self.start_duration == other.start_duration,
            Field::StartupProgress => self.startup_progress == other.startup_progress,
            Field::StartTime => self.start_time == other.start_time,
            Field::PrimeDuration => self.prime_duration == other.prime_duration,
            Field::ModeStartTime => self.mode_start_time == other.mode_start_time,
            Field::PrimeProgress => self.prime_progress == other.prime_progress,
            Field::Units => self.units == other.units,
            Field::GrillTemp => self.grill_temp == other.grill_temp,
            Field::SetPoint => self.set_point == other.set_point,
            Field::Timers => self.timers == other.timers,
            Field::Hopper => self.hopper == other.hopper,
            Field::Probes => self.probes == other.probes,
        }
    }
}
