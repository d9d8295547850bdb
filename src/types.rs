use std::fmt;

use serde::{Deserialize, Serialize};

/// Temperature in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

impl std::ops::Add<f64> for Temperature {
    type Output = Temperature;

    fn add(self, delta: f64) -> Temperature {
        Temperature(self.0 + delta)
    }
}

impl std::ops::Sub<f64> for Temperature {
    type Output = Temperature;

    fn sub(self, delta: f64) -> Temperature {
        Temperature(self.0 - delta)
    }
}

/// Identifier of a sensor or actuator in the external state store,
/// in `domain.name` form (e.g. `sensor.living_room`, `climate.bedroom`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first dot, empty if there is none.
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map(|(d, _)| d).unwrap_or("")
    }

    /// Thermostats carry their own temperature sensor; such sensors are
    /// read through an attribute instead of the entity state.
    pub fn is_climate(&self) -> bool {
        self.domain() == "climate"
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Global operating mode, selected by an external mode source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatingMode {
    On,
    Off,
    Auto,
    Eco,
    Vacation,
}

impl HeatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatingMode::On => "on",
            HeatingMode::Off => "off",
            HeatingMode::Auto => "auto",
            HeatingMode::Eco => "eco",
            HeatingMode::Vacation => "vacation",
        }
    }

    /// Case-insensitive parse; `None` for unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(HeatingMode::On),
            "off" => Some(HeatingMode::Off),
            "auto" => Some(HeatingMode::Auto),
            "eco" => Some(HeatingMode::Eco),
            "vacation" => Some(HeatingMode::Vacation),
            _ => None,
        }
    }
}

impl fmt::Display for HeatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode reported to thermostats alongside the setpoint. Informational
/// only: it is never combined with a temperature in a single command,
/// since devices may apply just one of the two fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvacMode {
    Heat,
    Off,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Heat => "heat",
            HvacMode::Off => "off",
        }
    }
}

/// Triggering events the reactor responds to. `zone` indexes into the
/// configured zone list; sensor and thermostat events carry the entity
/// because a sensor may be shared across zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ModeChanged,
    BoilerChanged,
    VacationTargetChanged,
    OccupancyChanged,
    NightModeChanged { zone: usize },
    TargetChanged { zone: usize },
    SensorChanged { sensor: EntityId },
    ThermostatChanged { thermostat: EntityId },
}
