use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::EntityId;

fn default_hysteresis() -> f64 {
    1.0
}

fn default_target_offset() -> f64 {
    1.5
}

fn default_min_temperature() -> f64 {
    10.0
}

/// One configured room or radiator group.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    /// Temperature source; a `climate.*` entity is read through its
    /// `current_temperature` attribute.
    pub sensor: EntityId,
    /// Boolean-like source: off means day, on means night.
    pub night_mode: EntityId,
    pub day_target: EntityId,
    pub night_target: EntityId,
    /// Actuators that receive the synthesized setpoint; at least one.
    pub thermostats: Vec<EntityId>,
}

/// Immutable controller configuration, built once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct HeatingConfig {
    /// Boolean actuator for the central heat source.
    pub boiler_switch: EntityId,
    /// Boolean-like "somebody home" source.
    pub occupancy: EntityId,
    /// Source yielding one of on/off/auto/eco/vacation (case-insensitive).
    pub mode: EntityId,
    /// Numeric source for the vacation setpoint.
    pub vacation_target: EntityId,
    pub zones: Vec<ZoneConfig>,

    /// Dead band below the target within which no action is taken.
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,
    /// Fixed bias applied to reported setpoints to force valves open/closed.
    #[serde(default = "default_target_offset")]
    pub target_offset: f64,
    /// Freeze-protection floor; heating turns on below this in any mode.
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f64,
}

impl HeatingConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: HeatingConfig = toml::from_str(raw)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        check_entity(&self.boiler_switch, "boiler_switch")?;
        check_entity(&self.occupancy, "occupancy")?;
        check_entity(&self.mode, "mode")?;
        check_entity(&self.vacation_target, "vacation_target")?;

        if self.zones.is_empty() {
            return Err(Error::InvalidConfig("no zones configured".to_string()));
        }
        for (i, zone) in self.zones.iter().enumerate() {
            check_entity(&zone.sensor, "sensor")?;
            check_entity(&zone.night_mode, "night_mode")?;
            check_entity(&zone.day_target, "day_target")?;
            check_entity(&zone.night_target, "night_target")?;
            if zone.thermostats.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "zone {i} ({}) has no thermostats",
                    zone.sensor
                )));
            }
            for thermostat in &zone.thermostats {
                check_entity(thermostat, "thermostat")?;
            }
        }

        if self.hysteresis < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "hysteresis must not be negative: {}",
                self.hysteresis
            )));
        }
        if self.target_offset < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "target_offset must not be negative: {}",
                self.target_offset
            )));
        }
        Ok(())
    }
}

fn check_entity(entity: &EntityId, field: &str) -> Result<()> {
    let id = entity.as_str();
    match id.split_once('.') {
        Some((domain, name)) if !domain.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(Error::InvalidConfig(format!(
            "{field}: malformed entity id {id:?} (expected domain.name)"
        ))),
    }
}
