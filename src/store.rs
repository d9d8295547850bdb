use std::collections::HashMap;

use crate::error::Result;
use crate::types::{EntityId, Temperature};

/// Attribute holding a climate entity's own temperature reading.
pub const ATTR_CURRENT_TEMPERATURE: &str = "current_temperature";
/// Attribute holding a thermostat's currently reported setpoint.
pub const ATTR_TEMPERATURE: &str = "temperature";

/// A point-in-time reading from the state store. Missing values are
/// in-band: sources report `Unknown`/`Unavailable` rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Unknown,
    Unavailable,
}

impl StateValue {
    /// Numeric interpretation; text readings are parsed, since many
    /// substrates transport numbers as state strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            StateValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean-like interpretation ("on"/"off" switches and sensors).
    pub fn as_on_off(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            StateValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "on" => Some(true),
                "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            StateValue::Unknown | StateValue::Unavailable => true,
            StateValue::Text(s) => {
                let s = s.to_ascii_lowercase();
                s == "unknown" || s == "unavailable"
            }
            _ => false,
        }
    }
}

/// An entity (optionally attribute-scoped) the engine wants change
/// notifications for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub entity: EntityId,
    pub attribute: Option<&'static str>,
}

/// Synchronous interface to the external sensor/actuator state.
///
/// All mutable state lives behind this trait; the engine reads fresh
/// every cycle and keeps no shadow copies. Writes are single-field:
/// `set_temperature` must issue the setpoint alone, never bundled with
/// an HVAC mode (devices apply only one field of a combined command).
pub trait StateStore {
    fn read(&self, entity: &EntityId) -> StateValue;

    fn read_attribute(&self, entity: &EntityId, attribute: &str) -> StateValue;

    /// Set a boolean actuator on or off.
    fn set_switch(&mut self, entity: &EntityId, on: bool) -> Result<()>;

    /// Set a thermostat's target setpoint.
    fn set_temperature(&mut self, entity: &EntityId, temperature: Temperature) -> Result<()>;
}

/// Writes issued against a [`MemoryStore`], recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Switch { entity: EntityId, on: bool },
    Temperature { entity: EntityId, celsius: f64 },
}

/// In-memory state store for demos and tests. States and attributes are
/// plain maps; actuator writes are applied immediately and recorded so
/// callers can assert on what was (or was not) written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: HashMap<EntityId, StateValue>,
    attributes: HashMap<(EntityId, String), StateValue>,
    writes: Vec<WriteOp>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, entity: impl Into<EntityId>, value: StateValue) {
        self.states.insert(entity.into(), value);
    }

    pub fn set_attribute(
        &mut self,
        entity: impl Into<EntityId>,
        attribute: impl Into<String>,
        value: StateValue,
    ) {
        self.attributes
            .insert((entity.into(), attribute.into()), value);
    }

    pub fn writes(&self) -> &[WriteOp] {
        &self.writes
    }

    pub fn take_writes(&mut self) -> Vec<WriteOp> {
        std::mem::take(&mut self.writes)
    }
}

impl StateStore for MemoryStore {
    fn read(&self, entity: &EntityId) -> StateValue {
        self.states
            .get(entity)
            .cloned()
            .unwrap_or(StateValue::Unavailable)
    }

    fn read_attribute(&self, entity: &EntityId, attribute: &str) -> StateValue {
        self.attributes
            .get(&(entity.clone(), attribute.to_string()))
            .cloned()
            .unwrap_or(StateValue::Unavailable)
    }

    fn set_switch(&mut self, entity: &EntityId, on: bool) -> Result<()> {
        self.states.insert(
            entity.clone(),
            StateValue::Text(if on { "on" } else { "off" }.to_string()),
        );
        self.writes.push(WriteOp::Switch {
            entity: entity.clone(),
            on,
        });
        Ok(())
    }

    fn set_temperature(&mut self, entity: &EntityId, temperature: Temperature) -> Result<()> {
        self.attributes.insert(
            (entity.clone(), ATTR_TEMPERATURE.to_string()),
            StateValue::Number(temperature.celsius()),
        );
        self.writes.push(WriteOp::Temperature {
            entity: entity.clone(),
            celsius: temperature.celsius(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_reading_parses_as_number() {
        assert_eq!(StateValue::Text("19.5".to_string()).as_number(), Some(19.5));
        assert_eq!(StateValue::Number(21.0).as_number(), Some(21.0));
        assert_eq!(StateValue::Text("warm".to_string()).as_number(), None);
        assert_eq!(StateValue::Unknown.as_number(), None);
    }

    #[test]
    fn on_off_is_case_insensitive() {
        assert_eq!(StateValue::Text("ON".to_string()).as_on_off(), Some(true));
        assert_eq!(StateValue::Text("off".to_string()).as_on_off(), Some(false));
        assert_eq!(StateValue::Bool(true).as_on_off(), Some(true));
        assert_eq!(StateValue::Text("maybe".to_string()).as_on_off(), None);
    }

    #[test]
    fn missing_states_including_textual() {
        assert!(StateValue::Unavailable.is_missing());
        assert!(StateValue::Unknown.is_missing());
        assert!(StateValue::Text("unknown".to_string()).is_missing());
        assert!(!StateValue::Text("on".to_string()).is_missing());
    }

    #[test]
    fn memory_store_applies_and_records_writes() {
        let mut store = MemoryStore::new();
        let boiler = EntityId::new("switch.boiler");
        store.set_state(boiler.clone(), StateValue::Text("off".to_string()));

        store.set_switch(&boiler, true).unwrap();
        assert_eq!(store.read(&boiler).as_on_off(), Some(true));
        assert_eq!(
            store.writes(),
            &[WriteOp::Switch {
                entity: boiler,
                on: true
            }]
        );
    }

    #[test]
    fn memory_store_reads_unavailable_for_unseeded_entities() {
        let store = MemoryStore::new();
        assert!(store.read(&EntityId::new("sensor.nowhere")).is_missing());
        assert!(
            store
                .read_attribute(&EntityId::new("climate.nowhere"), ATTR_TEMPERATURE)
                .is_missing()
        );
    }
}
