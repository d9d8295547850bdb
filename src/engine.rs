use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::{HeatingConfig, ZoneConfig};
use crate::decision::{AggregateStatus, BoilerAction, decide, synthesize_setpoint};
use crate::error::{Error, Result};
use crate::logger::{DecisionLogMode, DecisionLogger};
use crate::store::{ATTR_CURRENT_TEMPERATURE, ATTR_TEMPERATURE, StateStore, StateValue, Subscription};
use crate::types::{EntityId, Event, HeatingMode, HvacMode, Temperature};

/// Which zones a thermostat synthesis pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThermostatScope {
    All,
    /// Every zone whose temperature source is this entity (a reading
    /// may be shared across zones).
    Sensor(EntityId),
    /// Only the zone owning this thermostat.
    Thermostat(EntityId),
}

impl ThermostatScope {
    fn covers(&self, zone: &ZoneConfig) -> bool {
        match self {
            ThermostatScope::All => true,
            ThermostatScope::Sensor(sensor) => &zone.sensor == sensor,
            ThermostatScope::Thermostat(thermostat) => zone.thermostats.contains(thermostat),
        }
    }
}

pub struct HeatingEngineBuilder<S> {
    config: HeatingConfig,
    store: S,
    log: Option<(DecisionLogMode, String)>,
}

impl<S: StateStore> HeatingEngineBuilder<S> {
    pub fn new(config: HeatingConfig, store: S) -> Self {
        Self {
            config,
            store,
            log: None,
        }
    }

    /// Record decision cycles and actuator writes to an NDJSON file.
    pub fn decision_log(mut self, mode: DecisionLogMode, path: impl Into<String>) -> Self {
        self.log = Some((mode, path.into()));
        self
    }

    pub fn build(self) -> Result<HeatingEngine<S>> {
        let logger = match self.log {
            Some((mode, path)) => Some(DecisionLogger::new(mode, &path)?),
            None => None,
        };
        Ok(HeatingEngine {
            config: self.config,
            store: self.store,
            logger,
        })
    }
}

/// Reactive heating controller. Holds the immutable configuration and a
/// handle to the external state store; everything mutable lives in the
/// store and is read fresh each cycle.
pub struct HeatingEngine<S> {
    config: HeatingConfig,
    store: S,
    logger: Option<DecisionLogger>,
}

impl<S: StateStore> HeatingEngine<S> {
    pub fn new(config: HeatingConfig, store: S) -> Self {
        Self {
            config,
            store,
            logger: None,
        }
    }

    pub fn builder(config: HeatingConfig, store: S) -> HeatingEngineBuilder<S> {
        HeatingEngineBuilder::new(config, store)
    }

    pub fn config(&self) -> &HeatingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The change notifications the engine needs from the substrate.
    /// Sensors are de-duplicated; a sensor living in the `climate`
    /// domain is watched through its temperature attribute.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subs = vec![
            Subscription {
                entity: self.config.mode.clone(),
                attribute: None,
            },
            Subscription {
                entity: self.config.boiler_switch.clone(),
                attribute: None,
            },
            Subscription {
                entity: self.config.occupancy.clone(),
                attribute: None,
            },
            Subscription {
                entity: self.config.vacation_target.clone(),
                attribute: None,
            },
        ];
        let mut sensors: Vec<&EntityId> = Vec::new();
        for zone in &self.config.zones {
            subs.push(Subscription {
                entity: zone.night_mode.clone(),
                attribute: None,
            });
            subs.push(Subscription {
                entity: zone.day_target.clone(),
                attribute: None,
            });
            subs.push(Subscription {
                entity: zone.night_target.clone(),
                attribute: None,
            });
            if !sensors.contains(&&zone.sensor) {
                sensors.push(&zone.sensor);
                subs.push(Subscription {
                    entity: zone.sensor.clone(),
                    attribute: zone
                        .sensor
                        .is_climate()
                        .then_some(ATTR_CURRENT_TEMPERATURE),
                });
            }
            for thermostat in &zone.thermostats {
                subs.push(Subscription {
                    entity: thermostat.clone(),
                    attribute: None,
                });
            }
        }
        subs
    }

    /// Map an entity change back to a typed reactor event. Returns
    /// `None` for entities the engine is not interested in.
    pub fn classify(&self, entity: &EntityId, attribute: Option<&str>) -> Option<Event> {
        let c = &self.config;
        if entity == &c.mode {
            return Some(Event::ModeChanged);
        }
        if entity == &c.boiler_switch {
            return Some(Event::BoilerChanged);
        }
        if entity == &c.occupancy {
            return Some(Event::OccupancyChanged);
        }
        if entity == &c.vacation_target {
            return Some(Event::VacationTargetChanged);
        }
        for (i, zone) in c.zones.iter().enumerate() {
            if entity == &zone.night_mode {
                return Some(Event::NightModeChanged { zone: i });
            }
            if entity == &zone.day_target || entity == &zone.night_target {
                return Some(Event::TargetChanged { zone: i });
            }
        }
        if c.zones.iter().any(|z| &z.sensor == entity) {
            // Climate-embedded sensors report through the temperature
            // attribute; their state channel belongs to the thermostat.
            let temperature_channel = if entity.is_climate() {
                attribute == Some(ATTR_CURRENT_TEMPERATURE)
            } else {
                attribute.is_none()
            };
            if temperature_channel {
                return Some(Event::SensorChanged {
                    sensor: entity.clone(),
                });
            }
        }
        if c.zones.iter().any(|z| z.thermostats.contains(entity)) {
            return Some(Event::ThermostatChanged {
                thermostat: entity.clone(),
            });
        }
        None
    }

    /// Classify and handle a raw entity change in one step. Changes to
    /// unknown entities are ignored.
    pub fn handle_change(&mut self, entity: &EntityId, attribute: Option<&str>) -> Result<()> {
        match self.classify(entity, attribute) {
            Some(event) => self.handle_event(&event),
            None => {
                trace!(%entity, "ignoring change to unwatched entity");
                Ok(())
            }
        }
    }

    /// Full decision plus full synthesis; run once at startup after
    /// wiring subscriptions.
    pub fn refresh(&mut self) -> Result<()> {
        let cycle = Uuid::new_v4();
        self.update_heating(cycle, "startup", false)?;
        self.update_thermostats(cycle, &ThermostatScope::All)
    }

    /// Process one triggering event to completion.
    pub fn handle_event(&mut self, event: &Event) -> Result<()> {
        let cycle = Uuid::new_v4();
        trace!(?event, %cycle, "handling event");
        match event {
            Event::ModeChanged => {
                let before = self.is_heating()?;
                self.update_heating(cycle, "mode_changed", false)?;
                if self.is_heating()? == before {
                    // A boiler flip arrives as its own BoilerChanged
                    // event and refreshes the thermostats then.
                    self.update_thermostats(cycle, &ThermostatScope::All)?;
                }
            }
            Event::BoilerChanged => {
                self.update_thermostats(cycle, &ThermostatScope::All)?;
            }
            Event::VacationTargetChanged => {
                if self.mode()? == HeatingMode::Vacation {
                    self.update_heating(cycle, "vacation_target_changed", false)?;
                    self.update_thermostats(cycle, &ThermostatScope::All)?;
                }
            }
            Event::OccupancyChanged => {
                if self.occupied()? {
                    info!("somebody came home");
                } else {
                    info!("nobody home");
                }
                self.update_heating(cycle, "occupancy_changed", true)?;
                self.update_thermostats(cycle, &ThermostatScope::All)?;
            }
            Event::NightModeChanged { zone } | Event::TargetChanged { zone } => {
                let sensor = self.zone(*zone)?.sensor.clone();
                let trigger = match event {
                    Event::NightModeChanged { .. } => "night_mode_changed",
                    _ => "target_changed",
                };
                self.update_heating(cycle, trigger, false)?;
                self.update_thermostats(cycle, &ThermostatScope::Sensor(sensor))?;
            }
            Event::SensorChanged { sensor } => {
                self.update_heating(cycle, "sensor_changed", false)?;
                self.update_thermostats(cycle, &ThermostatScope::Sensor(sensor.clone()))?;
            }
            Event::ThermostatChanged { thermostat } => {
                // Self-healing: a thermostat that lost its setpoint
                // display gets re-populated.
                if self.store.read(thermostat).is_missing() {
                    debug!(%thermostat, "thermostat went blank, resyncing");
                    self.update_thermostats(cycle, &ThermostatScope::Thermostat(thermostat.clone()))?;
                }
            }
        }
        Ok(())
    }

    /// Current target for a zone under the given mode: the vacation
    /// setpoint in vacation mode, otherwise the day or night target
    /// selected by the zone's night-mode switch.
    pub fn resolve_target(&self, zone: &ZoneConfig, mode: HeatingMode) -> Result<Temperature> {
        if mode == HeatingMode::Vacation {
            self.vacation_target()
        } else {
            self.resolve_room_target(zone)
        }
    }

    /// Scan all zones and fold their readings into one aggregate.
    /// Zones with an unreadable sensor or target contribute nothing;
    /// an unreadable vacation target aborts the cycle because every
    /// zone's meaning depends on it.
    pub fn aggregate(&self, mode: HeatingMode) -> Result<AggregateStatus> {
        let vacation_target = if mode == HeatingMode::Vacation {
            Some(self.vacation_target()?)
        } else {
            None
        };
        let mut status = AggregateStatus::new();
        for zone in &self.config.zones {
            let Some(current) = self.read_zone_temperature(zone) else {
                trace!(sensor = %zone.sensor, "no reading, zone skipped");
                continue;
            };
            let target = match vacation_target {
                Some(t) => t,
                None => match self.resolve_room_target(zone) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(sensor = %zone.sensor, "target unresolvable, zone skipped: {e}");
                        continue;
                    }
                },
            };
            status.observe(current, target, self.config.hysteresis);
        }
        Ok(status)
    }

    fn update_heating(&mut self, cycle: Uuid, trigger: &str, forced: bool) -> Result<()> {
        let mode = self.mode()?;
        let occupied = self.occupied()?;
        let status = self.aggregate(mode)?;
        let heating_on = self.is_heating()?;
        let action = decide(
            &status,
            mode,
            occupied,
            heating_on,
            forced,
            self.config.min_temperature,
        );
        debug!(
            trigger,
            %mode,
            occupied,
            forced,
            heating_on,
            ?status,
            ?action,
            "boiler decision"
        );
        if let Some(logger) = self.logger.as_mut() {
            logger.log_decision(cycle, trigger, mode, occupied, forced, &status, action);
        }
        match action {
            BoilerAction::TurnOn if !heating_on => {
                info!("turning heating on");
                self.store.set_switch(&self.config.boiler_switch, true)?;
                if let Some(logger) = self.logger.as_mut() {
                    logger.log_switch(cycle, &self.config.boiler_switch, true);
                }
            }
            BoilerAction::TurnOff if heating_on => {
                info!("turning heating off");
                self.store.set_switch(&self.config.boiler_switch, false)?;
                if let Some(logger) = self.logger.as_mut() {
                    logger.log_switch(cycle, &self.config.boiler_switch, false);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn update_thermostats(&mut self, cycle: Uuid, scope: &ThermostatScope) -> Result<()> {
        let mode = self.mode()?;
        let boiler_on = self.is_heating()?;
        let hvac = if boiler_on { HvacMode::Heat } else { HvacMode::Off };
        // Vacation setpoint is reported as-is, without the valve bias.
        let vacation_target = if mode == HeatingMode::Vacation {
            Some(self.vacation_target()?)
        } else {
            None
        };

        for zone in &self.config.zones {
            if !scope.covers(zone) {
                continue;
            }
            let desired = match vacation_target {
                Some(t) => Some(t),
                None => {
                    let Some(current) = self.read_zone_temperature(zone) else {
                        warn!(sensor = %zone.sensor, "no reading, thermostats left as-is");
                        continue;
                    };
                    let target = match self.resolve_room_target(zone) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!(sensor = %zone.sensor, "target unresolvable, thermostats left as-is: {e}");
                            continue;
                        }
                    };
                    synthesize_setpoint(
                        current,
                        target,
                        self.config.hysteresis,
                        self.config.target_offset,
                    )
                }
            };
            for thermostat in &zone.thermostats {
                // Inside the dead band the thermostat keeps whatever it
                // currently shows.
                let Some(setpoint) = desired else { continue };
                let reported = self
                    .store
                    .read_attribute(thermostat, ATTR_TEMPERATURE)
                    .as_number();
                if reported == Some(setpoint.celsius()) {
                    trace!(%thermostat, "setpoint unchanged, write suppressed");
                    continue;
                }
                info!(%thermostat, %setpoint, mode = hvac.as_str(), "updating thermostat");
                // The command carries the temperature alone; bundling
                // the hvac mode makes some firmwares drop one field.
                self.store.set_temperature(thermostat, setpoint)?;
                if let Some(logger) = self.logger.as_mut() {
                    logger.log_setpoint(cycle, thermostat, setpoint);
                }
            }
        }
        Ok(())
    }

    // -- Point reads --

    fn zone(&self, index: usize) -> Result<&ZoneConfig> {
        self.config
            .zones
            .get(index)
            .ok_or_else(|| Error::InvalidConfig(format!("zone index {index} out of range")))
    }

    fn mode(&self) -> Result<HeatingMode> {
        let value = self.store.read(&self.config.mode);
        if value.is_missing() {
            return Err(Error::Unavailable {
                entity: self.config.mode.clone(),
                attribute: None,
            });
        }
        let raw = match &value {
            StateValue::Text(s) => s.clone(),
            other => format!("{other:?}"),
        };
        HeatingMode::parse(&raw).ok_or(Error::UnknownMode(raw))
    }

    fn occupied(&self) -> Result<bool> {
        let value = self.store.read(&self.config.occupancy);
        if value.is_missing() {
            return Err(Error::Unavailable {
                entity: self.config.occupancy.clone(),
                attribute: None,
            });
        }
        Ok(value.as_on_off().unwrap_or(false))
    }

    fn is_heating(&self) -> Result<bool> {
        let value = self.store.read(&self.config.boiler_switch);
        if value.is_missing() {
            return Err(Error::Unavailable {
                entity: self.config.boiler_switch.clone(),
                attribute: None,
            });
        }
        Ok(value.as_on_off().unwrap_or(false))
    }

    fn vacation_target(&self) -> Result<Temperature> {
        numeric(&self.config.vacation_target, self.store.read(&self.config.vacation_target))
    }

    /// Zone temperature, or `None` when the source is unreadable.
    fn read_zone_temperature(&self, zone: &ZoneConfig) -> Option<Temperature> {
        let value = if zone.sensor.is_climate() {
            self.store
                .read_attribute(&zone.sensor, ATTR_CURRENT_TEMPERATURE)
        } else {
            self.store.read(&zone.sensor)
        };
        if value.is_missing() {
            return None;
        }
        match value.as_number() {
            Some(n) => Some(Temperature::from_celsius(n)),
            None => {
                warn!(sensor = %zone.sensor, ?value, "non-numeric temperature reading");
                None
            }
        }
    }

    /// Day/night target for a zone, not considering vacation. Day when
    /// the night-mode switch is off, night otherwise.
    fn resolve_room_target(&self, zone: &ZoneConfig) -> Result<Temperature> {
        let night_mode = self.store.read(&zone.night_mode);
        if night_mode.is_missing() {
            return Err(Error::Unavailable {
                entity: zone.night_mode.clone(),
                attribute: None,
            });
        }
        let source = if night_mode.as_on_off() == Some(false) {
            &zone.day_target
        } else {
            &zone.night_target
        };
        numeric(source, self.store.read(source))
    }
}

fn numeric(entity: &EntityId, value: StateValue) -> Result<Temperature> {
    if value.is_missing() {
        return Err(Error::Unavailable {
            entity: entity.clone(),
            attribute: None,
        });
    }
    match value.as_number() {
        Some(n) => Ok(Temperature::from_celsius(n)),
        None => Err(Error::NotNumeric {
            entity: entity.clone(),
            value: format!("{value:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config() -> HeatingConfig {
        HeatingConfig::from_toml_str(
            r#"
            boiler_switch = "switch.boiler"
            occupancy = "binary_sensor.somebody_home"
            mode = "input_select.heating_mode"
            vacation_target = "input_number.vacation_temperature"

            [[zones]]
            sensor = "sensor.living_room"
            night_mode = "input_boolean.living_room_night"
            day_target = "input_number.living_room_day"
            night_target = "input_number.living_room_night_target"
            thermostats = ["climate.living_room"]

            [[zones]]
            sensor = "climate.bedroom"
            night_mode = "input_boolean.bedroom_night"
            day_target = "input_number.bedroom_day"
            night_target = "input_number.bedroom_night_target"
            thermostats = ["climate.bedroom"]
            "#,
        )
        .unwrap()
    }

    fn engine() -> HeatingEngine<MemoryStore> {
        HeatingEngine::new(config(), MemoryStore::new())
    }

    #[test]
    fn classify_dispatches_global_sources() {
        let engine = engine();
        let classify = |id: &str| engine.classify(&EntityId::new(id), None);
        assert_eq!(classify("input_select.heating_mode"), Some(Event::ModeChanged));
        assert_eq!(classify("switch.boiler"), Some(Event::BoilerChanged));
        assert_eq!(
            classify("binary_sensor.somebody_home"),
            Some(Event::OccupancyChanged)
        );
        assert_eq!(
            classify("input_number.vacation_temperature"),
            Some(Event::VacationTargetChanged)
        );
        assert_eq!(classify("light.hallway"), None);
    }

    #[test]
    fn classify_dispatches_zone_sources() {
        let engine = engine();
        assert_eq!(
            engine.classify(&EntityId::new("input_boolean.bedroom_night"), None),
            Some(Event::NightModeChanged { zone: 1 })
        );
        assert_eq!(
            engine.classify(&EntityId::new("input_number.living_room_day"), None),
            Some(Event::TargetChanged { zone: 0 })
        );
        assert_eq!(
            engine.classify(&EntityId::new("sensor.living_room"), None),
            Some(Event::SensorChanged {
                sensor: EntityId::new("sensor.living_room")
            })
        );
    }

    #[test]
    fn climate_sensor_splits_on_attribute() {
        let engine = engine();
        // Attribute channel is the embedded sensor; state channel is
        // the thermostat itself.
        assert_eq!(
            engine.classify(
                &EntityId::new("climate.bedroom"),
                Some(ATTR_CURRENT_TEMPERATURE)
            ),
            Some(Event::SensorChanged {
                sensor: EntityId::new("climate.bedroom")
            })
        );
        assert_eq!(
            engine.classify(&EntityId::new("climate.bedroom"), None),
            Some(Event::ThermostatChanged {
                thermostat: EntityId::new("climate.bedroom")
            })
        );
    }

    #[test]
    fn subscription_manifest_covers_all_sources_once() {
        let engine = engine();
        let subs = engine.subscriptions();
        // 4 globals + per zone: night_mode, 2 targets, sensor, thermostat.
        assert_eq!(subs.len(), 4 + 2 * 5);
        let bedroom_sensor = subs
            .iter()
            .find(|s| s.entity == EntityId::new("climate.bedroom") && s.attribute.is_some())
            .expect("climate sensor subscription");
        assert_eq!(bedroom_sensor.attribute, Some(ATTR_CURRENT_TEMPERATURE));
        let plain_sensor = subs
            .iter()
            .find(|s| s.entity == EntityId::new("sensor.living_room"))
            .expect("plain sensor subscription");
        assert_eq!(plain_sensor.attribute, None);
    }

    #[test]
    fn mode_parse_is_fail_fast() {
        let mut engine = engine();
        engine
            .store_mut()
            .set_state("input_select.heating_mode", StateValue::Text("warm".into()));
        match engine.mode() {
            Err(Error::UnknownMode(m)) => assert_eq!(m, "warm"),
            other => panic!("expected UnknownMode, got {other:?}"),
        }
    }
}
