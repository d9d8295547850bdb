use crate::types::{HeatingMode, Temperature};

/// Result of one aggregation pass over all zones. Lives for a single
/// decision cycle.
///
/// `all_above` and `some_below` are two independent thresholds (target
/// vs. target minus hysteresis), giving a dead band between "safe to
/// turn off" and "must turn on".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStatus {
    /// Lowest reading seen; `None` when no zone yielded a reading, in
    /// which case the safety floor check is skipped.
    pub minimum: Option<Temperature>,
    pub some_below: bool,
    pub all_above: bool,
}

impl AggregateStatus {
    pub fn new() -> Self {
        Self {
            minimum: None,
            some_below: false,
            all_above: true,
        }
    }

    /// Fold one zone's reading into the aggregate.
    pub fn observe(&mut self, current: Temperature, target: Temperature, hysteresis: f64) {
        if current < target {
            self.all_above = false;
        }
        if current < target - hysteresis {
            self.some_below = true;
        }
        match self.minimum {
            Some(min) if min <= current => {}
            _ => self.minimum = Some(current),
        }
    }
}

impl Default for AggregateStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with the boiler. Turn-on/turn-off are suppressed at the
/// actuator when it already reports that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoilerAction {
    NoOp,
    TurnOn,
    TurnOff,
}

/// Boiler decision: ordered rules, first match wins.
///
/// A forced cycle (occupancy transition) may flip state even when the
/// zone flags alone would not justify it from the opposite resting
/// state; an opportunistic cycle (single sensor/target update) only
/// flips at the hysteresis boundary to avoid chatter.
pub fn decide(
    status: &AggregateStatus,
    mode: HeatingMode,
    occupied: bool,
    heating_on: bool,
    forced: bool,
    min_temperature: f64,
) -> BoilerAction {
    // Freeze protection beats every mode, including Off.
    if let Some(minimum) = status.minimum
        && minimum < Temperature::from_celsius(min_temperature)
    {
        return BoilerAction::TurnOn;
    }
    match mode {
        HeatingMode::On => return BoilerAction::TurnOn,
        HeatingMode::Off => return BoilerAction::TurnOff,
        HeatingMode::Auto if occupied => return BoilerAction::TurnOn,
        _ => {}
    }
    if forced {
        if occupied {
            if !status.all_above {
                BoilerAction::TurnOn
            } else {
                BoilerAction::NoOp
            }
        } else if !status.some_below {
            BoilerAction::TurnOff
        } else {
            BoilerAction::NoOp
        }
    } else if heating_on {
        if status.all_above {
            BoilerAction::TurnOff
        } else {
            BoilerAction::NoOp
        }
    } else if status.some_below {
        BoilerAction::TurnOn
    } else {
        BoilerAction::NoOp
    }
}

/// Setpoint to report to a zone's thermostats, biased to drive the
/// valve further open (below the band) or closed (above target).
/// `None` means keep the thermostat's current setpoint: inside the dead
/// band nothing is recomputed, preventing oscillation.
pub fn synthesize_setpoint(
    current: Temperature,
    target: Temperature,
    hysteresis: f64,
    offset: f64,
) -> Option<Temperature> {
    if current < target - hysteresis {
        Some(target + offset)
    } else if current > target {
        Some(target - offset)
    } else {
        None
    }
}
