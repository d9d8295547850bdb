use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::decision::{AggregateStatus, BoilerAction};
use crate::types::{EntityId, HeatingMode, Temperature};

/// What the decision log records.
pub enum DecisionLogMode {
    /// Every decision cycle, including those that resolve to no-op.
    Full,
    /// Only cycles whose decision flips the boiler, plus all writes.
    ChangesOnly,
}

/// Append-only NDJSON log of decision cycles and actuator writes.
/// Entries within one cycle share a correlation id.
pub(crate) struct DecisionLogger {
    mode: DecisionLogMode,
    file: File,
}

impl DecisionLogger {
    pub fn new(mode: DecisionLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_decision(
        &mut self,
        cycle: Uuid,
        trigger: &str,
        mode: HeatingMode,
        occupied: bool,
        forced: bool,
        status: &AggregateStatus,
        action: BoilerAction,
    ) {
        if matches!(self.mode, DecisionLogMode::ChangesOnly) && action == BoilerAction::NoOp {
            return;
        }
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "cycle": cycle.to_string(),
            "kind": "decision",
            "trigger": trigger,
            "mode": mode.as_str(),
            "occupied": occupied,
            "forced": forced,
            "minimum": status.minimum.map(|t| t.celsius()),
            "some_below": status.some_below,
            "all_above": status.all_above,
            "action": match action {
                BoilerAction::NoOp => "noop",
                BoilerAction::TurnOn => "turn_on",
                BoilerAction::TurnOff => "turn_off",
            },
        });
        self.write_line(&entry);
    }

    pub fn log_switch(&mut self, cycle: Uuid, entity: &EntityId, on: bool) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "cycle": cycle.to_string(),
            "kind": "switch",
            "entity": entity.as_str(),
            "on": on,
        });
        self.write_line(&entry);
    }

    pub fn log_setpoint(&mut self, cycle: Uuid, thermostat: &EntityId, setpoint: Temperature) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "cycle": cycle.to_string(),
            "kind": "setpoint",
            "thermostat": thermostat.as_str(),
            "celsius": setpoint.celsius(),
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write decision log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        let mut contents = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn idle_status() -> AggregateStatus {
        AggregateStatus {
            minimum: Some(Temperature::from_celsius(19.5)),
            some_below: false,
            all_above: false,
        }
    }

    #[test]
    fn decision_entry_is_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = DecisionLogger::new(DecisionLogMode::Full, path).unwrap();
        logger.log_decision(
            Uuid::new_v4(),
            "sensor_changed",
            HeatingMode::Auto,
            true,
            false,
            &idle_status(),
            BoilerAction::TurnOn,
        );

        let lines = read_lines(path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["kind"], "decision");
        assert_eq!(lines[0]["trigger"], "sensor_changed");
        assert_eq!(lines[0]["action"], "turn_on");
        assert_eq!(lines[0]["minimum"], 19.5);
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn changes_only_suppresses_noop_decisions() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = DecisionLogger::new(DecisionLogMode::ChangesOnly, path).unwrap();
        let cycle = Uuid::new_v4();
        logger.log_decision(
            cycle,
            "sensor_changed",
            HeatingMode::Eco,
            false,
            false,
            &idle_status(),
            BoilerAction::NoOp,
        );
        logger.log_setpoint(
            cycle,
            &EntityId::new("climate.living_room"),
            Temperature::from_celsius(21.5),
        );

        let lines = read_lines(path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["kind"], "setpoint");
        assert_eq!(lines[0]["celsius"], 21.5);
    }

    #[test]
    fn entries_in_one_cycle_share_the_correlation_id() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = DecisionLogger::new(DecisionLogMode::Full, path).unwrap();
        let cycle = Uuid::new_v4();
        logger.log_switch(cycle, &EntityId::new("switch.boiler"), true);
        logger.log_setpoint(
            cycle,
            &EntityId::new("climate.bedroom"),
            Temperature::from_celsius(18.5),
        );

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["cycle"], lines[1]["cycle"]);
    }
}
