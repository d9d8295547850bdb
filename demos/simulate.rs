use heating_control::{
    ATTR_TEMPERATURE, EntityId, HeatingConfig, HeatingEngine, MemoryStore, StateValue,
};

const CONFIG: &str = r#"
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
    sensor = "sensor.bedroom"
    night_mode = "input_boolean.bedroom_night"
    day_target = "input_number.bedroom_day"
    night_target = "input_number.bedroom_night_target"
    thermostats = ["climate.bedroom"]
"#;

fn text(s: &str) -> StateValue {
    StateValue::Text(s.to_string())
}

fn main() -> heating_control::Result<()> {
    tracing_subscriber::fmt::init();

    let mut store = MemoryStore::new();
    store.set_state("input_select.heating_mode", text("auto"));
    store.set_state("binary_sensor.somebody_home", text("on"));
    store.set_state("switch.boiler", text("off"));
    store.set_state("input_number.vacation_temperature", StateValue::Number(16.0));
    for (zone, temp) in [("living_room", 19.2), ("bedroom", 20.4)] {
        store.set_state(format!("sensor.{zone}"), StateValue::Number(temp));
        store.set_state(format!("input_boolean.{zone}_night"), text("off"));
        store.set_state(format!("input_number.{zone}_day"), StateValue::Number(20.0));
        store.set_state(
            format!("input_number.{zone}_night_target"),
            StateValue::Number(17.0),
        );
        store.set_attribute(
            format!("climate.{zone}"),
            ATTR_TEMPERATURE,
            StateValue::Number(20.0),
        );
        store.set_state(format!("climate.{zone}"), text("off"));
    }

    let mut engine = HeatingEngine::new(HeatingConfig::from_toml_str(CONFIG)?, store);

    println!("-- startup refresh (everyone home, mode auto)");
    engine.refresh()?;
    report(&mut engine);

    println!("-- everyone leaves");
    engine
        .store_mut()
        .set_state("binary_sensor.somebody_home", text("off"));
    engine.handle_change(&EntityId::new("binary_sensor.somebody_home"), None)?;
    report(&mut engine);

    println!("-- living room cools to 17.8\u{00b0}C");
    engine
        .store_mut()
        .set_state("sensor.living_room", StateValue::Number(17.8));
    engine.handle_change(&EntityId::new("sensor.living_room"), None)?;
    report(&mut engine);

    println!("-- switching to vacation mode");
    engine
        .store_mut()
        .set_state("input_select.heating_mode", text("vacation"));
    engine.handle_change(&EntityId::new("input_select.heating_mode"), None)?;
    report(&mut engine);

    Ok(())
}

fn report(engine: &mut HeatingEngine<MemoryStore>) {
    let writes = engine.store_mut().take_writes();
    if writes.is_empty() {
        println!("   no writes");
    }
    for write in writes {
        println!("   {write:?}");
    }
}
