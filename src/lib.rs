mod config;
mod decision;
mod engine;
mod error;
mod logger;
mod store;
mod types;

pub use config::{HeatingConfig, ZoneConfig};
pub use decision::{AggregateStatus, BoilerAction, decide, synthesize_setpoint};
pub use engine::{HeatingEngine, HeatingEngineBuilder, ThermostatScope};
pub use error::{Error, Result};
pub use logger::DecisionLogMode;
pub use store::{
    ATTR_CURRENT_TEMPERATURE, ATTR_TEMPERATURE, MemoryStore, StateStore, StateValue, Subscription,
    WriteOp,
};
pub use types::*;
