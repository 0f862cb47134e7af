pub mod config;
pub mod parser;

pub use config::{builtin_scenario, builtin_scenarios, Scenario, ScenarioConfig};
pub use parser::parse_scenario_from_file;
