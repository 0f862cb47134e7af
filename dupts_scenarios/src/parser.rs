use crate::config::{Scenario, ScenarioConfig};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

pub async fn parse_scenario_from_file(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|s| s.to_str());
    let parse: fn(&str) -> Result<Scenario> = match extension {
        Some("yaml") | Some("yml") => parse_yaml,
        Some("toml") => parse_toml,
        Some("json") => parse_json,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported file format. Use .yaml, .yml, .toml, or .json"
            ))
        }
    };

    debug!("Parsing scenario {} ({:?})", path.display(), extension);
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;

    parse(&contents)
}

fn parse_yaml(content: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(content)?;
    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(scenario)
}

fn parse_toml(content: &str) -> Result<Scenario> {
    let config: ScenarioConfig = toml::from_str(content)?;
    config.scenario.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config.scenario)
}

fn parse_json(content: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(content)?;
    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(scenario)
}
