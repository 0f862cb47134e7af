use anyhow::Result;
use colored::Colorize;
use dupts_scenarios::parse_scenario_from_file;
use std::path::PathBuf;

pub async fn execute(scenario_file: PathBuf) -> Result<()> {
    println!("{}", "=== Validate Scenario ===".bold().cyan());
    println!("File: {}", scenario_file.display());

    let scenario = match parse_scenario_from_file(&scenario_file).await {
        Ok(scenario) => scenario,
        Err(e) => {
            println!("{} {}", "✗ Invalid scenario:".red().bold(), e);
            return Err(e);
        }
    };

    println!("{}", "✓ Scenario is valid".green().bold());
    println!("\nName: {}", scenario.name.cyan());
    println!("Metric: {}", scenario.metric);
    println!("Selector: {}", scenario.selector);
    println!("Collect period: {:?}", scenario.collect_period);
    println!("Wait: {:?}", scenario.wait);
    println!(
        "Measurements: {} ({} distinct timeseries)",
        scenario.measurements.len(),
        scenario.series_count()
    );

    if !scenario.flushes_before_exit() {
        println!(
            "{}",
            "⚠ Wait is shorter than the collect period".yellow()
        );
    }

    Ok(())
}
