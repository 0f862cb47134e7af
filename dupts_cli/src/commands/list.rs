use anyhow::Result;
use colored::Colorize;
use dupts_core::AggregatorSelector;
use dupts_scenarios::builtin_scenarios;

pub async fn execute() -> Result<()> {
    println!("{}", "=== Aggregator Selectors ===".bold().cyan());
    for selector in AggregatorSelector::ALL {
        let marker = if selector == AggregatorSelector::default() {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {} {}{} - {}",
            "•".green(),
            selector.name(),
            marker,
            selector.description()
        );
    }

    println!("\n{}", "=== Built-in Scenarios ===".bold().cyan());
    for scenario in builtin_scenarios() {
        println!(
            "  {} {} - metric {}, selector {}, {} measurements",
            "•".green(),
            scenario.name,
            scenario.metric,
            scenario.selector,
            scenario.measurements.len()
        );
    }

    println!(
        "\n{}",
        "Use 'dupts run --builtin <name>' or 'dupts run <file>' to run one".yellow()
    );

    Ok(())
}
