use crate::{ui, RunArgs};
use anyhow::{Context, Result};
use colored::Colorize;
use dupts_core::{Pipeline, PipelineConfig, Producer};
use dupts_scenarios::{builtin_scenario, parse_scenario_from_file, Scenario};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;

pub async fn execute(args: RunArgs) -> Result<()> {
    println!("{}", "=== Duplicate TimeSeries Reproduction ===".bold().cyan());

    let scenario = resolve_scenario(&args).await?;

    println!("\n{}", "Scenario Details:".bold());
    println!("  Name: {}", scenario.name.green());
    if let Some(desc) = &scenario.description {
        println!("  Description: {}", desc);
    }
    println!("  Metric: {}", scenario.metric);
    println!("  Selector: {} ({})", scenario.selector, scenario.selector.description());
    println!("  Endpoint: {}", args.endpoint);
    println!("  Collect period: {:?}", scenario.collect_period);
    println!("  Wait: {:?}", scenario.wait);
    println!(
        "  Measurements: {} across {} timeseries",
        scenario.measurements.len(),
        scenario.series_count()
    );

    if !scenario.flushes_before_exit() {
        ui::print_warning("Wait is shorter than the collect period; only the shutdown flush will export");
    }

    let config = PipelineConfig {
        endpoint: args.endpoint.clone(),
        collect_period: scenario.collect_period,
        export_timeout: args.export_timeout,
        connect_timeout: args.connect_timeout,
        service_name: args.service_name.clone(),
    };

    let pipeline = Pipeline::start(&config).await?;

    let producer = Producer::new(pipeline.recorder(scenario.metric.clone(), scenario.selector));

    println!("\n{}", "Recording measurements...".bold().yellow());
    for measurement in &scenario.measurements {
        println!("  {} {}", "•".green(), measurement.describe());
    }
    producer.emit(&scenario.measurements);

    let pb = progress_bar(scenario.wait)?;
    let pb_clone = pb.clone();
    let wait = scenario.wait;
    let ticker = tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= wait {
                break;
            }
            pb_clone.set_position(elapsed.as_millis() as u64);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        pb_clone.finish_with_message("collected");
    });

    let waited = producer.settle(scenario.wait).await;
    ticker.abort();
    pb.finish_and_clear();
    info!("Waited {:?}", waited);

    pipeline.shutdown(args.shutdown_timeout).await;

    println!();
    ui::print_success("Measurements handed to the collector; check its logs for export errors");

    Ok(())
}

async fn resolve_scenario(args: &RunArgs) -> Result<Scenario> {
    let mut scenario = if let Some(path) = &args.scenario_file {
        println!("Loading scenario: {}", path.display());
        parse_scenario_from_file(path).await?
    } else if let Some(name) = &args.builtin {
        builtin_scenario(name).with_context(|| {
            format!("Unknown built-in scenario '{}' (see 'dupts list')", name)
        })?
    } else {
        Scenario::default()
    };

    if let Some(selector) = args.selector {
        info!("Overriding aggregator selector: {}", selector);
        scenario.selector = selector;
    }
    if let Some(collect_period) = args.collect_period {
        info!("Overriding collect period: {:?}", collect_period);
        scenario.collect_period = collect_period;
    }
    if let Some(wait) = args.wait {
        info!("Overriding wait: {:?}", wait);
        scenario.wait = wait;
    }

    scenario.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(scenario)
}

fn progress_bar(wait: Duration) -> Result<ProgressBar> {
    let pb = ProgressBar::new(wait.as_millis() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] waiting for export ({msg})")?
            .progress_chars("=>-"),
    );
    pb.set_message("pending");
    Ok(pb)
}
