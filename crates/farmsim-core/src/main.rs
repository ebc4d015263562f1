//! FarmSim CLI: compare dispatch policies on a simulated server farm.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use farmsim_core::config::SimConfig;
use farmsim_core::stats::{self, RunSummary};
use farmsim_core::Simulation;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How many of the busiest servers the run table shows.
const SERVER_TABLE_ROWS: usize = 10;

#[derive(Parser)]
#[command(
    name = "farmsim",
    about = "Simulate request dispatch across a load-balanced server farm",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every simulating subcommand.
#[derive(Args)]
struct RunOptions {
    /// Path to TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Mean arrivals per tick.
    #[arg(short, long)]
    rate: Option<f64>,
    /// Seed for the random stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Last tick at which requests are generated.
    #[arg(long)]
    horizon: Option<u64>,
    /// Output results to JSON file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with a single policy.
    Run {
        #[command(flatten)]
        opts: RunOptions,
        /// Dispatch policy name.
        #[arg(short, long)]
        policy: Option<String>,
    },
    /// Compare several policies on the same configuration and seed.
    Compare {
        #[command(flatten)]
        opts: RunOptions,
        /// Comma-separated list of policy names; all policies when omitted.
        #[arg(short = 'P', long, value_delimiter = ',')]
        policies: Vec<String>,
    },
    /// Sweep arrival rates to find the saturation point.
    Sweep {
        #[command(flatten)]
        opts: RunOptions,
        /// Dispatch policy name.
        #[arg(short, long)]
        policy: Option<String>,
        /// Comma-separated list of arrival rates.
        #[arg(long, value_delimiter = ',', required = true)]
        rates: Vec<f64>,
    },
    /// List available dispatch policies.
    ListPolicies,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmsim=info,farmsim_core=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { opts, policy } => {
            let config = load_config(&opts, policy.as_deref())?;
            let mut sim = Simulation::new(config).context("Failed to set up simulation")?;
            let result = sim
                .run_with(|snapshot| println!("{}", stats::format_progress_line(snapshot)))
                .context("Simulation aborted")?;

            println!("{}", stats::format_table(&result));
            println!(
                "{}",
                stats::format_server_table(&result.per_server, SERVER_TABLE_ROWS)
            );
            write_output(opts.output.as_deref(), &result)?;
        }
        Commands::Compare { opts, policies } => {
            let config = load_config(&opts, None)?;
            let names: Vec<&str> = if policies.is_empty() {
                farmsim_dispatch::available_policies()
            } else {
                policies.iter().map(|s| s.as_str()).collect()
            };

            let results = farmsim_core::compare_policies(&config, &names)
                .context("Policy comparison failed")?;
            println!("{}", stats::format_comparison_table(&results));
            for result in &results {
                println!("{}", stats::format_table(result));
            }
            write_output(opts.output.as_deref(), &results)?;
        }
        Commands::Sweep {
            opts,
            policy,
            rates,
        } => {
            let config = load_config(&opts, policy.as_deref())?;
            let results =
                farmsim_core::sweep_rates(&config, &rates).context("Rate sweep failed")?;
            for result in &results {
                print_sweep_line(result);
            }
            println!("{}", stats::format_comparison_table(&results));
            write_output(opts.output.as_deref(), &results)?;
        }
        Commands::ListPolicies => {
            println!("Available dispatch policies:");
            for name in farmsim_dispatch::available_policies() {
                println!("  - {}", name);
            }
        }
    }
    Ok(())
}

/// Load the config file (or defaults) and apply command-line overrides.
fn load_config(opts: &RunOptions, policy: Option<&str>) -> Result<SimConfig> {
    let mut config = match &opts.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("Error loading config {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(policy) = policy {
        config.simulation.policy = policy.to_string();
    }
    if let Some(rate) = opts.rate {
        config.simulation.arrival_rate = rate;
    }
    if let Some(seed) = opts.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(horizon) = opts.horizon {
        config.simulation.horizon_ticks = horizon;
    }
    config
        .validate()
        .context("Invalid command-line overrides")?;
    Ok(config)
}

fn print_sweep_line(result: &RunSummary) {
    let s = &result.final_stats;
    println!(
        "Rate {:.2}/tick: accepted {:.2}% | throughput {:.4}/tick | cache hit {:.2}% | avg latency {:.2}",
        result.arrival_rate,
        s.accept_rate * 100.0,
        s.throughput,
        s.hit_rate * 100.0,
        s.avg_latency
    );
}

fn write_output<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(value).context("Error serializing results")?;
    std::fs::write(path, json)
        .with_context(|| format!("Error writing output {}", path.display()))?;
    println!("Results written to {}", path.display());
    Ok(())
}
