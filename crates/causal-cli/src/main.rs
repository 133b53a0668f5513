//! Causal ordering CLI
//!
//! Resolves Lamport clocks for a process/task graph and prints the resulting
//! execution order. Without arguments the built-in sample graph is used.

use anyhow::Context;
use causal_core::prelude::*;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "causal")]
#[command(version)]
#[command(about = "Causal execution ordering with Lamport logical clocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Graph description (TOML); defaults to the built-in sample
    #[arg(short, long, global = true)]
    graph: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CAUSAL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the maximum number of resolution passes
    #[arg(long, global = true)]
    max_iterations: Option<u32>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve clocks and print the execution order (default)
    Order {
        /// Print the order as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report whether the graph has a happens-before cycle
    Check,

    /// Print the graph (the sample unless --graph is given) as TOML
    Sample,
}

/// Contents of the `--config` file
#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default)]
    resolver: ResolverConfig,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    position: usize,
    process: &'a str,
    task: &'a str,
    clock: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    resolved: bool,
    iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u32>,
    order: Vec<JsonEntry<'a>>,
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false),
        )
        .init();
}

fn load_settings(path: Option<&Path>, max_iterations: Option<u32>) -> anyhow::Result<ResolverConfig> {
    let mut settings = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str::<Settings>(&content)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(max_iterations) = max_iterations {
        settings.resolver.max_iterations = max_iterations;
    }
    settings.resolver.validate()?;
    Ok(settings.resolver)
}

fn load_graph(path: Option<&Path>) -> anyhow::Result<GraphSpec> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading graph {}", path.display()))?;
            let spec = toml::from_str(&content)
                .with_context(|| format!("parsing graph {}", path.display()))?;
            Ok(spec)
        }
        None => Ok(reference_graph()),
    }
}

fn write_order<W: Write>(system: &mut ClockSystem, out: &mut W) -> io::Result<()> {
    writeln!(out, "Starting Lamport's logical clock...")?;
    writeln!(out, "Determining clock values for each task and ordering them")?;

    let order = match system.resolve_all().and_then(|_| system.compute_order()) {
        Ok(order) => order,
        Err(err) => {
            return writeln!(out, "Clock resolution failed [{}]: {}", err.code(), err);
        }
    };

    writeln!(out, "Final execution order:-----")?;
    for line in order.lines() {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "---------------------------")
}

fn json_report(system: &mut ClockSystem) -> anyhow::Result<String> {
    let outcome = system.resolve_all().and_then(|_| system.compute_order());
    let report = match &outcome {
        Ok(order) => JsonReport {
            resolved: true,
            iterations: system.iterations(),
            error: None,
            code: None,
            order: order
                .entries()
                .iter()
                .enumerate()
                .map(|(i, entry)| JsonEntry {
                    position: i + 1,
                    process: &entry.process,
                    task: &entry.label,
                    clock: entry.clock,
                })
                .collect(),
        },
        Err(err) => JsonReport {
            resolved: false,
            iterations: system.iterations(),
            error: Some(err.to_string()),
            code: Some(err.code()),
            order: Vec::new(),
        },
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn check(system: &ClockSystem) {
    match system.check_acyclic() {
        Ok(()) => println!(
            "No cyclic dependencies among {} tasks in {} processes",
            system.task_count(),
            system.processes().len()
        ),
        Err(err) => println!("{}", err),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_settings(cli.config.as_deref(), cli.max_iterations)?;
    let spec = load_graph(cli.graph.as_deref())?;
    tracing::debug!(
        processes = spec.processes.len(),
        tasks = spec.task_count(),
        max_iterations = config.max_iterations,
        "graph loaded"
    );

    match cli.command.unwrap_or(Commands::Order { json: false }) {
        Commands::Order { json } => {
            let mut system = spec.build(config)?;
            if json {
                println!("{}", json_report(&mut system)?);
            } else {
                write_order(&mut system, &mut io::stdout().lock())?;
            }
        }

        Commands::Check => {
            let system = spec.build(config)?;
            check(&system);
        }

        Commands::Sample => {
            print!("{}", toml::to_string(&spec)?);
        }
    }

    Ok(())
}
