//! Out-of-order timing simulator CLI.
//!
//! This binary drives the timing core from files. It provides:
//! 1. **Run:** Load a JSON configuration and a JSON micro-op trace, simulate
//!    until the trace finishes or a limit is reached, and print the report.
//! 2. **Defaults:** Print the default configuration as JSON, as a starting
//!    point for custom configurations.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (for example `RUST_LOG=o3sim_core=debug`).

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use o3sim_core::config::Config;
use o3sim_core::sim::FinishReason;
use o3sim_core::sim::memory::FixedLatencyMemory;
use o3sim_core::sim::trace::TraceWorkload;
use o3sim_core::stats::STATS_SECTIONS;
use o3sim_core::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "o3sim",
    author,
    version,
    about = "Cycle-level out-of-order superscalar timing simulator",
    long_about = "Simulate a multi-core, multi-threaded out-of-order processor on a recorded micro-op trace.\n\nExamples:\n  o3sim defaults > machine.json\n  o3sim run --config machine.json --trace workload.json\n  o3sim run --trace workload.json --stats summary --stats branch"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a trace and print the statistics report.
    Run {
        /// Machine configuration (JSON); built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Workload trace (JSON).
        #[arg(short, long)]
        trace: PathBuf,

        /// Also write the full report as JSON to this path.
        #[arg(long)]
        stats_json: Option<PathBuf>,

        /// Report sections to print; all sections when omitted.
        #[arg(long = "stats", value_parser = clap::builder::PossibleValuesParser::new(STATS_SECTIONS))]
        sections: Vec<String>,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            trace,
            stats_json,
            sections,
        } => cmd_run(config, &trace, stats_json, &sections),
        Commands::Defaults => match serde_json::to_string_pretty(&Config::default()) {
            Ok(json) => println!("{json}"),
            Err(e) => fail(&format!("cannot serialize the default configuration: {e}")),
        },
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}

/// Loads the configuration and trace, runs to completion, and prints the report.
///
/// Exits with code 1 on invalid input and code 2 when the run ended in a
/// commit livelock.
fn cmd_run(
    config: Option<PathBuf>,
    trace: &Path,
    stats_json: Option<PathBuf>,
    sections: &[String],
) {
    let config = match config {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .unwrap_or_else(|e| fail(&format!("reading {}: {e}", path.display())));
            Config::from_json(&json).unwrap_or_else(|e| fail(&format!("{}: {e}", path.display())))
        }
        None => Config::default(),
    };

    let workload = TraceWorkload::from_file(trace)
        .unwrap_or_else(|e| fail(&format!("{}: {e}", trace.display())));
    if let Err(e) = workload.check_operands(&config.arch) {
        fail(&format!("{}: {e}", trace.display()));
    }

    let memory = FixedLatencyMemory::new(config.memory, config.general.cores);
    let mut sim =
        Simulator::new(config, workload, memory).unwrap_or_else(|e| fail(&e.to_string()));
    let report = sim.run().unwrap_or_else(|e| fail(&e.to_string()));

    report.print_sections(sections);

    if let Some(path) = stats_json {
        let json = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|e| fail(&format!("serializing the report: {e}")));
        if let Err(e) = fs::write(&path, json) {
            fail(&format!("writing {}: {e}", path.display()));
        }
    }

    if matches!(sim.finished(), Some(FinishReason::CommitStall { .. })) {
        process::exit(2);
    }
}
