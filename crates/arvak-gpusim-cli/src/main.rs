//! Arvak GPU-Sim Command-Line Interface
//!
//! Runs circuit files on the accelerator state-vector engine and prints
//! measurement counts.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

mod circuit;
mod commands;

use commands::run::{OutputFormat, PrecisionArg, RunArgs};
use commands::{gates, run, version};

/// Arvak GPU-Sim - accelerator-resident state-vector simulation
#[derive(Parser)]
#[command(name = "arvak-gpusim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "ARVAK_GPUSIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a circuit file and sample measurement outcomes
    Run {
        /// Circuit file (JSON or YAML)
        input: PathBuf,

        /// Number of shots
        #[arg(short, long, default_value = "1024")]
        shots: usize,

        /// Sampling seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Amplitude precision
        #[arg(short, long, value_enum, default_value = "double")]
        precision: PrecisionArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Also print the outcome probabilities
        #[arg(long)]
        probabilities: bool,
    },

    /// List the registered gates
    Gates,

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = arvak_gpusim::SimulatorConfig::load(cli.config.as_deref())?;
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "info".into(),
        2 => config.logging.level = "debug".into(),
        _ => config.logging.level = "trace".into(),
    }
    arvak_gpusim::logging::init_from_config(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;

    let result = match cli.command {
        Commands::Run {
            input,
            shots,
            seed,
            precision,
            format,
            probabilities,
        } => run::execute(
            &config,
            &RunArgs {
                input,
                shots,
                seed,
                precision,
                format,
                probabilities,
            },
        ),

        Commands::Gates => {
            gates::execute();
            Ok(())
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
