//! Run command implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::ValueEnum;
use console::style;
use serde::Serialize;
use tracing::info;

use arvak_gpusim::{CopyMode, Precision, SimulatorConfig, StateVector};

use crate::circuit::{CircuitFile, load_circuit};

/// Amplitude precision selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrecisionArg {
    /// complex<f32>
    Single,
    /// complex<f64>
    Double,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments of the run command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub input: PathBuf,
    pub shots: usize,
    pub seed: Option<u64>,
    pub precision: PrecisionArg,
    pub format: OutputFormat,
    pub probabilities: bool,
}

/// Outcome of one circuit run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub num_qubits: usize,
    pub num_operations: usize,
    pub shots: usize,
    pub precision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
    pub execution_time_ms: u64,
}

/// Execute the run command.
pub fn execute(config: &SimulatorConfig, args: &RunArgs) -> Result<()> {
    let circuit = load_circuit(&args.input)?;

    let mut config = config.clone();
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    if args.format == OutputFormat::Text {
        println!(
            "{} Running {} ({} qubits, {} operations, {} shots, {:?} precision)",
            style("→").cyan().bold(),
            style(args.input.display()).green(),
            circuit.num_qubits,
            circuit.operations.len(),
            args.shots,
            args.precision
        );
    }

    let report = match args.precision {
        PrecisionArg::Single => simulate::<f32>(&circuit, &config, args.shots, args.probabilities)?,
        PrecisionArg::Double => simulate::<f64>(&circuit, &config, args.shots, args.probabilities)?,
    };

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

/// Apply every operation of `circuit` to `|0…0⟩` and sample `shots` outcomes.
pub fn simulate<P: Precision>(
    circuit: &CircuitFile,
    config: &SimulatorConfig,
    shots: usize,
    with_probabilities: bool,
) -> Result<RunReport> {
    let operations = circuit.operations::<P>()?;
    let start = Instant::now();

    let mut sv = StateVector::<P>::from_config(config, circuit.num_qubits)?;
    sv.initialize(CopyMode::Async)?;
    sv.apply_batch(&operations)?;
    let samples = sv.generate_samples(shots)?;
    let probabilities = if with_probabilities {
        Some(sv.probabilities()?)
    } else {
        None
    };

    let elapsed = start.elapsed();
    info!(
        num_qubits = circuit.num_qubits,
        operations = operations.len(),
        shots,
        elapsed_ms = elapsed.as_millis() as u64,
        "Circuit run complete"
    );

    Ok(RunReport {
        num_qubits: circuit.num_qubits,
        num_operations: operations.len(),
        shots,
        precision: P::KIND.to_string(),
        seed: config.seed,
        counts: samples.counts().into_iter().collect(),
        probabilities,
        execution_time_ms: elapsed.as_millis() as u64,
    })
}

fn print_report(report: &RunReport) {
    println!(
        "\n{} Results ({} shots):",
        style("✓").green().bold(),
        report.shots
    );

    let mut sorted: Vec<_> = report.counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let total = report.shots.max(1) as f64;

    for (bitstring, count) in sorted.iter().take(16) {
        let prob = **count as f64 / total * 100.0;
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }

    if let Some(probabilities) = &report.probabilities {
        println!("\n  Probabilities:");
        let width = report.num_qubits;
        for (index, p) in probabilities.iter().enumerate().filter(|(_, p)| **p > 0.0) {
            println!("    {index:0width$b}: {p:.6}");
        }
    }

    println!(
        "\n  Execution time: {} ms",
        style(report.execution_time_ms).yellow()
    );
}
