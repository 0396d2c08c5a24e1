//! scenealign - Operator harness for positioning runs
//!
//! The `scenealign` command exercises the convergence loop without a live
//! scene or model backend.
//!
//! ## Commands
//!
//! - `selftest`: run a deterministic simulated convergence run against a
//!   synthetic ground-truth target
//! - `inspect`: summarize a saved iteration log
//! - `parse-verdict`: feed a raw oracle response through the strict parser

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use scenealign_core::{
    ActorId, ConvergenceController, Rotation, RunConfig, TargetSpec, Transform, Vec3,
};
use scenealign_oracle::parse_verdict;

mod sim;
mod telemetry;
mod writer;

use sim::SimulatedScene;

#[derive(Parser)]
#[command(name = "scenealign")]
#[command(author = "Halcyon Previz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "VLM-guided storyboard positioning harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a deterministic self-test convergence run against a synthetic
    /// ground-truth target
    Selftest {
        /// Safety cap on iterations
        #[arg(long, default_value_t = 5)]
        max_iterations: u32,

        /// Similarity threshold for convergence
        #[arg(long, default_value_t = 0.85)]
        threshold: f64,

        /// Iterations examined for stagnation
        #[arg(long, default_value_t = 3)]
        plateau_window: u32,

        /// Minimum fractional improvement over the plateau window
        #[arg(long, default_value_t = 0.05)]
        plateau_epsilon: f64,

        /// Fraction of the remaining offset the simulated oracle corrects
        /// per iteration
        #[arg(long, default_value_t = 0.5)]
        gain: f64,

        /// Write the iteration log JSON here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a saved iteration log
    Inspect {
        /// Path to an iteration log JSON document
        log: PathBuf,
    },

    /// Parse a raw oracle response and print the verdict
    ParseVerdict {
        /// Path to a file holding the raw model output
        response: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Selftest {
            max_iterations,
            threshold,
            plateau_window,
            plateau_epsilon,
            gain,
            output,
        } => {
            cmd_selftest(
                max_iterations,
                threshold,
                plateau_window,
                plateau_epsilon,
                gain,
                output.as_deref(),
            )
            .await
        }
        Commands::Inspect { log } => cmd_inspect(&log),
        Commands::ParseVerdict { response } => cmd_parse_verdict(&response),
    }
}

async fn cmd_selftest(
    max_iterations: u32,
    threshold: f64,
    plateau_window: u32,
    plateau_epsilon: f64,
    gain: f64,
    output: Option<&Path>,
) -> Result<()> {
    // Start deliberately far from the target so the loop has real distance
    // to close.
    let actor = ActorId::new("SelftestCube");
    let initial = Transform::new(Vec3::new(300.0, 250.0, 150.0), Rotation::yaw(90.0));
    let goal = Transform::at(0.0, 0.0, 100.0);

    info!(
        actor = %actor,
        initial = %initial.position,
        goal = %goal.position,
        gain = gain,
        "Starting self-test"
    );

    let scene = Arc::new(SimulatedScene::new(actor.clone(), initial, goal, gain));
    let controller = ConvergenceController::new(scene.clone(), scene.clone(), scene.clone());
    let target = TargetSpec::from_description(actor, "actor centered in frame at eye height")
        .with_ground_truth(goal);
    let config = RunConfig::default()
        .with_max_iterations(max_iterations)
        .with_convergence_threshold(threshold)
        .with_plateau(plateau_window, plateau_epsilon);

    let report = controller
        .run(&target, &config)
        .await
        .context("invalid run configuration")?;

    println!("Run {}: {}", report.run_id, report.outcome);
    for record in &report.records {
        println!(
            "  iteration {}: similarity {:.3}, position {}",
            record.iteration,
            record.evaluation.similarity(),
            record.transform.position
        );
    }
    println!(
        "Remaining distance to target: {:.1} units",
        scene.distance_to_target()
    );

    if let Some(path) = output {
        writer::write_report(path, &report)?;
        println!("Iteration log saved: {}", path.display());
    }

    if report.outcome.is_aborted() {
        bail!("self-test run aborted: {}", report.outcome);
    }
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read iteration log {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("iteration log {} is not valid JSON", path.display()))?;

    let summary = &document["summary"];
    println!(
        "Outcome: {}",
        summary["outcome"].as_str().unwrap_or("unknown")
    );
    println!("Iterations: {}", summary["total_iterations"]);
    if let Some(similarity) = summary["final_similarity"].as_f64() {
        println!("Final similarity: {similarity:.3}");
    }

    if let Some(iterations) = document["iterations"].as_array() {
        println!("Similarity progression:");
        for entry in iterations {
            println!(
                "  iteration {}: similarity {}",
                entry["iteration"], entry["similarity"]
            );
        }
    }
    Ok(())
}

fn cmd_parse_verdict(path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response file {}", path.display()))?;

    match parse_verdict(&raw) {
        Ok(result) => {
            println!("similarity: {}", result.similarity());
            println!(
                "position_delta: {}",
                result.adjustment().position_delta
            );
            if let Some(rotation) = &result.adjustment().rotation_delta {
                println!("rotation_delta: {rotation}");
            }
            if let Some(rationale) = result.rationale() {
                println!("rationale: {rationale}");
            }
            Ok(())
        }
        Err(e) => bail!("verdict rejected: {e}"),
    }
}
