use std::path::PathBuf;

use clap::Parser;

use courtmix_bench::config::{ResolvedOutputs, SimulationConfig};
use courtmix_bench::logging::init_logging;
use courtmix_bench::simulation::SessionRunner;

/// Session simulator for the doubles round planner.
#[derive(Debug, Parser)]
#[command(
    name = "courtmix-bench",
    author,
    version,
    about = "Deterministic doubles session simulator"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of rounds to plan.
    #[arg(long, value_name = "ROUNDS")]
    rounds: Option<usize>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of lookahead rollouts per round.
    #[arg(long, value_name = "COUNT")]
    attempts: Option<usize>,

    /// Override the rollout depth.
    #[arg(long, value_name = "ROUNDS")]
    lookahead: Option<usize>,

    /// Exit after validating the configuration (no session is simulated).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SimulationConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(rounds) = cli.rounds {
        config.session.rounds = rounds;
    }

    if let Some(seed) = cli.seed {
        config.session.seed = Some(seed);
    }

    if let Some(attempts) = cli.attempts {
        config.planner.attempts = attempts;
    }

    if let Some(lookahead) = cli.lookahead {
        config.planner.lookahead = lookahead;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let players = config.session.initial_roster().len();
    let courts = config.session.courts;
    let rounds = config.session.rounds;

    println!(
        "Loaded configuration '{run_id}' with {players} players on {courts} court{} ({rounds} rounds)",
        if courts == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SessionRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Session complete for '{run_id}': {} rounds, {} rows at {}",
        summary.rounds_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!(
        "  Repeat partnerships: {}, duplicate matches: {}, sit-out spread: {}",
        summary.fairness.repeat_partnerships,
        summary.fairness.duplicate_matches,
        summary.fairness.sit_out_spread
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        if let Some(avg_trials) = outputs.summary.planned.avg_trials {
            println!(
                "  Planned rounds: {} events, avg {:.1} rollouts",
                outputs.summary.planned.count, avg_trials
            );
        }
    }

    Ok(())
}
