mod schedule;

pub use schedule::{RosterChange, RosterSchedule};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use courtmix_core::model::player::PlayerId;
use courtmix_core::model::round::RoundViolation;
use courtmix_core::model::team::Match;
use courtmix_core::pairing::{Checkpoint, GenerationError, PlanOutcome, RoundRequest, plan_round};
use courtmix_core::session::Session;
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsError, FairnessCollector, FairnessSummary};
use crate::config::{ResolvedOutputs, SimulationConfig};
use crate::logging::TELEMETRY_FILE;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

/// Plays a configured session round by round.
pub struct SessionRunner {
    config: SimulationConfig,
    outputs: ResolvedOutputs,
    schedule: RosterSchedule,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub rounds_played: usize,
    pub rows_written: usize,
    pub final_roster: Vec<PlayerId>,
    pub fairness: FairnessSummary,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl SessionRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        Session::new(config.session.initial_roster(), config.session.courts)?;
        let schedule = RosterSchedule::from_config(&config.session);

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            schedule,
        })
    }

    /// Execute the session, streaming one JSONL row per round to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.session.seed.unwrap_or(0));
        let mut roster = self.config.session.initial_roster();
        let mut session = Session::new(roster.clone(), self.config.session.courts)?;
        let mut analytics = FairnessCollector::new();
        let checkpoint = Checkpoint::none();
        let mut rows_written = 0usize;

        for round_index in 0..self.config.session.rounds {
            let change = self.schedule.apply(round_index, &mut roster);
            if !change.is_empty() {
                session
                    .set_roster(roster.clone())
                    .map_err(|source| RunnerError::Roster {
                        round: round_index,
                        source,
                    })?;
            }
            let volunteers = self.schedule.volunteers(round_index, session.roster());

            let request = RoundRequest::new(session.rounds(), session.roster(), session.courts())
                .with_volunteers(&volunteers);
            let started = Instant::now();
            let outcome = plan_round(request, &self.config.planner, &mut rng, &checkpoint)
                .map_err(|source| RunnerError::Planning {
                    round: round_index,
                    source,
                })?;
            let elapsed = started.elapsed();

            analytics.record_round(session.roster(), &outcome, elapsed);
            write_round_row(
                &mut writer,
                &self.config.run_id,
                round_index,
                session.roster().len(),
                &change,
                &volunteers,
                &outcome,
                elapsed,
            )?;
            rows_written += 1;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "courtmix_bench::round",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    round_index = round_index as u32,
                    roster = session.roster().len() as u32,
                    arrived = change.arrived.len() as u32,
                    departed = change.departed.len() as u32,
                    volunteers = volunteers.len() as u32,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "round planned"
                );
            }

            session
                .push_round(outcome.round)
                .map_err(|source| RunnerError::RoundRejected {
                    round: round_index,
                    source,
                })?;
        }

        writer.flush()?;

        let fairness = analytics.finalize(session.rounds())?;
        fairness.write_markdown(&self.outputs.summary_md)?;

        let telemetry_dir = self.outputs.summary_dir();
        let telemetry_path = if self.logging_enabled {
            Some(telemetry_dir.join(TELEMETRY_FILE))
        } else {
            None
        };

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            rounds_played: session.len(),
            rows_written,
            final_roster: session.roster().to_vec(),
            fairness,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            telemetry_outputs,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_round_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    round_index: usize,
    roster_size: usize,
    change: &RosterChange,
    volunteers: &[PlayerId],
    outcome: &PlanOutcome,
    elapsed: Duration,
) -> Result<(), RunnerError> {
    let row = RoundLogRow {
        run_id,
        round_id: format!("R{round_index:03}"),
        round_index,
        roster_size,
        arrived: &change.arrived,
        departed: &change.departed,
        volunteers,
        matches: &outcome.round.matches,
        sit_outs: &outcome.round.sit_outs,
        duplicates: outcome.score.duplicates,
        partner_score: outcome.score.partner,
        opponent_score: outcome.score.opponent,
        depth: outcome.depth,
        trials: outcome.trials,
        truncated: outcome.truncated,
        plan_ms: elapsed.as_secs_f64() * 1000.0,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Serialize)]
struct RoundLogRow<'a> {
    run_id: &'a str,
    round_id: String,
    round_index: usize,
    roster_size: usize,
    arrived: &'a [PlayerId],
    departed: &'a [PlayerId],
    volunteers: &'a [PlayerId],
    matches: &'a [Match],
    sit_outs: &'a [PlayerId],
    duplicates: u32,
    partner_score: u32,
    opponent_score: f64,
    depth: usize,
    trials: usize,
    truncated: usize,
    plan_ms: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("session setup rejected: {0}")]
    Session(#[from] GenerationError),
    #[error("roster change before round {round} rejected: {source}")]
    Roster {
        round: usize,
        source: GenerationError,
    },
    #[error("planning round {round} failed: {source}")]
    Planning {
        round: usize,
        source: GenerationError,
    },
    #[error("planned round {round} does not fit the session: {source}")]
    RoundRejected {
        round: usize,
        source: RoundViolation,
    },
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
