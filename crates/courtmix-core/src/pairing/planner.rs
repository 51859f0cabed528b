//! Monte-Carlo lookahead over the round generator.
//!
//! Each trial plays several generated rounds forward from the current history
//! and scores the whole rollout. The first round of the best rollout is the
//! one returned, which keeps the planner from taking a partition that looks
//! good now but leaves only repeats a couple of rounds later.

use super::checkpoint::Checkpoint;
use super::error::{GenerationError, GenerationPhase};
use super::generator::{GeneratorConfig, RoundRequest, Snapshot, generate_round_from};
use crate::model::round::Round;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{Level, event};

const PLANNER_TARGET: &str = "courtmix_core::planner";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Independent rollouts per call.
    pub attempts: usize,
    /// Rounds simulated per rollout.
    pub lookahead: usize,
    pub generator: GeneratorConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            attempts: 20,
            lookahead: 3,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Accumulated cost of one rollout. Near rounds weigh more for duplicates and
/// partners; opponent staleness counts equally throughout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RolloutScore {
    pub duplicates: u32,
    pub partner: u32,
    pub opponent: f64,
}

impl RolloutScore {
    /// Fewer duplicates first, then partner score, then opponent score.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.duplicates
            .cmp(&other.duplicates)
            .then(self.partner.cmp(&other.partner))
            .then(self.opponent.total_cmp(&other.opponent))
    }
}

/// A planned round with the evidence behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    pub round: Round,
    pub score: RolloutScore,
    /// Winning rollout depth.
    pub depth: usize,
    pub trials: usize,
    /// Rollouts cut short by an exhausted step.
    pub truncated: usize,
}

/// Plans the next round with a yield-only checkpoint.
pub fn plan_next_round<R: Rng + ?Sized>(
    request: RoundRequest<'_>,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<Round, GenerationError> {
    plan_next_round_with(request, config, rng, &Checkpoint::none())
}

pub fn plan_next_round_with<R: Rng + ?Sized>(
    request: RoundRequest<'_>,
    config: &PlannerConfig,
    rng: &mut R,
    checkpoint: &Checkpoint,
) -> Result<Round, GenerationError> {
    plan_round(request, config, rng, checkpoint).map(|outcome| outcome.round)
}

/// Runs every rollout and returns the winning first round with its score.
pub fn plan_round<R: Rng + ?Sized>(
    request: RoundRequest<'_>,
    config: &PlannerConfig,
    rng: &mut R,
    checkpoint: &Checkpoint,
) -> Result<PlanOutcome, GenerationError> {
    request.validate()?;

    let base = Snapshot::from_history(request.rounds, request.roster);
    let lookahead = config.lookahead.max(1);
    let attempts = config.attempts.max(1);

    let mut best: Option<(Round, RolloutScore, usize)> = None;
    let mut truncated = 0;
    let mut first_failure: Option<GenerationError> = None;

    for trial in 0..attempts {
        checkpoint.check()?;

        let mut working: Option<Snapshot> = None;
        let mut first_round: Option<Round> = None;
        let mut score = RolloutScore::default();
        let mut depth = 0;

        for step in 0..lookahead {
            let snapshot = working.as_ref().unwrap_or(&base);
            let step_request = if step == 0 {
                request
            } else {
                request.with_volunteers(&[])
            };
            let weight = u32::try_from(lookahead - step).unwrap_or(u32::MAX);

            match generate_round_from(step_request, snapshot, &config.generator, rng, checkpoint) {
                Ok(generated) => {
                    score.partner += generated.diagnostics.team_score * weight;
                    score.duplicates += generated.diagnostics.new_duplicates * weight;
                    score.opponent += generated.diagnostics.match_score;
                    if first_round.is_none() {
                        first_round = Some(generated.round);
                    }
                    working = Some(generated.snapshot);
                    depth += 1;
                }
                Err(err) if err.is_exhausted() => {
                    truncated += 1;
                    if step == 0 && first_failure.is_none() {
                        first_failure = Some(err);
                    }
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        let Some(round) = first_round else {
            continue;
        };

        if tracing::enabled!(target: PLANNER_TARGET, Level::DEBUG) {
            event!(
                target: PLANNER_TARGET,
                Level::DEBUG,
                trial,
                depth,
                duplicates = score.duplicates,
                partner = score.partner,
                opponent = score.opponent,
                round = %round,
                "rollout scored"
            );
        }

        let improves = best
            .as_ref()
            .is_none_or(|(_, current, _)| score.compare(current) == Ordering::Less);
        if improves {
            best = Some((round, score, depth));
        }
    }

    let Some((round, score, depth)) = best else {
        return Err(first_failure.unwrap_or(GenerationError::exhausted(GenerationPhase::Lookahead)));
    };

    event!(
        target: PLANNER_TARGET,
        Level::INFO,
        trials = attempts,
        truncated,
        depth,
        duplicates = score.duplicates,
        partner = score.partner,
        opponent = score.opponent,
        sit_outs = round.sit_outs.len(),
        round = %round,
        "next round planned"
    );

    Ok(PlanOutcome {
        round,
        score,
        depth,
        trials: attempts,
        truncated,
    })
}
