use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use courtmix_core::heuristics::count_matches;
use courtmix_core::model::player::PlayerId;
use courtmix_core::model::round::Round;
use courtmix_core::pairing::PlanOutcome;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("statistics error: {0}")]
    Statistics(String),
}

/// Accumulates per-player fairness counters round by round.
#[derive(Debug, Default)]
pub struct FairnessCollector {
    players: BTreeMap<PlayerId, PlayerAccumulator>,
    plan_ms: Vec<f64>,
    rounds: usize,
    trials: usize,
    truncated: usize,
}

#[derive(Debug, Default)]
struct PlayerAccumulator {
    present: usize,
    games: usize,
    sit_outs: usize,
    partners: BTreeMap<PlayerId, usize>,
    opponents: BTreeMap<PlayerId, usize>,
}

impl FairnessCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_round(&mut self, roster: &[PlayerId], outcome: &PlanOutcome, elapsed: Duration) {
        self.rounds += 1;
        self.trials += outcome.trials;
        self.truncated += outcome.truncated;
        self.plan_ms.push(elapsed.as_secs_f64() * 1000.0);

        for player in roster {
            self.players.entry(player.clone()).or_default().present += 1;
        }
        for player in &outcome.round.sit_outs {
            self.players.entry(player.clone()).or_default().sit_outs += 1;
        }

        for game in &outcome.round.matches {
            for team in game.teams() {
                let [a, b] = team.players();
                for (player, partner) in [(a, b), (b, a)] {
                    let acc = self.players.entry(player.clone()).or_default();
                    acc.games += 1;
                    *acc.partners.entry(partner.clone()).or_insert(0) += 1;
                }
            }
            for (left, right) in game.cross_pairs() {
                for (player, opponent) in [(left, right), (right, left)] {
                    let acc = self.players.entry(player.clone()).or_default();
                    *acc.opponents.entry(opponent.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Builds the report. `rounds` is the full history the collector saw.
    pub fn finalize(self, rounds: &[Round]) -> Result<FairnessSummary, AnalyticsError> {
        let (_, duplicate_matches) = count_matches(rounds, None);

        let players: Vec<PlayerReport> = self
            .players
            .into_iter()
            .map(|(player, acc)| acc.into_report(player))
            .collect();

        let repeat_partnerships = players
            .iter()
            .map(|report| report.partner_repeats)
            .sum::<usize>()
            / 2;

        let sit_outs: Vec<f64> = players.iter().map(|report| report.sit_outs as f64).collect();
        let sit_out_spread = players
            .iter()
            .map(|report| report.sit_outs)
            .max()
            .zip(players.iter().map(|report| report.sit_outs).min())
            .map_or(0, |(max, min)| max - min);

        Ok(FairnessSummary {
            rounds: self.rounds,
            trials: self.trials,
            truncated_rollouts: self.truncated,
            duplicate_matches,
            repeat_partnerships,
            sit_out_spread,
            sit_out_std_dev: sample_std_dev(&sit_outs),
            plan_ms: latency_interval(&self.plan_ms)?,
            players,
        })
    }
}

impl PlayerAccumulator {
    fn into_report(self, player: PlayerId) -> PlayerReport {
        let partner_repeats = self.partners.values().map(|count| count - 1).sum();
        PlayerReport {
            player: player.to_string(),
            rounds_present: self.present,
            games: self.games,
            sit_outs: self.sit_outs,
            distinct_partners: self.partners.len(),
            max_with_one_partner: self.partners.values().copied().max().unwrap_or(0),
            partner_repeats,
            distinct_opponents: self.opponents.len(),
        }
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    use statrs::statistics::Statistics;

    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

fn latency_interval(samples: &[f64]) -> Result<LatencySummary, AnalyticsError> {
    use statrs::statistics::Statistics;

    if samples.is_empty() {
        return Ok(LatencySummary::default());
    }
    let mean = samples.iter().mean();
    if samples.len() == 1 {
        return Ok(LatencySummary {
            mean,
            ci95: (mean, mean),
            max: mean,
        });
    }

    let normal = Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Statistics(err.to_string()))?;
    let z = normal.inverse_cdf(0.5 + CONFIDENCE / 2.0);
    let std_error = samples.iter().std_dev() / (samples.len() as f64).sqrt();
    Ok(LatencySummary {
        mean,
        ci95: (mean - z * std_error, mean + z * std_error),
        max: samples.iter().copied().fold(f64::MIN, f64::max),
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub mean: f64,
    pub ci95: (f64, f64),
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub player: String,
    pub rounds_present: usize,
    pub games: usize,
    pub sit_outs: usize,
    pub distinct_partners: usize,
    pub max_with_one_partner: usize,
    /// Games beyond the first with each partner.
    pub partner_repeats: usize,
    pub distinct_opponents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FairnessSummary {
    pub rounds: usize,
    pub trials: usize,
    pub truncated_rollouts: usize,
    pub duplicate_matches: u32,
    pub repeat_partnerships: usize,
    pub sit_out_spread: usize,
    pub sit_out_std_dev: f64,
    pub plan_ms: LatencySummary,
    pub players: Vec<PlayerReport>,
}

impl FairnessSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Session Summary\n\n");
        rows.push_str(&format!(
            "- Rounds: {} ({} rollouts, {} truncated)\n",
            self.rounds, self.trials, self.truncated_rollouts
        ));
        rows.push_str(&format!("- Duplicate matches: {}\n", self.duplicate_matches));
        rows.push_str(&format!("- Repeat partnerships: {}\n", self.repeat_partnerships));
        rows.push_str(&format!(
            "- Sit-out spread: {} (std dev {:.3})\n",
            self.sit_out_spread, self.sit_out_std_dev
        ));
        rows.push_str(&format!(
            "- Planning time: {:.2} ms avg, 95% CI [{:.2}, {:.2}], max {:.2} ms\n\n",
            self.plan_ms.mean, self.plan_ms.ci95.0, self.plan_ms.ci95.1, self.plan_ms.max
        ));

        rows.push_str("| Player | Present | Games | Sit-outs | Partners | Max w/ one | Repeats | Opponents |\n");
        rows.push_str("|--------|---------|-------|----------|----------|------------|---------|-----------|\n");
        for report in &self.players {
            rows.push_str(&format!(
                "| {player} | {present} | {games} | {sit_outs} | {partners} | {max_one} | {repeats} | {opponents} |\n",
                player = report.player,
                present = report.rounds_present,
                games = report.games,
                sit_outs = report.sit_outs,
                partners = report.distinct_partners,
                max_one = report.max_with_one_partner,
                repeats = report.partner_repeats,
                opponents = report.distinct_opponents,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|source| AnalyticsError::Io {
            context: "writing summary markdown",
            source,
        })?;
        Ok(())
    }
}
