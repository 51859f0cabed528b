use super::matcher::PreferenceMatrix;
use crate::heuristics::{HeuristicsMap, MatchCounts, PlayerHeuristics, PlayerRecords, times_played};
use crate::model::player::PlayerId;
use crate::model::team::{Match, Team};
use serde::{Deserialize, Serialize};

/// Tunable constants of the desirability formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Exponent on the excess partner count in the partner score denominator.
    pub partner_count_exponent: f64,
    /// Exponent on rounds since two players last faced each other.
    pub opponent_recency_exponent: f64,
    /// Exponent on how often a match-up was already played.
    pub repeat_match_exponent: f64,
    /// Lowest multiplier applied to over-exposed opponents.
    pub frequency_floor: f64,
    /// Exponent on the duplicate penalty when ranking candidate matches.
    pub duplicate_round_exponent: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            partner_count_exponent: 2.0,
            opponent_recency_exponent: 2.0,
            repeat_match_exponent: 2.0,
            frequency_floor: 0.5,
            duplicate_round_exponent: 2.0,
        }
    }
}

fn above_min(records: &PlayerRecords, other: &PlayerId) -> f64 {
    f64::from(records.get(other).saturating_sub(records.min))
}

/// How much `stats`' owner wants `candidate` as a partner.
///
/// Long-unseen partners score high; partners already shared more often than
/// the owner's least-shared partner are damped.
pub fn partner_score(stats: &PlayerHeuristics, candidate: &PlayerId, weights: &ScoringWeights) -> f64 {
    let net_since = above_min(&stats.rounds_since_played_with, candidate);
    let net_count = above_min(&stats.played_with_count, candidate);
    net_since / (net_count.powf(weights.partner_count_exponent) + 1.0)
}

fn opponent_desirability(stats: &PlayerHeuristics, target: &PlayerId, weights: &ScoringWeights) -> f64 {
    let with = &stats.played_with_count;
    let against = &stats.played_against_count;

    let spread = f64::from(with.max.saturating_sub(with.min))
        + f64::from(against.max.saturating_sub(against.min));
    let max_exposure = if spread == 0.0 { 1.0 } else { spread };
    let exposure = above_min(with, target) + above_min(against, target);

    let floor = weights.frequency_floor;
    let multiplier = (1.0 - exposure / max_exposure) * (1.0 - floor) + floor;
    let recency = above_min(&stats.rounds_since_played_against, target);
    recency.powf(weights.opponent_recency_exponent) * multiplier
}

/// How much `team` wants to face `opponent`, summed over the four cross pairs
/// and damped by how often this exact match-up already happened.
pub fn opponent_score(
    team: &Team,
    opponent: &Team,
    heuristics: &HeuristicsMap,
    counts: &MatchCounts,
    weights: &ScoringWeights,
) -> f64 {
    let mut total = 0.0;
    for player in team.players() {
        let Some(stats) = heuristics.get(player) else {
            continue;
        };
        for target in opponent.players() {
            total += opponent_desirability(stats, target, weights);
        }
    }
    let repeats = f64::from(times_played(counts, &Match::new(team.clone(), opponent.clone())));
    total / (repeats.powf(weights.repeat_match_exponent) + 1.0)
}

/// Partner preferences between `members`, indexed like `members`.
pub fn partner_preferences(
    members: &[PlayerId],
    heuristics: &HeuristicsMap,
    weights: &ScoringWeights,
) -> PreferenceMatrix {
    PreferenceMatrix::from_fn(members.len(), |from, to| {
        heuristics
            .get(&members[from])
            .map_or(0.0, |stats| partner_score(stats, &members[to], weights))
    })
}

/// Opponent preferences between `teams`, indexed like `teams`.
pub fn team_preferences(
    teams: &[Team],
    heuristics: &HeuristicsMap,
    counts: &MatchCounts,
    weights: &ScoringWeights,
) -> PreferenceMatrix {
    PreferenceMatrix::from_fn(teams.len(), |from, to| {
        opponent_score(&teams[from], &teams[to], heuristics, counts, weights)
    })
}
