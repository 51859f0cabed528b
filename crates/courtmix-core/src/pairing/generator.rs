//! Builds one candidate round: sit-outs, partnerships, then match-ups.

use super::checkpoint::Checkpoint;
use super::error::{GenerationError, GenerationPhase};
use super::matcher::{MatcherConfig, PairMatcher, Pairing, PreferenceMatrix};
use super::scoring::{ScoringWeights, partner_preferences, team_preferences};
use super::sitout::{DEFAULT_BASE_CHANCE, select_sit_outs};
use crate::heuristics::{HeuristicsMap, MatchCounts, compute_heuristics, count_matches};
use crate::model::player::{PlayerId, first_duplicate};
use crate::model::round::Round;
use crate::model::team::{Match, Team};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{Level, event};

/// Borrowed input to a generation call.
#[derive(Debug, Clone, Copy)]
pub struct RoundRequest<'a> {
    /// Past rounds, oldest first.
    pub rounds: &'a [Round],
    /// Players available for the next round.
    pub roster: &'a [PlayerId],
    pub courts: usize,
    /// Players who asked to sit out the next round.
    pub volunteers: &'a [PlayerId],
}

impl<'a> RoundRequest<'a> {
    pub fn new(rounds: &'a [Round], roster: &'a [PlayerId], courts: usize) -> Self {
        Self {
            rounds,
            roster,
            courts,
            volunteers: &[],
        }
    }

    pub fn with_volunteers(self, volunteers: &'a [PlayerId]) -> Self {
        Self { volunteers, ..self }
    }

    /// Rejects requests that can never produce a round.
    pub fn validate(&self) -> Result<(), GenerationError> {
        validate_roster(self.roster, self.courts)
    }
}

/// Checks the roster and court count shared by every entry point.
pub fn validate_roster(roster: &[PlayerId], courts: usize) -> Result<(), GenerationError> {
    if roster.len() < 4 {
        return Err(GenerationError::invalid(format!(
            "at least 4 players are needed, got {}",
            roster.len()
        )));
    }
    if courts < 1 {
        return Err(GenerationError::invalid("at least one court is needed"));
    }
    if let Some(player) = first_duplicate(roster) {
        return Err(GenerationError::invalid(format!("{player} is listed twice")));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Team attempts allowed per unique partition sought.
    pub team_attempts_per_target: usize,
    /// Match-up attempts over the chosen teams.
    pub match_attempts: usize,
    /// Front bias of the sit-out draw.
    pub sit_out_base_chance: f64,
    pub matcher: MatcherConfig,
    pub weights: ScoringWeights,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            team_attempts_per_target: 4,
            match_attempts: 4,
            sit_out_base_chance: DEFAULT_BASE_CHANCE,
            matcher: MatcherConfig::default(),
            weights: ScoringWeights::default(),
        }
    }
}

/// Heuristics and match counts describing the history up to some point.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub heuristics: HeuristicsMap,
    pub match_counts: MatchCounts,
}

impl Snapshot {
    pub fn from_history(rounds: &[Round], roster: &[PlayerId]) -> Self {
        let (match_counts, _) = count_matches(rounds, None);
        Self {
            heuristics: compute_heuristics(rounds, roster, None),
            match_counts,
        }
    }

    /// State after `round` is played, plus how many of its matches repeat an
    /// earlier match-up.
    pub fn advance(&self, round: &Round, roster: &[PlayerId]) -> (Snapshot, u32) {
        let played = std::slice::from_ref(round);
        let (match_counts, duplicates) = count_matches(played, Some(&self.match_counts));
        let heuristics = compute_heuristics(played, roster, Some(&self.heuristics));
        (
            Snapshot {
                heuristics,
                match_counts,
            },
            duplicates,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Players partnered with their most frequent partner.
    pub team_score: u32,
    /// Opponent staleness of the chosen match-ups, lower is better.
    pub match_score: f64,
    /// Matches that repeat an earlier match-up.
    pub new_duplicates: u32,
    pub unique_partitions: usize,
    pub team_attempts: usize,
}

#[derive(Debug, Clone)]
pub struct GeneratedRound {
    pub round: Round,
    pub diagnostics: Diagnostics,
    /// History state with `round` applied.
    pub snapshot: Snapshot,
}

/// Generates one round from the full history.
///
/// Supplied `heuristics` are used when they cover the whole roster; otherwise
/// they are recomputed from `request.rounds`.
pub fn generate_round<R: Rng + ?Sized>(
    request: RoundRequest<'_>,
    heuristics: Option<&HeuristicsMap>,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<GeneratedRound, GenerationError> {
    request.validate()?;

    let covered = heuristics
        .filter(|supplied| request.roster.iter().all(|player| supplied.contains_key(player)));
    if heuristics.is_some() && covered.is_none() {
        tracing::warn!(
            target: "courtmix_core::generator",
            roster = request.roster.len(),
            "supplied heuristics miss roster members; recomputing"
        );
    }

    let snapshot = match covered {
        Some(supplied) => Snapshot {
            heuristics: supplied.clone(),
            match_counts: count_matches(request.rounds, None).0,
        },
        None => Snapshot::from_history(request.rounds, request.roster),
    };

    generate_round_from(request, &snapshot, config, rng, &Checkpoint::none())
}

/// Generates one round on top of `snapshot`. `request.rounds` is not read.
pub fn generate_round_from<R: Rng + ?Sized>(
    request: RoundRequest<'_>,
    snapshot: &Snapshot,
    config: &GeneratorConfig,
    rng: &mut R,
    checkpoint: &Checkpoint,
) -> Result<GeneratedRound, GenerationError> {
    request.validate()?;
    let roster = request.roster;
    let heuristics = &snapshot.heuristics;

    let target = (roster.len() / 4) * 2;
    let budget = config.team_attempts_per_target.max(1) * target.max(1);
    let mut seen: HashSet<Vec<Team>> = HashSet::new();
    let mut best_teams: Option<(u32, Vec<Team>, Vec<PlayerId>)> = None;
    let mut team_attempts = 0;

    while seen.len() < target && team_attempts < budget {
        team_attempts += 1;
        checkpoint.check()?;

        let selection = select_sit_outs(
            heuristics,
            roster,
            request.courts,
            request.volunteers,
            config.sit_out_base_chance,
            rng,
        );
        if selection.remaining.len() < 4 {
            return Err(GenerationError::exhausted(GenerationPhase::SitOuts));
        }

        let preferences = partner_preferences(&selection.remaining, heuristics, &config.weights);
        let Some(pairing) = solve(&preferences, config.matcher, rng) else {
            continue;
        };
        let mut teams: Vec<Team> = pairing
            .pairs
            .iter()
            .map(|[a, b]| Team::new(selection.remaining[*a].clone(), selection.remaining[*b].clone()))
            .collect();
        teams.sort();

        if !seen.insert(teams.clone()) {
            continue;
        }

        let score = forced_repeat_partners(&teams, heuristics);
        if best_teams.as_ref().is_none_or(|(best, _, _)| score < *best) {
            best_teams = Some((score, teams, selection.sit_outs));
        }
    }

    let (team_score, teams, sit_outs) =
        best_teams.ok_or(GenerationError::exhausted(GenerationPhase::Teams))?;

    let preferences = team_preferences(&teams, heuristics, &snapshot.match_counts, &config.weights);
    let mut best_matches: Option<(f64, u32, Round, Snapshot)> = None;

    for _ in 0..config.match_attempts.max(1) {
        checkpoint.check()?;

        let Some(pairing) = solve(&preferences, config.matcher, rng) else {
            continue;
        };
        let mut matches: Vec<Match> = pairing
            .pairs
            .iter()
            .map(|[a, b]| Match::new(teams[*a].clone(), teams[*b].clone()))
            .collect();
        matches.sort();

        let round = Round::new(matches, sit_outs.clone());
        let (advanced, duplicates) = snapshot.advance(&round, roster);
        let staleness = mean_opponent_staleness(&advanced.heuristics, roster);
        let score = f64::from(duplicates + 1).powf(config.weights.duplicate_round_exponent) * staleness;

        if best_matches.as_ref().is_none_or(|(best, ..)| score < *best) {
            best_matches = Some((score, duplicates, round, advanced));
        }
    }

    let (match_score, new_duplicates, round, snapshot) =
        best_matches.ok_or(GenerationError::exhausted(GenerationPhase::Matches))?;

    Ok(GeneratedRound {
        round,
        diagnostics: Diagnostics {
            team_score,
            match_score,
            new_duplicates,
            unique_partitions: seen.len(),
            team_attempts,
        },
        snapshot,
    })
}

fn solve<R: Rng + ?Sized>(
    preferences: &PreferenceMatrix,
    config: MatcherConfig,
    rng: &mut R,
) -> Option<Pairing> {
    match PairMatcher::new(preferences, config).solve(rng) {
        Ok(pairing) => Some(pairing),
        Err(err) => {
            event!(
                target: "courtmix_core::generator",
                Level::DEBUG,
                members = preferences.len(),
                error = %err,
                "matcher attempt discarded"
            );
            None
        }
    }
}

/// Players paired with someone they have already partnered more than anyone
/// else, unless every partner is tied.
fn forced_repeat_partners(teams: &[Team], heuristics: &HeuristicsMap) -> u32 {
    let at_max = |player: &PlayerId, partner: &PlayerId| {
        heuristics.get(player).is_some_and(|stats| {
            let records = &stats.played_with_count;
            let count = records.get(partner);
            count == records.max && count != records.min
        })
    };
    teams
        .iter()
        .map(|team| {
            let [a, b] = team.players();
            u32::from(at_max(a, b)) + u32::from(at_max(b, a))
        })
        .sum()
}

/// Mean over the roster of the root of summed squared rounds since each
/// player last faced every other player.
fn mean_opponent_staleness(heuristics: &HeuristicsMap, roster: &[PlayerId]) -> f64 {
    if roster.is_empty() {
        return 0.0;
    }
    let total: f64 = roster
        .iter()
        .filter_map(|player| heuristics.get(player).map(|stats| (player, stats)))
        .map(|(player, stats)| {
            roster
                .iter()
                .filter(|other| *other != player)
                .map(|other| f64::from(stats.rounds_since_played_against.get(other)).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .sum();
    total / roster.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::player::roster;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn id(value: &str) -> PlayerId {
        PlayerId::from(value)
    }

    #[test]
    fn rejects_invalid_requests() {
        let config = GeneratorConfig::default();
        let mut rng = SmallRng::seed_from_u64(0);

        let small = roster(["a", "b", "c"]);
        let err = generate_round(RoundRequest::new(&[], &small, 1), None, &config, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRoster { .. }));

        let players = roster(["a", "b", "c", "d"]);
        let err = generate_round(RoundRequest::new(&[], &players, 0), None, &config, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRoster { .. }));

        let doubled = roster(["a", "b", "c", "a"]);
        let err = generate_round(RoundRequest::new(&[], &doubled, 1), None, &config, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRoster { .. }));
    }

    #[test]
    fn volunteers_leaving_too_few_players_exhaust() {
        let players = roster(["a", "b", "c", "d", "e"]);
        let volunteers = vec![id("a"), id("b")];
        let mut rng = SmallRng::seed_from_u64(0);
        let err = generate_round(
            RoundRequest::new(&[], &players, 1).with_volunteers(&volunteers),
            None,
            &GeneratorConfig::default(),
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(err, GenerationError::exhausted(GenerationPhase::SitOuts));
    }

    #[test]
    fn generated_round_partitions_roster() {
        let players = roster(["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let config = GeneratorConfig::default();
        for seed in 0..8 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generated =
                generate_round(RoundRequest::new(&[], &players, 2), None, &config, &mut rng).unwrap();
            assert_eq!(generated.round.validate_against(&players, 2), Ok(()));
            assert_eq!(generated.round.matches.len(), 2);
            assert_eq!(generated.round.sit_outs.len(), 2);
            assert!(generated.diagnostics.unique_partitions >= 1);
            assert!(generated.diagnostics.team_attempts <= config.team_attempts_per_target * 4);
        }
    }

    #[test]
    fn avoids_the_only_repeat_partnership() {
        let players = roster(["a", "b", "c", "d"]);
        let history = vec![Round::new(
            vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))],
            vec![],
        )];
        let config = GeneratorConfig::default();
        for seed in 0..8 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generated =
                generate_round(RoundRequest::new(&history, &players, 1), None, &config, &mut rng).unwrap();
            assert_eq!(generated.diagnostics.team_score, 0);
            for team in generated.round.matches[0].teams() {
                assert_ne!(team, &Team::new("a", "b"));
                assert_ne!(team, &Team::new("c", "d"));
            }
        }
    }

    #[test]
    fn snapshot_advance_matches_full_recompute() {
        let players = roster(["a", "b", "c", "d", "e"]);
        let first = Round::new(vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))], vec![id("e")]);
        let second = Round::new(vec![Match::new(Team::new("a", "b"), Team::new("c", "e"))], vec![id("d")]);

        let start = Snapshot::from_history(std::slice::from_ref(&first), &players);
        let (advanced, duplicates) = start.advance(&second, &players);
        let full = Snapshot::from_history(&[first, second], &players);
        assert_eq!(advanced, full);
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn incomplete_heuristics_are_recomputed() {
        let players = roster(["a", "b", "c", "d"]);
        let partial = compute_heuristics(&[], &roster(["a", "b"]), None);
        let mut rng = SmallRng::seed_from_u64(3);
        let generated = generate_round(
            RoundRequest::new(&[], &players, 1),
            Some(&partial),
            &GeneratorConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(generated.round.validate_against(&players, 1), Ok(()));
    }

    #[test]
    fn cancelled_checkpoint_stops_generation() {
        let players = roster(["a", "b", "c", "d"]);
        let token = super::super::checkpoint::CancelToken::new();
        token.cancel();
        let mut rng = SmallRng::seed_from_u64(3);
        let err = generate_round_from(
            RoundRequest::new(&[], &players, 1),
            &Snapshot::from_history(&[], &players),
            &GeneratorConfig::default(),
            &mut rng,
            &Checkpoint::with_token(token),
        )
        .unwrap_err();
        assert_eq!(err, GenerationError::Cancelled);
    }
}
