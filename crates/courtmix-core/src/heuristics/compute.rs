use super::records::{INFINITY, PlayerRecords, RecordKind, age_distance};
use crate::model::player::PlayerId;
use crate::model::round::Round;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Interaction statistics of one player, derived from round history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHeuristics {
    pub played_with_count: PlayerRecords,
    pub rounds_since_played_with: PlayerRecords,
    pub played_against_count: PlayerRecords,
    pub rounds_since_played_against: PlayerRecords,
    pub rounds_since_sit_out: u32,
    pub sit_out_count: u32,
}

/// Heuristics for every player on the roster.
pub type HeuristicsMap = BTreeMap<PlayerId, PlayerHeuristics>;

impl PlayerHeuristics {
    /// Statistics of a player with no history.
    pub fn fresh(roster: &[PlayerId], owner: &PlayerId) -> Self {
        Self {
            played_with_count: PlayerRecords::fresh(RecordKind::Count, roster, owner),
            rounds_since_played_with: PlayerRecords::fresh(RecordKind::Distance, roster, owner),
            played_against_count: PlayerRecords::fresh(RecordKind::Count, roster, owner),
            rounds_since_played_against: PlayerRecords::fresh(RecordKind::Distance, roster, owner),
            rounds_since_sit_out: INFINITY,
            sit_out_count: 0,
        }
    }

    /// Carries a previous snapshot onto `roster`, `elapsed` rounds later.
    fn carried(previous: &Self, roster: &[PlayerId], owner: &PlayerId, elapsed: u32) -> Self {
        let mut next = Self::fresh(roster, owner);
        for (target, source) in [
            (&mut next.played_with_count, &previous.played_with_count),
            (&mut next.rounds_since_played_with, &previous.rounds_since_played_with),
            (&mut next.played_against_count, &previous.played_against_count),
            (&mut next.rounds_since_played_against, &previous.rounds_since_played_against),
        ] {
            for player in roster.iter().filter(|player| *player != owner) {
                if source.contains(player) {
                    target.set(player, source.get(player));
                }
            }
            target.age(elapsed);
        }
        next.rounds_since_sit_out = age_distance(previous.rounds_since_sit_out, elapsed);
        next.sit_out_count = previous.sit_out_count;
        next
    }

    fn refresh_bounds(&mut self, roster: &[PlayerId], owner: &PlayerId) {
        self.played_with_count.refresh_bounds(roster, owner);
        self.rounds_since_played_with.refresh_bounds(roster, owner);
        self.played_against_count.refresh_bounds(roster, owner);
        self.rounds_since_played_against.refresh_bounds(roster, owner);
    }
}

/// Derives who has played with and against whom, and how long since everyone
/// last sat out.
///
/// Rounds are ordered oldest first. When `previous` is supplied it describes
/// the state just before `rounds[0]`; its values are carried forward and its
/// distances aged by `rounds.len()`.
pub fn compute_heuristics(
    rounds: &[Round],
    roster: &[PlayerId],
    previous: Option<&HeuristicsMap>,
) -> HeuristicsMap {
    let elapsed = u32::try_from(rounds.len()).unwrap_or(INFINITY);
    let mut heuristics: HeuristicsMap = roster
        .iter()
        .map(|player| {
            let entry = match previous.and_then(|snapshot| snapshot.get(player)) {
                Some(prior) => PlayerHeuristics::carried(prior, roster, player, elapsed),
                None => PlayerHeuristics::fresh(roster, player),
            };
            (player.clone(), entry)
        })
        .collect();

    for (index, round) in rounds.iter().rev().enumerate() {
        let rounds_ago = u32::try_from(index + 1).unwrap_or(INFINITY);

        for player in &round.sit_outs {
            if let Some(entry) = heuristics.get_mut(player) {
                entry.rounds_since_sit_out = entry.rounds_since_sit_out.min(rounds_ago);
                entry.sit_out_count += 1;
            }
        }

        for game in &round.matches {
            for team in game.teams() {
                let [a, b] = team.players();
                record_partners(&mut heuristics, a, b, rounds_ago);
                record_partners(&mut heuristics, b, a, rounds_ago);
            }
            for (a, b) in game.cross_pairs() {
                record_opponents(&mut heuristics, a, b, rounds_ago);
                record_opponents(&mut heuristics, b, a, rounds_ago);
            }
        }
    }

    apply_late_arrivals(&mut heuristics, rounds, roster, previous);

    for player in roster {
        if let Some(entry) = heuristics.get_mut(player) {
            entry.refresh_bounds(roster, player);
        }
    }

    heuristics
}

fn record_partners(heuristics: &mut HeuristicsMap, player: &PlayerId, partner: &PlayerId, ago: u32) {
    if let Some(entry) = heuristics.get_mut(player) {
        entry.played_with_count.increment(partner);
        entry.rounds_since_played_with.lower_to(partner, ago);
    }
}

fn record_opponents(heuristics: &mut HeuristicsMap, player: &PlayerId, opponent: &PlayerId, ago: u32) {
    if let Some(entry) = heuristics.get_mut(player) {
        entry.played_against_count.increment(opponent);
        entry.rounds_since_played_against.lower_to(opponent, ago);
    }
}

/// A player who first shows up after the opening round is treated as having
/// already sat out once more than the least-rested player seen so far, so the
/// selector does not bench them straight away.
///
/// Players in `previous` start from their carried count. Anyone missing from
/// it arrived after that history, so they count as late even in `rounds[0]`.
fn apply_late_arrivals(
    heuristics: &mut HeuristicsMap,
    rounds: &[Round],
    roster: &[PlayerId],
    previous: Option<&HeuristicsMap>,
) {
    let mut counts: HashMap<&PlayerId, u32> = HashMap::new();
    let mut late: Vec<&PlayerId> = Vec::new();
    let mut first_round = 0;

    if let Some(snapshot) = previous.filter(|snapshot| !snapshot.is_empty()) {
        counts.extend(snapshot.iter().map(|(player, entry)| (player, entry.sit_out_count)));
        first_round = 1;
    }

    for (index, round) in rounds.iter().enumerate() {
        let position = index + first_round;
        for player in &round.sit_outs {
            observe(&mut counts, &mut late, player, position);
            if let Some(count) = counts.get_mut(player) {
                *count += 1;
            }
        }
        for player in round.playing() {
            observe(&mut counts, &mut late, player, position);
        }
    }
    for player in roster {
        observe(&mut counts, &mut late, player, rounds.len() + first_round);
    }

    for player in late {
        if let (Some(entry), Some(count)) = (heuristics.get_mut(player), counts.get(player)) {
            entry.sit_out_count = *count;
        }
    }
}

fn observe<'a>(
    counts: &mut HashMap<&'a PlayerId, u32>,
    late: &mut Vec<&'a PlayerId>,
    player: &'a PlayerId,
    position: usize,
) {
    if counts.contains_key(player) {
        return;
    }
    let seeded = if position == 0 {
        0
    } else {
        late.push(player);
        counts.values().min().copied().unwrap_or(0) + 1
    };
    counts.insert(player, seeded);
}
