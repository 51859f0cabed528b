use crate::model::round::Round;
use crate::model::team::Match;
use std::collections::BTreeMap;

/// How often each canonical match-up has been played.
pub type MatchCounts = BTreeMap<Match, u32>;

/// Tallies every match in `rounds` on top of `previous`.
///
/// Returns the counts together with the number of matches in `rounds` whose
/// match-up had already been played (in `previous` or an earlier round).
pub fn count_matches(rounds: &[Round], previous: Option<&MatchCounts>) -> (MatchCounts, u32) {
    let mut counts = previous.cloned().unwrap_or_default();
    let mut duplicates = 0;
    for game in rounds.iter().flat_map(|round| round.matches.iter()) {
        let seen = counts.entry(game.clone()).or_insert(0);
        if *seen > 0 {
            duplicates += 1;
        }
        *seen += 1;
    }
    (counts, duplicates)
}

/// Times `game` has been played according to `counts`.
pub fn times_played(counts: &MatchCounts, game: &Match) -> u32 {
    counts.get(game).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::team::Team;

    fn game(a: &str, b: &str, c: &str, d: &str) -> Match {
        Match::new(Team::new(a, b), Team::new(c, d))
    }

    #[test]
    fn mirrored_matches_share_a_count() {
        let rounds = vec![
            Round::new(vec![game("a", "b", "c", "d")], vec![]),
            Round::new(vec![game("d", "c", "b", "a")], vec![]),
            Round::new(vec![game("a", "c", "b", "d")], vec![]),
            Round::new(vec![game("b", "a", "c", "d")], vec![]),
        ];
        let (counts, duplicates) = count_matches(&rounds, None);
        assert_eq!(counts[&game("a", "b", "c", "d")], 3);
        assert_eq!(counts.len(), 2);
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn previous_counts_are_extended() {
        let first = vec![Round::new(vec![game("a", "b", "c", "d")], vec![])];
        let (previous, none) = count_matches(&first, None);
        assert_eq!(none, 0);
        let (counts, duplicates) = count_matches(&first, Some(&previous));
        assert_eq!(times_played(&counts, &game("a", "b", "c", "d")), 2);
        assert_eq!(duplicates, 1);
        assert_eq!(times_played(&previous, &game("a", "b", "c", "d")), 1);
        assert_eq!(times_played(&previous, &game("a", "c", "b", "d")), 0);
    }
}
