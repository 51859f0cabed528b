use super::player::PlayerId;
use super::team::Match;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One generated assignment of matches and sit-outs for the active roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub matches: Vec<Match>,
    pub sit_outs: Vec<PlayerId>,
}

impl Round {
    pub fn new(matches: Vec<Match>, sit_outs: Vec<PlayerId>) -> Self {
        Self { matches, sit_outs }
    }

    /// Players assigned to a court this round.
    pub fn playing(&self) -> impl Iterator<Item = &PlayerId> {
        self.matches.iter().flat_map(Match::players)
    }

    /// Everyone the round accounts for, playing first, then sitting out.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.playing().chain(self.sit_outs.iter())
    }

    pub fn is_sitting_out(&self, player: &PlayerId) -> bool {
        self.sit_outs.contains(player)
    }

    /// Checks that the round partitions `roster` exactly and fits on `courts`.
    pub fn validate_against(&self, roster: &[PlayerId], courts: usize) -> Result<(), RoundViolation> {
        if self.matches.len() > courts {
            return Err(RoundViolation::TooManyMatches {
                matches: self.matches.len(),
                courts,
            });
        }

        let active: HashSet<&PlayerId> = roster.iter().collect();
        let mut seen = HashSet::with_capacity(roster.len());
        for player in self.players() {
            if !active.contains(player) {
                return Err(RoundViolation::UnknownPlayer(player.clone()));
            }
            if !seen.insert(player) {
                return Err(RoundViolation::DuplicatePlayer(player.clone()));
            }
        }

        if let Some(missing) = roster.iter().find(|player| !seen.contains(player)) {
            return Err(RoundViolation::MissingPlayer(missing.clone()));
        }

        Ok(())
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let courts = self
            .matches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        let sitting = self
            .sit_outs
            .iter()
            .map(PlayerId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{courts} ({sitting})")
    }
}

/// The first inconsistency found between a round and its roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundViolation {
    TooManyMatches { matches: usize, courts: usize },
    UnknownPlayer(PlayerId),
    DuplicatePlayer(PlayerId),
    MissingPlayer(PlayerId),
}

impl fmt::Display for RoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundViolation::TooManyMatches { matches, courts } => {
                write!(f, "{matches} matches scheduled on {courts} courts")
            }
            RoundViolation::UnknownPlayer(player) => write!(f, "{player} is not on the roster"),
            RoundViolation::DuplicatePlayer(player) => {
                write!(f, "{player} is assigned more than once")
            }
            RoundViolation::MissingPlayer(player) => write!(f, "{player} is not assigned"),
        }
    }
}

impl std::error::Error for RoundViolation {}

/// How many players must sit out when `players` are available for `courts`.
pub fn required_sit_outs(players: usize, courts: usize) -> usize {
    let capacity = courts * 4;
    if players > capacity {
        players - capacity
    } else {
        players % 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::player::roster;
    use crate::model::team::Team;

    fn sample() -> Round {
        Round::new(
            vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))],
            vec!["e".into(), "f".into()],
        )
    }

    #[test]
    fn json_uses_camel_case_sit_outs() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"matches":[[["a","b"],["c","d"]]],"sitOuts":["e","f"]}"#);
    }

    #[test]
    fn validates_exact_partition() {
        let players = roster(["a", "b", "c", "d", "e", "f"]);
        assert!(sample().validate_against(&players, 1).is_ok());

        let missing = roster(["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(
            sample().validate_against(&missing, 1),
            Err(RoundViolation::MissingPlayer("g".into()))
        );

        let mut doubled = sample();
        doubled.sit_outs.push("a".into());
        assert_eq!(
            doubled.validate_against(&players, 1),
            Err(RoundViolation::DuplicatePlayer("a".into()))
        );
        assert!(matches!(
            sample().validate_against(&players, 0),
            Err(RoundViolation::TooManyMatches { .. })
        ));
    }

    #[test]
    fn sit_out_count_follows_capacity_then_modulus() {
        assert_eq!(required_sit_outs(9, 3), 1);
        assert_eq!(required_sit_outs(6, 1), 2);
        assert_eq!(required_sit_outs(14, 3), 2);
        assert_eq!(required_sit_outs(13, 2), 5);
        assert_eq!(required_sit_outs(8, 2), 0);
    }
}
