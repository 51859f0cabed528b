use super::player::PlayerId;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Two partners playing on the same side of a court.
///
/// Players are stored in ascending order, so two teams with the same members
/// compare (and hash) equal regardless of the order they were given in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "[PlayerId; 2]", into = "[PlayerId; 2]")]
pub struct Team {
    players: [PlayerId; 2],
}

/// Both members of a team named the same player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamePlayerTwice(pub PlayerId);

impl fmt::Display for SamePlayerTwice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {} cannot partner themselves", self.0)
    }
}

impl std::error::Error for SamePlayerTwice {}

impl Team {
    /// Builds a team from two distinct players. Use [`Team::try_from`] for
    /// input that may name the same player twice.
    pub fn new(a: impl Into<PlayerId>, b: impl Into<PlayerId>) -> Self {
        let (a, b) = (a.into(), b.into());
        debug_assert_ne!(a, b, "a team needs two distinct players");
        if a <= b {
            Self { players: [a, b] }
        } else {
            Self { players: [b, a] }
        }
    }

    pub fn players(&self) -> &[PlayerId; 2] {
        &self.players
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }
}

impl TryFrom<[PlayerId; 2]> for Team {
    type Error = SamePlayerTwice;

    fn try_from([a, b]: [PlayerId; 2]) -> Result<Self, Self::Error> {
        if a == b {
            return Err(SamePlayerTwice(a));
        }
        Ok(Team::new(a, b))
    }
}

impl From<Team> for [PlayerId; 2] {
    fn from(team: Team) -> Self {
        team.players
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.players[0], self.players[1])
    }
}

/// Two teams facing each other on one court.
///
/// Stored canonically (teams in ascending order), which makes a `Match` its
/// own identifier when counting repeated match-ups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[Team; 2]", into = "[Team; 2]")]
pub struct Match {
    teams: [Team; 2],
}

impl Match {
    pub fn new(a: Team, b: Team) -> Self {
        if a <= b {
            Self { teams: [a, b] }
        } else {
            Self { teams: [b, a] }
        }
    }

    pub fn teams(&self) -> &[Team; 2] {
        &self.teams
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.teams.iter().flat_map(|team| team.players().iter())
    }

    /// Every (player, opponent) pair across the net, one direction only.
    pub fn cross_pairs(&self) -> impl Iterator<Item = (&PlayerId, &PlayerId)> {
        let [left, right] = &self.teams;
        left.players()
            .iter()
            .flat_map(move |a| right.players().iter().map(move |b| (a, b)))
    }
}

impl From<[Team; 2]> for Match {
    fn from([a, b]: [Team; 2]) -> Self {
        Match::new(a, b)
    }
}

impl From<Match> for [Team; 2] {
    fn from(value: Match) -> Self {
        value.teams
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.teams[0], self.teams[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_order_is_canonical() {
        assert_eq!(Team::new("b", "a"), Team::new("a", "b"));
        assert_eq!(Team::new("b", "a").players()[0], PlayerId::from("a"));
    }

    #[test]
    fn match_order_is_canonical() {
        let forward = Match::new(Team::new("a", "b"), Team::new("c", "d"));
        let reverse = Match::new(Team::new("d", "c"), Team::new("b", "a"));
        assert_eq!(forward, reverse);
        assert_eq!(forward.to_string(), "a b vs c d");
    }

    #[test]
    fn match_deserializes_from_nested_arrays() {
        let parsed: Match = serde_json::from_str(r#"[["f","d"],["a","e"]]"#).unwrap();
        assert_eq!(parsed, Match::new(Team::new("a", "e"), Team::new("d", "f")));
        assert_eq!(parsed.cross_pairs().count(), 4);
    }

    #[test]
    fn team_needs_two_distinct_players() {
        assert_eq!(
            Team::try_from([PlayerId::from("a"), PlayerId::from("a")]),
            Err(SamePlayerTwice(PlayerId::from("a")))
        );
        assert_eq!(
            Team::try_from([PlayerId::from("y"), PlayerId::from("x")]),
            Ok(Team::new("x", "y"))
        );

        let err = serde_json::from_str::<Match>(r#"[["a","a"],["b","c"]]"#).unwrap_err();
        assert!(err.to_string().contains("cannot partner themselves"));
    }
}
