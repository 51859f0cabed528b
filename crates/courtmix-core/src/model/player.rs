use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Opaque, stable identifier for a player on the roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Builds a roster from anything string-like.
pub fn roster<I, S>(ids: I) -> Vec<PlayerId>
where
    I: IntoIterator<Item = S>,
    S: Into<PlayerId>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Returns the first id that occurs more than once.
pub fn first_duplicate(players: &[PlayerId]) -> Option<&PlayerId> {
    let mut seen = HashSet::with_capacity(players.len());
    players.iter().find(|player| !seen.insert(*player))
}
