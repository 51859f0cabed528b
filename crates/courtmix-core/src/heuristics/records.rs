use crate::model::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stand-in for "never observed". Large but finite so scores stay comparable.
pub const INFINITY: u32 = 9999;

/// Whether a statistic counts occurrences or measures rounds elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Count,
    Distance,
}

impl RecordKind {
    pub const fn default_value(self) -> u32 {
        match self {
            RecordKind::Count => 0,
            RecordKind::Distance => INFINITY,
        }
    }
}

/// One statistic of one player against every other roster member.
///
/// `min` and `max` aggregate over the other current roster members only and
/// are refreshed by [`PlayerRecords::refresh_bounds`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecords {
    kind: RecordKind,
    values: BTreeMap<PlayerId, u32>,
    pub min: u32,
    pub max: u32,
}

impl PlayerRecords {
    /// Default record of `owner` against everyone else in `roster`.
    pub fn fresh(kind: RecordKind, roster: &[PlayerId], owner: &PlayerId) -> Self {
        let default = kind.default_value();
        let values = roster
            .iter()
            .filter(|player| *player != owner)
            .map(|player| (player.clone(), default))
            .collect();
        Self {
            kind,
            values,
            min: default,
            max: default,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Value against `other`, or the kind's default when never recorded.
    pub fn get(&self, other: &PlayerId) -> u32 {
        self.values
            .get(other)
            .copied()
            .unwrap_or(self.kind.default_value())
    }

    pub fn contains(&self, other: &PlayerId) -> bool {
        self.values.contains_key(other)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, u32)> {
        self.values.iter().map(|(player, value)| (player, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, other: &PlayerId, value: u32) {
        if let Some(slot) = self.values.get_mut(other) {
            *slot = value;
        }
    }

    pub(crate) fn increment(&mut self, other: &PlayerId) {
        if let Some(slot) = self.values.get_mut(other) {
            *slot = slot.saturating_add(1);
        }
    }

    /// Keeps the smaller of the stored and offered distance.
    pub(crate) fn lower_to(&mut self, other: &PlayerId, value: u32) {
        if let Some(slot) = self.values.get_mut(other) {
            if value < *slot {
                *slot = value;
            }
        }
    }

    /// Shifts every distance `rounds` further into the past.
    pub(crate) fn age(&mut self, rounds: u32) {
        if self.kind != RecordKind::Distance || rounds == 0 {
            return;
        }
        for value in self.values.values_mut() {
            *value = age_distance(*value, rounds);
        }
    }

    /// Recomputes `min`/`max` across the other members of `roster`.
    pub(crate) fn refresh_bounds(&mut self, roster: &[PlayerId], owner: &PlayerId) {
        let mut min = INFINITY;
        let mut max = 0;
        for player in roster.iter().filter(|player| *player != owner) {
            let value = self.get(player);
            min = min.min(value);
            max = max.max(value);
        }
        self.min = min;
        self.max = max;
    }
}

/// Distances never age past the sentinel.
pub(crate) fn age_distance(value: u32, rounds: u32) -> u32 {
    if value >= INFINITY {
        INFINITY
    } else {
        value.saturating_add(rounds).min(INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::player::roster;

    #[test]
    fn fresh_records_exclude_owner() {
        let players = roster(["a", "b", "c"]);
        let records = PlayerRecords::fresh(RecordKind::Distance, &players, &"a".into());
        assert_eq!(records.len(), 2);
        assert!(!records.contains(&"a".into()));
        assert_eq!(records.get(&"b".into()), INFINITY);
    }

    #[test]
    fn lower_to_ignores_worse_values() {
        let players = roster(["a", "b"]);
        let mut records = PlayerRecords::fresh(RecordKind::Distance, &players, &"a".into());
        records.lower_to(&"b".into(), 2);
        records.lower_to(&"b".into(), 5);
        assert_eq!(records.get(&"b".into()), 2);
    }

    #[test]
    fn aging_saturates_at_sentinel() {
        assert_eq!(age_distance(3, 2), 5);
        assert_eq!(age_distance(INFINITY, 2), INFINITY);
        assert_eq!(age_distance(INFINITY - 1, 5), INFINITY);
    }

    #[test]
    fn bounds_cover_other_players_only() {
        let players = roster(["a", "b", "c"]);
        let mut records = PlayerRecords::fresh(RecordKind::Count, &players, &"a".into());
        records.increment(&"b".into());
        records.increment(&"b".into());
        records.refresh_bounds(&players, &"a".into());
        assert_eq!((records.min, records.max), (0, 2));
    }
}
