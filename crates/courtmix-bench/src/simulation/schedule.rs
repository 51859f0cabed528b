use std::collections::BTreeMap;

use courtmix_core::model::player::PlayerId;

use crate::config::{RosterEvent, SessionConfig};

/// Roster changes keyed by the round they take effect in.
#[derive(Debug, Clone, Default)]
pub struct RosterSchedule {
    arrivals: BTreeMap<usize, Vec<PlayerId>>,
    departures: BTreeMap<usize, Vec<PlayerId>>,
    volunteers: BTreeMap<usize, Vec<PlayerId>>,
}

/// What changed at the start of a round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChange {
    pub arrived: Vec<PlayerId>,
    pub departed: Vec<PlayerId>,
}

impl RosterChange {
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty() && self.departed.is_empty()
    }
}

impl RosterSchedule {
    pub fn from_config(session: &SessionConfig) -> Self {
        Self {
            arrivals: index_events(&session.arrivals),
            departures: index_events(&session.departures),
            volunteers: index_events(&session.volunteers),
        }
    }

    /// Applies the arrivals and departures of `round` to `roster` in place.
    /// Departures of players not on the roster are ignored.
    pub fn apply(&self, round: usize, roster: &mut Vec<PlayerId>) -> RosterChange {
        let mut change = RosterChange::default();

        if let Some(leaving) = self.departures.get(&round) {
            roster.retain(|player| {
                let stays = !leaving.contains(player);
                if !stays {
                    change.departed.push(player.clone());
                }
                stays
            });
        }

        if let Some(joining) = self.arrivals.get(&round) {
            for player in joining {
                if !roster.contains(player) {
                    roster.push(player.clone());
                    change.arrived.push(player.clone());
                }
            }
        }

        change
    }

    /// Volunteers for `round` who are on `roster`.
    pub fn volunteers(&self, round: usize, roster: &[PlayerId]) -> Vec<PlayerId> {
        self.volunteers
            .get(&round)
            .map(|players| {
                players
                    .iter()
                    .filter(|player| roster.contains(player))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn index_events(events: &[RosterEvent]) -> BTreeMap<usize, Vec<PlayerId>> {
    let mut indexed: BTreeMap<usize, Vec<PlayerId>> = BTreeMap::new();
    for event in events {
        indexed
            .entry(event.round)
            .or_default()
            .extend(event.players.iter().map(|name| PlayerId::from(name.as_str())));
    }
    indexed
}
