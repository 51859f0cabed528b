use super::Session;
use crate::model::player::PlayerId;
use crate::model::round::Round;
use crate::pairing::GenerationError;
use serde::{Deserialize, Serialize};

/// Serializable state of a [`Session`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub roster: Vec<PlayerId>,
    pub courts: usize,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

impl SessionSnapshot {
    pub fn capture(session: &Session) -> Self {
        SessionSnapshot {
            roster: session.roster().to_vec(),
            courts: session.courts(),
            rounds: session.rounds().to_vec(),
        }
    }

    pub fn restore(self) -> Result<Session, GenerationError> {
        Session::with_rounds(self.roster, self.courts, self.rounds)
    }

    pub fn to_json(session: &Session) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(session))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionSnapshot;
    use crate::model::player::roster;
    use crate::model::round::Round;
    use crate::model::team::{Match, Team};
    use crate::session::Session;

    fn session() -> Session {
        Session::with_rounds(
            roster(["a", "b", "c", "d", "e"]),
            1,
            vec![Round::new(
                vec![Match::new(Team::new("a", "b"), Team::new("c", "d"))],
                vec!["e".into()],
            )],
        )
        .unwrap()
    }

    #[test]
    fn snapshot_serializes_round_layout() {
        let json = SessionSnapshot::to_json(&session()).unwrap();
        assert!(json.contains("\"courts\": 1"));
        assert!(json.contains("\"sitOuts\""));
    }

    #[test]
    fn snapshot_restores_session() {
        let original = session();
        let json = SessionSnapshot::to_json(&original).unwrap();
        let restored = SessionSnapshot::from_json(&json).unwrap().restore().unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn missing_rounds_default_to_empty() {
        let snapshot = SessionSnapshot::from_json(r#"{"roster":["a","b","c","d"],"courts":1}"#).unwrap();
        assert!(snapshot.rounds.is_empty());
        assert!(snapshot.restore().unwrap().is_empty());
    }

    #[test]
    fn invalid_snapshot_is_rejected_on_restore() {
        let snapshot = SessionSnapshot::from_json(r#"{"roster":["a","a","c","d"],"courts":1}"#).unwrap();
        assert!(snapshot.restore().is_err());
    }
}
