//! Round history of one play session.
//!
//! History only grows at the end. Editing an earlier round means truncating
//! everything after it and planning again from there.

pub mod snapshot;

pub use snapshot::SessionSnapshot;

use crate::heuristics::{HeuristicsMap, compute_heuristics};
use crate::model::player::PlayerId;
use crate::model::round::{Round, RoundViolation};
use crate::pairing::{
    Checkpoint, GenerationError, PlannerConfig, RoundRequest, plan_next_round_with, validate_roster,
};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    roster: Vec<PlayerId>,
    courts: usize,
    rounds: Vec<Round>,
}

impl Session {
    pub fn new(roster: Vec<PlayerId>, courts: usize) -> Result<Self, GenerationError> {
        Self::with_rounds(roster, courts, Vec::new())
    }

    /// Resumes a session from existing history.
    pub fn with_rounds(
        roster: Vec<PlayerId>,
        courts: usize,
        rounds: Vec<Round>,
    ) -> Result<Self, GenerationError> {
        validate_roster(&roster, courts)?;
        Ok(Self {
            roster,
            courts,
            rounds,
        })
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn courts(&self) -> usize {
        self.courts
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn last_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Current statistics for the active roster.
    pub fn heuristics(&self) -> HeuristicsMap {
        compute_heuristics(&self.rounds, &self.roster, None)
    }

    /// Plans and appends the next round.
    pub fn next_round<R: Rng + ?Sized>(
        &mut self,
        volunteers: &[PlayerId],
        config: &PlannerConfig,
        rng: &mut R,
    ) -> Result<&Round, GenerationError> {
        self.next_round_with(volunteers, config, rng, &Checkpoint::none())
    }

    pub fn next_round_with<R: Rng + ?Sized>(
        &mut self,
        volunteers: &[PlayerId],
        config: &PlannerConfig,
        rng: &mut R,
        checkpoint: &Checkpoint,
    ) -> Result<&Round, GenerationError> {
        let len = self.rounds.len();
        self.replace_tail(len, volunteers, config, rng, checkpoint)
    }

    /// Drops round `index` and everything after it, then plans a new round
    /// in its place. History is untouched if planning fails.
    pub fn regenerate_from<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        volunteers: &[PlayerId],
        config: &PlannerConfig,
        rng: &mut R,
    ) -> Result<&Round, GenerationError> {
        let index = index.min(self.rounds.len());
        self.replace_tail(index, volunteers, config, rng, &Checkpoint::none())
    }

    fn replace_tail<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        volunteers: &[PlayerId],
        config: &PlannerConfig,
        rng: &mut R,
        checkpoint: &Checkpoint,
    ) -> Result<&Round, GenerationError> {
        let request = RoundRequest::new(&self.rounds[..index], &self.roster, self.courts)
            .with_volunteers(volunteers);
        let round = plan_next_round_with(request, config, rng, checkpoint)?;
        self.rounds.truncate(index);
        self.rounds.push(round);
        Ok(&self.rounds[index])
    }

    /// Appends a round built elsewhere, such as one entered by hand or taken
    /// from a [`PlanOutcome`](crate::pairing::PlanOutcome).
    pub fn push_round(&mut self, round: Round) -> Result<&Round, RoundViolation> {
        round.validate_against(&self.roster, self.courts)?;
        self.rounds.push(round);
        Ok(&self.rounds[self.rounds.len() - 1])
    }

    pub fn truncate(&mut self, len: usize) {
        self.rounds.truncate(len);
    }

    /// Replaces the active roster; past rounds keep the players they had.
    pub fn set_roster(&mut self, roster: Vec<PlayerId>) -> Result<(), GenerationError> {
        validate_roster(&roster, self.courts)?;
        self.roster = roster;
        Ok(())
    }

    pub fn set_courts(&mut self, courts: usize) -> Result<(), GenerationError> {
        validate_roster(&self.roster, courts)?;
        self.courts = courts;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }
}
