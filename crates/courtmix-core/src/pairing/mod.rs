pub mod checkpoint;
pub mod error;
pub mod generator;
pub mod matcher;
pub mod planner;
pub mod scoring;
pub mod sitout;

pub use checkpoint::{CancelToken, Checkpoint};
pub use error::{GenerationError, GenerationPhase};
pub use generator::{
    Diagnostics, GeneratedRound, GeneratorConfig, RoundRequest, Snapshot, generate_round,
    generate_round_from, validate_roster,
};
pub use matcher::{MatchError, MatcherConfig, PairMatcher, Pairing, PreferenceMatrix};
pub use planner::{
    PlanOutcome, PlannerConfig, RolloutScore, plan_next_round, plan_next_round_with, plan_round,
};
pub use scoring::{ScoringWeights, opponent_score, partner_preferences, partner_score, team_preferences};
pub use sitout::{SitOutSelection, pick_biased, select_sit_outs};
