//! Derived statistics over round history.

pub mod compute;
pub mod match_counts;
pub mod records;

pub use compute::{HeuristicsMap, PlayerHeuristics, compute_heuristics};
pub use match_counts::{MatchCounts, count_matches, times_played};
pub use records::{INFINITY, PlayerRecords, RecordKind};
