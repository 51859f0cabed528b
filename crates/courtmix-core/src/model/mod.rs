pub mod player;
pub mod round;
pub mod team;

pub use player::PlayerId;
pub use round::{Round, RoundViolation, required_sit_outs};
pub use team::{Match, SamePlayerTwice, Team};
