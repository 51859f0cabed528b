pub mod heuristics;
pub mod model;
pub mod pairing;
pub mod session;
pub mod worker;

pub use heuristics::{HeuristicsMap, PlayerHeuristics, compute_heuristics};
pub use model::{Match, PlayerId, Round, Team};
pub use pairing::{
    GenerationError, GeneratorConfig, PlannerConfig, RoundRequest, generate_round, plan_next_round,
};
pub use session::Session;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "courtmix"
    }

    pub const fn codename() -> &'static str {
        "Rotation"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "courtmix");
        assert_eq!(AppInfo::codename(), "Rotation");
        assert!(!AppInfo::version().is_empty());
    }
}
