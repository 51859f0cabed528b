use std::fmt;

/// Stage of round generation that ran out of options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    SitOuts,
    Teams,
    Matches,
    Lookahead,
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenerationPhase::SitOuts => "sit-outs",
            GenerationPhase::Teams => "teams",
            GenerationPhase::Matches => "matches",
            GenerationPhase::Lookahead => "lookahead",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The request cannot produce a round at all; nothing was attempted.
    InvalidRoster { reason: String },
    /// No acceptable partition was found within the attempt budget.
    GenerationExhausted { phase: GenerationPhase },
    /// The host asked to stop.
    Cancelled,
}

impl GenerationError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        GenerationError::InvalidRoster {
            reason: reason.into(),
        }
    }

    pub fn exhausted(phase: GenerationPhase) -> Self {
        GenerationError::GenerationExhausted { phase }
    }

    /// Whether a rollout may stop here and keep what it has.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, GenerationError::GenerationExhausted { .. })
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::InvalidRoster { reason } => write!(f, "invalid roster: {reason}"),
            GenerationError::GenerationExhausted { phase } => {
                write!(f, "no {phase} found within the attempt budget")
            }
            GenerationError::Cancelled => write!(f, "generation cancelled"),
        }
    }
}

impl std::error::Error for GenerationError {}
