use super::error::GenerationError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a host raises to stop a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Scheduling point between attempts. Yields the thread and reports
/// cancellation.
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    token: Option<CancelToken>,
}

impl Checkpoint {
    /// A checkpoint that only yields.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancelToken) -> Self {
        Self { token: Some(token) }
    }

    pub fn check(&self) -> Result<(), GenerationError> {
        std::thread::yield_now();
        match &self.token {
            Some(token) if token.is_cancelled() => Err(GenerationError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observes_cancellation() {
        let token = CancelToken::new();
        let checkpoint = Checkpoint::with_token(token.clone());
        assert_eq!(checkpoint.check(), Ok(()));
        token.cancel();
        assert_eq!(checkpoint.check(), Err(GenerationError::Cancelled));
        token.reset();
        assert_eq!(checkpoint.check(), Ok(()));
        assert_eq!(Checkpoint::none().check(), Ok(()));
    }
}
