use crate::error::ConfabError;

/// Guard against pathological tool-call cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// `None` leaves the loop unbounded.
    pub max_iterations: Option<usize>,
}

impl RunLimits {
    pub fn new(max_iterations: Option<usize>) -> Self {
        Self { max_iterations }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(max_iterations: usize) -> Self {
        Self::new(Some(max_iterations))
    }

    /// Fails once `completed` iterations have used up the budget.
    pub fn check(&self, completed: usize) -> Result<(), ConfabError> {
        match self.max_iterations {
            Some(max_iterations) if completed >= max_iterations => {
                Err(ConfabError::IterationLimit { max_iterations })
            }
            _ => Ok(()),
        }
    }
}
