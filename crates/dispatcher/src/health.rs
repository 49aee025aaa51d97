//! Per-destination health latch
//!
//! Healthy (initial) and Failing. Only the two real transitions are reported
//! as events; repeated outcomes in the same state are silent.

use contracts::ContractError;

/// Result of feeding one send outcome into the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    /// Healthy -> Failing
    Failed,
    /// Failing -> Healthy
    Recovered,
    /// Failing -> Failing
    StillFailing,
    /// Healthy -> Healthy
    StillHealthy,
}

impl HealthTransition {
    /// Whether the transition should be reported
    pub fn is_event(self) -> bool {
        matches!(self, Self::Failed | Self::Recovered)
    }
}

#[derive(Debug, Default)]
pub struct HealthTracker {
    last_error: Option<String>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    /// Error that latched the tracker, while failing
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn record_failure(&mut self, err: &ContractError) -> HealthTransition {
        let was_healthy = self.is_healthy();
        self.last_error = Some(err.to_string());
        if was_healthy {
            HealthTransition::Failed
        } else {
            HealthTransition::StillFailing
        }
    }

    pub fn record_success(&mut self) -> HealthTransition {
        match self.last_error.take() {
            Some(_) => HealthTransition::Recovered,
            None => HealthTransition::StillHealthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fail_succeed() {
        let mut tracker = HealthTracker::new();
        let err = ContractError::destination_write("tcp://a:1", "reset");

        assert_eq!(tracker.record_failure(&err), HealthTransition::Failed);
        assert_eq!(tracker.record_failure(&err), HealthTransition::StillFailing);
        assert!(!tracker.is_healthy());
        assert!(tracker.last_error().unwrap().contains("reset"));

        assert_eq!(tracker.record_success(), HealthTransition::Recovered);
        assert_eq!(tracker.record_success(), HealthTransition::StillHealthy);
        assert!(tracker.is_healthy());
    }

    #[test]
    fn test_only_transitions_are_events() {
        assert!(HealthTransition::Failed.is_event());
        assert!(HealthTransition::Recovered.is_event());
        assert!(!HealthTransition::StillFailing.is_event());
        assert!(!HealthTransition::StillHealthy.is_event());
    }
}
