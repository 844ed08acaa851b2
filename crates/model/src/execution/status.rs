use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by steps and jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl BatchStatus {
    /// No further transitions are allowed out of a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }

    /// `Pending -> Running -> {Completed, Failed, Stopped}`. A pending job may
    /// also be stopped before it ever runs.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running | Self::Stopped) => true,
            (Self::Running, Self::Completed | Self::Failed | Self::Stopped) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_final() {
        for terminal in [BatchStatus::Completed, BatchStatus::Failed, BatchStatus::Stopped] {
            assert!(terminal.is_terminal());
            for next in [
                BatchStatus::Pending,
                BatchStatus::Running,
                BatchStatus::Completed,
                BatchStatus::Failed,
                BatchStatus::Stopped,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn pending_must_run_before_completing() {
        assert!(BatchStatus::Pending.can_transition_to(BatchStatus::Running));
        assert!(!BatchStatus::Pending.can_transition_to(BatchStatus::Completed));
        assert!(!BatchStatus::Pending.can_transition_to(BatchStatus::Failed));
        assert!(BatchStatus::Running.can_transition_to(BatchStatus::Failed));
    }
}
