use std::fmt;

/// Lifecycle of the background scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerState {
    /// No loop task exists
    Stopped,

    /// The loop task is alive and polling the crawl configuration
    Running,
}

impl SchedulerState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if moving from `self` to `to` is a real transition
    pub fn can_transition_to(&self, to: SchedulerState) -> bool {
        *self != to
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}
