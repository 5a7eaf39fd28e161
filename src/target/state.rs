/// Target state definitions for tracking a URL through one run
///
/// A target only ever moves forward: `Queued -> Running -> Done`.
use std::fmt;

/// Represents the current state of a target in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Waiting in the queue for a free slot
    Queued,

    /// A request for this target is in flight
    Running,

    /// The request finished, successfully or not
    Done,
}

impl TargetState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the target still occupies the store (queued or running)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running) | (Self::Running, Self::Done)
        )
    }

    /// Short lowercase name, used in logs and the progress line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
        }
    }

    /// Returns all possible target states
    pub fn all_states() -> [Self; 3] {
        [Self::Queued, Self::Running, Self::Done]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
