//! Consumer state machine.

/// The state of a queue consumer in its lifecycle.
///
/// State transitions:
/// ```text
/// Idle ──► Running ──► Draining ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConsumerState {
    /// Created but not started.
    #[default]
    Idle,

    /// Pulling and processing messages.
    Running,

    /// Shutdown requested or source closed; releasing the subscription.
    Draining,

    /// Loop has returned (terminal state).
    Stopped,
}

impl ConsumerState {
    /// Returns true if the consumer can start running.
    pub fn can_run(&self) -> bool {
        matches!(self, ConsumerState::Idle)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Idle => "Idle",
            ConsumerState::Running => "Running",
            ConsumerState::Draining => "Draining",
            ConsumerState::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
