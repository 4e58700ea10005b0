//! Engine state types.
//!
//! Defines the state machine for the replication engine lifecycle.
//!
//! # State Transitions
//!
//! ```text
//!                start() (loop)
//! Created ─────────────────────→ Running
//!    │                              │
//!    │ start() (single run)         │ shutdown()
//!    ├──────────┐                   ↓
//!    │          │             ShuttingDown
//!    │   ok     │ err               │
//!    ↓          ↓                   ↓
//! Stopped ←── Failed            Stopped
//! ```
//!
//! A failed run in loop mode does not change state: the next tick retries.
//! `Failed` is only reached when the single configured run fails.

/// State of the replication engine.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine created but not started.
    ///
    /// Call [`start()`](super::ReplicationEngine::start) to begin replication.
    Created,

    /// The run loop is active.
    Running,

    /// `shutdown()` called. The in-flight run is being cancelled.
    ShuttingDown,

    /// Stopped cleanly, or the single run succeeded.
    Stopped,

    /// The single configured run failed. Check logs for details.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Running => write!(f, "Running"),
            EngineState::ShuttingDown => write!(f, "ShuttingDown"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_state_display() {
        assert_eq!(EngineState::Created.to_string(), "Created");
        assert_eq!(EngineState::Running.to_string(), "Running");
        assert_eq!(EngineState::ShuttingDown.to_string(), "ShuttingDown");
        assert_eq!(EngineState::Stopped.to_string(), "Stopped");
        assert_eq!(EngineState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_display_matches_debug() {
        // The metrics gauge keys off the Display form
        for state in [
            EngineState::Created,
            EngineState::Running,
            EngineState::ShuttingDown,
            EngineState::Stopped,
            EngineState::Failed,
        ] {
            assert_eq!(state.to_string(), format!("{:?}", state));
        }
    }
}
