//! Lifecycle switch.
//!
//! `Online <-> Offline` is reversible. `Online | Offline -> Shutdown` is
//! terminal. Same-state transitions are rejected.

use geyser_types::LifecycleState;

use crate::{EngineError, Result};

/// Reject unless `state` is Online.
pub fn require_online(state: LifecycleState) -> Result<()> {
    match state {
        LifecycleState::Online => Ok(()),
        other => Err(EngineError::NotOnline(other)),
    }
}

/// Validate a transition from `from` to `to`.
pub fn check_transition(from: LifecycleState, to: LifecycleState) -> Result<()> {
    use LifecycleState::*;
    match (from, to) {
        (Online, Offline) | (Offline, Online) | (Online, Shutdown) | (Offline, Shutdown) => Ok(()),
        _ => Err(EngineError::InvalidTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn test_only_online_accepts_mutations() {
        assert!(require_online(Online).is_ok());
        assert!(matches!(
            require_online(Offline),
            Err(EngineError::NotOnline(Offline))
        ));
        assert!(matches!(
            require_online(Shutdown),
            Err(EngineError::NotOnline(Shutdown))
        ));
    }

    #[test]
    fn test_transitions() {
        assert!(check_transition(Online, Offline).is_ok());
        assert!(check_transition(Offline, Online).is_ok());
        assert!(check_transition(Online, Shutdown).is_ok());
        assert!(check_transition(Offline, Shutdown).is_ok());

        for to in [Online, Offline, Shutdown] {
            assert!(check_transition(Shutdown, to).is_err());
        }
        assert!(check_transition(Online, Online).is_err());
        assert!(check_transition(Offline, Offline).is_err());
    }
}
