//! Attachment state shared by every entry point

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::runtime::Runtime;

/// Where the agent is in its attach/teardown cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Unattached,
    Attaching,
    /// Attached during VM startup; waiting for the init notification
    AwaitingVmInit,
    /// Live notifications are on and historical replay is running
    LiveBootstrapping,
    Live,
    Disposing,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unattached => "UNATTACHED",
            LifecycleState::Attaching => "ATTACHING",
            LifecycleState::AwaitingVmInit => "AWAITING_VM_INIT",
            LifecycleState::LiveBootstrapping => "LIVE_BOOTSTRAPPING",
            LifecycleState::Live => "LIVE",
            LifecycleState::Disposing => "DISPOSING",
        };
        f.write_str(name)
    }
}

/// Raised when the instrumentation environment starts going away
///
/// Read on every symbol resolution, written only by the lifecycle
/// controller. Not a lock: handlers that passed the check just before it is
/// raised may still finish.
#[derive(Debug, Default)]
pub struct DisposalFlag(AtomicBool);

impl DisposalFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_disposing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The fields guarded by the controller's mutex
#[derive(Default)]
pub struct AgentState {
    pub state: LifecycleState,
    pub attachment: Option<Arc<dyn Runtime>>,
    /// Successful attaches over the process lifetime
    pub attach_count: u64,
}

impl AgentState {
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }
}

impl fmt::Debug for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentState")
            .field("state", &self.state)
            .field("attached", &self.is_attached())
            .field("attach_count", &self.attach_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposal_flag_round_trip() {
        let flag = DisposalFlag::default();
        assert!(!flag.is_disposing());
        flag.raise();
        assert!(flag.is_disposing());
        flag.clear();
        assert!(!flag.is_disposing());
    }

    #[test]
    fn test_default_state_is_unattached() {
        let state = AgentState::default();
        assert_eq!(state.state, LifecycleState::Unattached);
        assert!(!state.is_attached());
        assert_eq!(state.state.to_string(), "UNATTACHED");
    }
}
