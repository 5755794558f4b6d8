//! Attachment lifecycle: the state machine and the state it guards

pub mod controller;
pub mod state;

pub use controller::{default_events_path, Agent, ShutdownTrigger, REPLAY_THREAD_NAME};
pub use state::{AgentState, DisposalFlag, LifecycleState};
