//! The real VM behind the `Runtime` seam
//!
//! - `sys`: raw JNI/JVMTI declarations
//! - `env`: safe wrappers and the `Runtime` implementation
//! - `layout`: native thread offsets
//! - `callbacks`: notification handlers
//! - `exports`: `Agent_OnLoad`, `Agent_OnAttach`, `Agent_OnUnload`

use std::sync::LazyLock;

use crate::lifecycle::Agent;

pub mod callbacks;
pub mod env;
pub mod exports;
pub mod layout;
pub mod sys;

/// The one agent per process; every entry point and handler goes through it
pub(crate) static AGENT: LazyLock<Agent> = LazyLock::new(Agent::for_current_process);

pub use env::{Jvmti, JvmRuntime};
pub use layout::ThreadLayout;
