//! Profiling core modules
//!
//! - Inline-record decoding of compiled units
//! - Notification handling
//! - OS thread discovery and the thread identity registry
//! - Overhead counters

pub mod diagnostics;
pub mod event_processor;
pub mod inline_decoder;
pub mod thread_discovery;
pub mod thread_registry;

// Re-export common types
pub use diagnostics::{AgentStats, StatsSnapshot};
pub use event_processor::EventProcessor;
pub use inline_decoder::{decode, partition, AddressRange, CompiledCode, PcFrames};
pub use thread_discovery::{OsThread, OsThreads, ProcfsThreads};
pub use thread_registry::{merge, ThreadIdentity, ThreadRegistry};
