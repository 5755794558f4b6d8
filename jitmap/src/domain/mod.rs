//! Domain model for jitmap
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{CodeAddress, MethodId, Notification, Phase, ThreadRef, Tid, Timestamp};

pub use errors::{
    report_failed, AttachError, RuntimeError, EXIT_ALREADY_ATTACHED, EXIT_EVENTS_FILE,
    EXIT_SETUP, EXIT_SUCCESS,
};
