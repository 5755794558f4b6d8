//! Structured error types for jitmap
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Return code of a successful attach or command
pub const EXIT_SUCCESS: i32 = 0;
/// Neither the configured nor the default events file could be opened
pub const EXIT_EVENTS_FILE: i32 = 1;
/// A runtime setup call failed
pub const EXIT_SETUP: i32 = 2;
/// Another attachment is already active
pub const EXIT_ALREADY_ATTACHED: i32 = 1001;

/// A runtime call returned a non-zero status
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{operation} failed (jvmtiError: {code})")]
pub struct RuntimeError {
    pub operation: &'static str,
    pub code: i32,
}

impl RuntimeError {
    #[must_use]
    pub fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }

    /// Turn a raw status into a `Result`, zero being success
    ///
    /// # Errors
    /// Returns the wrapped status when `code` is non-zero
    pub fn check(operation: &'static str, code: i32) -> Result<(), RuntimeError> {
        if code == 0 {
            Ok(())
        } else {
            Err(RuntimeError::new(operation, code))
        }
    }
}

/// Reasons an attach attempt is rejected
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("an attachment is already active")]
    AlreadyAttached,

    #[error("can't open events file (tried {tried})")]
    EventsFileUnavailable { tried: String },

    #[error("runtime setup failed: {0}")]
    Setup(#[from] RuntimeError),
}

impl AttachError {
    /// Return code reported to the runtime's attach mechanism
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AttachError::AlreadyAttached => EXIT_ALREADY_ATTACHED,
            AttachError::EventsFileUnavailable { .. } => EXIT_EVENTS_FILE,
            AttachError::Setup(_) => EXIT_SETUP,
        }
    }
}

/// Log a best-effort runtime failure and carry on
///
/// Returns `true` when `result` was an error, mirroring the "did it fail"
/// question callers usually ask next.
pub fn report_failed<T>(result: Result<T, RuntimeError>, description: &str) -> bool {
    match result {
        Ok(_) => false,
        Err(err) => {
            log::warn!("{description}: {err}");
            true
        }
    }
}
