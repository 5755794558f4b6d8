//! Native thread layout
//!
//! `java.lang.Thread.eetop` holds the address of the VM's native thread.
//! The kernel thread id sits behind two build-specific offsets:
//!
//! ```text
//! eetop ──+thread_osthread_offset──▶ *OSThread ──+osthread_id_offset──▶ i32 tid
//! ```
//!
//! Offsets are not part of any public interface and none are built in.
//! On Linux both must be passed as the `thread_osthread_offset` and
//! `osthread_id_offset` attach options; without them managed threads have
//! no OS id and every snapshot entry takes its name from `/proc/self/task`.

use crate::cli::LayoutOverride;

/// Offsets used to read a managed thread's kernel id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadLayout {
    pub thread_osthread_offset: usize,
    pub osthread_id_offset: usize,
}

impl ThreadLayout {
    /// Layout supplied on the option string, `None` unless both offsets are
    #[must_use]
    pub fn from_overrides(overrides: LayoutOverride) -> Option<Self> {
        Some(Self {
            thread_osthread_offset: overrides.thread_osthread_offset?,
            osthread_id_offset: overrides.osthread_id_offset?,
        })
    }
}
