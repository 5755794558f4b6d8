//! # Thread Identity Registry
//!
//! Maps kernel thread ids to the best name available, so consumers can
//! label samples by logical thread.
//!
//! ## Name Precedence
//!
//! 1. Managed name reported by the runtime → `java: <name>`
//! 2. OS name with the runtime's synthetic `Java: ` prefix → `java: <rest>`
//! 3. Any other OS name → `native: <name>`
//! 4. No name at all → `native: <tid>`
//!
//! Both entry points query the runtime and are only safe in the live phase;
//! the lifecycle controller gates them.

use std::collections::HashMap;
use std::time::Instant;

use jitmap_common::{Payload, JAVA_THREAD_PREFIX, NATIVE_THREAD_PREFIX};
use log::warn;

use super::thread_discovery::{OsThread, OsThreads};
use crate::domain::{ThreadRef, Tid};
use crate::profiling::diagnostics::{add_elapsed, AgentStats};
use crate::runtime::{ManagedThread, Runtime, ThreadNames};

/// Prefix the runtime gives OS names of threads it created itself
const SYNTHETIC_PREFIX: &str = "Java: ";

/// Fallback when the runtime reports no name for a managed thread
pub const UNKNOWN_THREAD_NAME: &str = "Unknown";

/// One `thread:` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadIdentity {
    pub os_id: u64,
    pub kernel_id: u32,
    pub name: String,
}

impl ThreadIdentity {
    fn for_tid(tid: Tid, name: String) -> Self {
        // On Linux the kernel tid is both the numeric OS id and the kernel id
        Self { os_id: u64::from(tid.0), kernel_id: tid.0, name }
    }
}

impl From<ThreadIdentity> for Payload {
    fn from(identity: ThreadIdentity) -> Self {
        Payload::Thread { os_id: identity.os_id, kernel_id: identity.kernel_id, name: identity.name }
    }
}

/// Display name for an OS thread the managed runtime did not claim
fn unmanaged_name(thread: &OsThread) -> String {
    match thread.name.as_deref() {
        Some(name) => match name.strip_prefix(SYNTHETIC_PREFIX) {
            Some(rest) => format!("{JAVA_THREAD_PREFIX}{rest}"),
            None => format!("{NATIVE_THREAD_PREFIX}{name}"),
        },
        None => format!("{NATIVE_THREAD_PREFIX}{}", thread.tid.0),
    }
}

/// Merge a managed-thread listing into the OS thread list
///
/// Produces one identity per OS thread, in OS enumeration order. Managed
/// threads without a known kernel id cannot be matched and are skipped.
#[must_use]
pub fn merge(managed: &[ManagedThread], os_threads: &[OsThread]) -> Vec<ThreadIdentity> {
    let known: HashMap<Tid, &str> = managed
        .iter()
        .filter_map(|thread| Some((thread.tid?, thread.name.as_str())))
        .collect();

    os_threads
        .iter()
        .map(|thread| {
            let name = match known.get(&thread.tid) {
                Some(managed_name) => format!("{JAVA_THREAD_PREFIX}{managed_name}"),
                None => unmanaged_name(thread),
            };
            ThreadIdentity::for_tid(thread.tid, name)
        })
        .collect()
}

/// Builds thread identities from the runtime and the OS
pub struct ThreadRegistry<'a> {
    os: &'a dyn OsThreads,
    stats: &'a AgentStats,
}

impl<'a> ThreadRegistry<'a> {
    #[must_use]
    pub fn new(os: &'a dyn OsThreads, stats: &'a AgentStats) -> Self {
        Self { os, stats }
    }

    /// Identities of every thread in the process
    ///
    /// Either source failing degrades the snapshot instead of aborting it:
    /// no managed listing means OS names only, no OS listing means nothing.
    #[must_use]
    pub fn snapshot(&self, runtime: &dyn Runtime) -> Vec<ThreadIdentity> {
        let started = Instant::now();

        let managed = runtime.managed_threads().unwrap_or_else(|err| {
            warn!("thread snapshot: {err}");
            Vec::new()
        });
        if managed.is_empty() {
            warn!("thread snapshot: no managed threads");
        }

        let os_threads = self.os.enumerate().unwrap_or_else(|err| {
            warn!("thread snapshot: {err:#}");
            Vec::new()
        });

        let identities = merge(&managed, &os_threads);
        add_elapsed(&self.stats.snapshot_nanos, started);
        identities
    }

    /// Identity of the calling thread, which the runtime reports as `thread`
    ///
    /// Thread notifications are delivered on the affected thread itself, so
    /// the OS identity is the caller's own.
    #[must_use]
    pub fn resolve_one(&self, names: &dyn ThreadNames, thread: ThreadRef) -> ThreadIdentity {
        let name = match names.thread_name(thread) {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_THREAD_NAME.to_string(),
            Err(err) => {
                warn!("thread name lookup: {err}");
                UNKNOWN_THREAD_NAME.to_string()
            }
        };
        ThreadIdentity::for_tid(self.os.current(), format!("{JAVA_THREAD_PREFIX}{name}"))
    }
}
