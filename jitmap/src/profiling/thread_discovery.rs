//! Operating-system thread discovery
//!
//! Lists the threads of the current process by reading the /proc
//! filesystem, and identifies the calling thread.

#![allow(unsafe_code)] // gettid has no safe wrapper in libc

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::Tid;

/// One thread as the operating system sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsThread {
    pub tid: Tid,
    /// `comm` name, `None` when empty or unreadable
    pub name: Option<String>,
}

/// Source of operating-system thread identities
pub trait OsThreads: Send + Sync {
    /// Every thread currently in the process
    ///
    /// # Errors
    /// Returns an error if the thread list cannot be read
    fn enumerate(&self) -> Result<Vec<OsThread>>;

    /// Kernel id of the calling thread
    fn current(&self) -> Tid;
}

/// Reads `<root>/task/*/comm`, normally for `/proc/self`
#[derive(Debug, Clone)]
pub struct ProcfsThreads {
    root: PathBuf,
}

impl Default for ProcfsThreads {
    fn default() -> Self {
        Self::new("/proc/self")
    }
}

impl ProcfsThreads {
    /// Discover threads under a process directory such as `/proc/self`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_comm(task_dir: &Path) -> Option<String> {
        let comm = fs::read_to_string(task_dir.join("comm")).ok()?;
        let comm = comm.trim_end_matches('\n');
        (!comm.is_empty()).then(|| comm.to_string())
    }
}

impl OsThreads for ProcfsThreads {
    fn enumerate(&self) -> Result<Vec<OsThread>> {
        let task_dir = self.root.join("task");

        let entries = fs::read_dir(&task_dir)
            .context(format!("Failed to read {}", task_dir.display()))?;

        let mut threads: Vec<OsThread> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let tid = entry.file_name().to_string_lossy().parse::<u32>().ok()?;
                // Threads that exit mid-scan lose their comm file; keep the id
                let name = Self::read_comm(&entry.path());
                Some(OsThread { tid: Tid(tid), name })
            })
            .collect();

        threads.sort_by_key(|thread| thread.tid);
        Ok(threads)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn current(&self) -> Tid {
        // SAFETY: gettid takes no arguments and cannot fail
        let tid = unsafe { libc::syscall(libc::SYS_gettid) };
        Tid(tid as u32)
    }
}
