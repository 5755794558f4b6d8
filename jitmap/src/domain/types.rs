//! Domain types providing compile-time safety and self-documentation
//!
//! Runtime handles (`jmethodID`, `jthread`) are opaque pointers on the FFI
//! side. Wrapping them keeps the core free of raw pointers and lets tests
//! invent handles out of plain integers.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque method handle
///
/// Only meaningful to the runtime that produced it, and only while that
/// runtime's instrumentation environment is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub usize);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method@{:#x}", self.0)
    }
}

/// Opaque managed-thread handle delivered with a thread notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadRef(pub usize);

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread@{:#x}", self.0)
    }
}

/// Start address of a block of machine code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeAddress(pub u64);

impl CodeAddress {
    /// Address `offset` bytes past this one
    #[must_use]
    pub fn offset(self, offset: u64) -> CodeAddress {
        CodeAddress(self.0.wrapping_add(offset))
    }
}

impl fmt::Display for CodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Thread ID
///
/// Kernel thread id as seen in `/proc/self/task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Wall-clock timestamp in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current wall-clock time
    ///
    /// A clock set before the epoch reads as zero rather than failing.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Timestamp(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime lifecycle phase as reported by the instrumentation interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    OnLoad,
    Primordial,
    Start,
    Live,
    Dead,
}

impl Phase {
    /// Map the raw `jvmtiPhase` value
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Phase> {
        match raw {
            1 => Some(Phase::OnLoad),
            2 => Some(Phase::Primordial),
            6 => Some(Phase::Start),
            4 => Some(Phase::Live),
            8 => Some(Phase::Dead),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::OnLoad => "onload",
            Phase::Primordial => "primordial",
            Phase::Start => "start",
            Phase::Live => "live",
            Phase::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Runtime notification kinds the agent subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    VmInit,
    VmDeath,
    ThreadStart,
    ThreadEnd,
    CompiledMethodLoad,
    CompiledMethodUnload,
    DynamicCodeGenerated,
}

impl Notification {
    /// Everything enabled once the VM is live, in enable order
    pub const LIVE: [Notification; 6] = [
        Notification::CompiledMethodLoad,
        Notification::CompiledMethodUnload,
        Notification::DynamicCodeGenerated,
        Notification::ThreadStart,
        Notification::ThreadEnd,
        Notification::VmDeath,
    ];

    /// Raw `jvmtiEvent` number
    #[must_use]
    pub fn event_number(self) -> u32 {
        match self {
            Notification::VmInit => 50,
            Notification::VmDeath => 51,
            Notification::ThreadStart => 52,
            Notification::ThreadEnd => 53,
            Notification::CompiledMethodLoad => 68,
            Notification::CompiledMethodUnload => 69,
            Notification::DynamicCodeGenerated => 70,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Notification::VmInit => "VMInit",
            Notification::VmDeath => "VMDeath",
            Notification::ThreadStart => "ThreadStart",
            Notification::ThreadEnd => "ThreadEnd",
            Notification::CompiledMethodLoad => "CompiledMethodLoad",
            Notification::CompiledMethodUnload => "CompiledMethodUnload",
            Notification::DynamicCodeGenerated => "DynamicCodeGenerated",
        };
        f.write_str(name)
    }
}
