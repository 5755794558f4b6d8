//! The seam between the recording core and the host VM
//!
//! The core never touches JVMTI directly. It sees the VM through these
//! traits, which the `jvm` module implements over the real interface and
//! the integration tests implement over an in-memory fake.

use crate::domain::{MethodId, Notification, Phase, RuntimeError, ThreadRef, Tid};

/// Work handed to a runtime-managed background thread
pub type AgentJob = Box<dyn FnOnce() + Send + 'static>;

/// Method metadata lookups used by symbol resolution
///
/// Implementations must release any runtime scratch memory before
/// returning, on success and failure alike.
pub trait SymbolSource {
    /// Simple method name, e.g. `hashCode`
    ///
    /// # Errors
    /// Returns the runtime status when the handle cannot be queried
    fn method_name(&self, method: MethodId) -> Result<String, RuntimeError>;

    /// Internal descriptor of the declaring class, e.g. `Ljava/lang/String;`
    ///
    /// # Errors
    /// Returns the runtime status when the class or its signature cannot be
    /// queried
    fn declaring_class_signature(&self, method: MethodId) -> Result<String, RuntimeError>;
}

/// Managed thread name lookup for a single thread handle
pub trait ThreadNames {
    /// Name the runtime reports for `thread`, `None` if it has none
    ///
    /// # Errors
    /// Returns the runtime status when the thread cannot be queried
    fn thread_name(&self, thread: ThreadRef) -> Result<Option<String>, RuntimeError>;
}

/// One thread the managed runtime knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedThread {
    /// Kernel thread id, `None` when the native layout is unknown
    pub tid: Option<Tid>,
    pub name: String,
}

/// Everything the lifecycle controller needs from an attached VM
pub trait Runtime: SymbolSource + ThreadNames + Send + Sync {
    /// # Errors
    /// Returns the runtime status when the phase cannot be read
    fn phase(&self) -> Result<Phase, RuntimeError>;

    /// Ask for the capability to receive compiled-code notifications
    ///
    /// # Errors
    /// Returns the runtime status when the capability is unavailable
    fn add_compiled_code_capability(&self) -> Result<(), RuntimeError>;

    /// Register the agent's notification handlers
    ///
    /// # Errors
    /// Returns the runtime status when registration fails
    fn install_callbacks(&self) -> Result<(), RuntimeError>;

    /// # Errors
    /// Returns the runtime status when the mode cannot be changed
    fn set_notification(&self, notification: Notification, enabled: bool)
        -> Result<(), RuntimeError>;

    /// Re-deliver synthetic notifications for everything that already
    /// happened (compiled methods, generated code)
    ///
    /// # Errors
    /// Returns the runtime status when the request is rejected
    fn generate_events(&self, notification: Notification) -> Result<(), RuntimeError>;

    /// Run `job` on a new thread the VM knows about, named `name`
    ///
    /// # Errors
    /// Returns the runtime status when the thread cannot be created or started
    fn spawn_agent_thread(&self, name: &str, job: AgentJob) -> Result<(), RuntimeError>;

    /// Every live managed thread, with its kernel id when it can be read
    ///
    /// # Errors
    /// Returns the runtime status when the thread list cannot be fetched
    fn managed_threads(&self) -> Result<Vec<ManagedThread>, RuntimeError>;

    /// Release the instrumentation environment
    ///
    /// # Errors
    /// Returns the runtime status when disposal fails
    fn dispose(&self) -> Result<(), RuntimeError>;
}
