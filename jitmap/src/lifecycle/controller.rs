//! # Lifecycle Controller
//!
//! Drives one attachment from capability registration to disposal.
//!
//! ## States
//!
//! ```text
//!   UNATTACHED ──attach──▶ ATTACHING ──VM not live──▶ AWAITING_VM_INIT
//!        ▲                     │                             │ VM init
//!        │                     │ VM live                     ▼
//!        │                     └──────▶ LIVE_BOOTSTRAPPING ──▶ LIVE
//!        │                                                     │
//!        └──────────────── DISPOSING ◀──shutdown / VM death────┘
//! ```
//!
//! All state changes happen under one mutex, and the "already attached"
//! check is made under the same acquisition as the state change, so two
//! concurrent attaches cannot both succeed.
//!
//! Historical replay (thread snapshot, then re-delivery of every earlier
//! compiled method and generated stub) runs after live notifications are
//! enabled. A method compiled in between can show up both live and
//! replayed; one compiled before is replayed exactly once.
//!
//! Disposal does not wait for handlers already running on other threads.
//! It raises the disposal flag first, so their symbol lookups fail closed
//! and their records are dropped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, error, info, warn};

use super::state::{AgentState, LifecycleState};
use crate::cli::{AgentOptions, Command};
use crate::domain::{
    report_failed, AttachError, Notification, Phase, RuntimeError, EXIT_SUCCESS,
};
use crate::logging;
use crate::profiling::{EventProcessor, OsThreads, ProcfsThreads};
use crate::runtime::{AgentJob, Runtime};

/// Name of the managed thread that performs historical replay
pub const REPLAY_THREAD_NAME: &str = "Profiler Agent Previous Events Writer Thread";

/// What started a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// `shutdown` option on a later invocation
    Command,
    /// `forceshutdown`, or a setup step failed; skips the final thread dump
    Forced,
    /// The runtime's own termination notification; notifications are not
    /// disabled since the runtime is tearing them down itself
    VmDeath,
}

/// Default events file for a process: `/tmp/perf-<pid>.map`
#[must_use]
pub fn default_events_path(pid: u32) -> PathBuf {
    PathBuf::from(format!("/tmp/perf-{pid}.map"))
}

/// The process-wide agent
pub struct Agent {
    state: Mutex<AgentState>,
    processor: Arc<EventProcessor>,
    default_events_path: PathBuf,
}

fn enable_live_notifications(runtime: &dyn Runtime) -> Result<(), RuntimeError> {
    for notification in Notification::LIVE {
        runtime.set_notification(notification, true)?;
    }
    Ok(())
}

fn disable_notifications(runtime: &dyn Runtime) {
    for notification in Notification::LIVE.into_iter().chain([Notification::VmInit]) {
        report_failed(
            runtime.set_notification(notification, false),
            &format!("disable {notification}"),
        );
    }
}

/// Thread snapshot, then re-delivery of everything compiled or generated
/// before the live notifications took effect
fn replay(processor: &EventProcessor, runtime: &dyn Runtime) -> Result<(), RuntimeError> {
    info!("replay of earlier events started");
    processor.write_thread_snapshot(runtime);

    let started = Instant::now();
    runtime.generate_events(Notification::CompiledMethodLoad)?;
    runtime.generate_events(Notification::DynamicCodeGenerated)?;
    processor.stats().log_replay_summary(started.elapsed());
    Ok(())
}

impl Agent {
    #[must_use]
    pub fn new(os: Box<dyn OsThreads>, default_events_path: PathBuf) -> Self {
        Self {
            state: Mutex::new(AgentState::default()),
            processor: Arc::new(EventProcessor::new(os)),
            default_events_path,
        }
    }

    /// Agent for the running process, reading threads from `/proc/self`
    #[must_use]
    pub fn for_current_process() -> Self {
        Self::new(Box::new(ProcfsThreads::default()), default_events_path(std::process::id()))
    }

    fn lock(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Notification handlers; usable without taking the state lock
    #[must_use]
    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    #[must_use]
    pub fn attach_count(&self) -> u64 {
        self.lock().attach_count
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.lock().is_attached()
    }

    #[must_use]
    pub fn default_events_path(&self) -> &Path {
        &self.default_events_path
    }

    /// Handle one load/attach invocation and return its exit code
    ///
    /// `connect` obtains the instrumentation environment; it is only called
    /// for attach commands that pass the duplicate-attach check.
    pub fn handle_invocation<F>(&self, raw_options: Option<&str>, vm_live: bool, connect: F) -> i32
    where
        F: FnOnce(&AgentOptions) -> Result<Arc<dyn Runtime>, RuntimeError>,
    {
        let options = AgentOptions::parse(raw_options);
        match options.command {
            Command::Shutdown { force } => {
                let trigger = if force { ShutdownTrigger::Forced } else { ShutdownTrigger::Command };
                self.shutdown(trigger);
                EXIT_SUCCESS
            }
            Command::Attach => match self.attach(&options, vm_live, connect) {
                Ok(()) => EXIT_SUCCESS,
                Err(err) => err.exit_code(),
            },
        }
    }

    /// Attach to a runtime
    ///
    /// With `vm_live` the replay runs before this returns. Otherwise only
    /// the VM init notification is enabled and the rest happens in
    /// [`Agent::on_vm_init`].
    ///
    /// # Errors
    /// - `AlreadyAttached` if an attachment is active; nothing is changed
    /// - `EventsFileUnavailable` if no events file could be opened
    /// - `Setup` if a runtime call failed; the attachment is torn down
    pub fn attach<F>(&self, options: &AgentOptions, vm_live: bool, connect: F) -> Result<(), AttachError>
    where
        F: FnOnce(&AgentOptions) -> Result<Arc<dyn Runtime>, RuntimeError>,
    {
        let (runtime, generation) = {
            let mut st = self.lock();
            if st.is_attached() || st.state != LifecycleState::Unattached {
                // Goes to the active attachment's diagnostic log
                warn!("{}", AttachError::AlreadyAttached);
                return Err(AttachError::AlreadyAttached);
            }
            st.state = LifecycleState::Attaching;
            let sink = logging::open(options.log_file.as_deref());
            debug!("diagnostics go to {sink:?}");

            let events_path = match self
                .processor
                .open(options.events_file.as_deref(), &self.default_events_path)
            {
                Ok(path) => path,
                Err(err) => {
                    error!("{err}. Will terminate.");
                    logging::close();
                    st.state = LifecycleState::Unattached;
                    return Err(err);
                }
            };

            let runtime = match connect(options) {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("can't get instrumentation environment: {err}");
                    self.processor.close();
                    logging::close();
                    st.state = LifecycleState::Unattached;
                    return Err(err.into());
                }
            };

            st.attach_count += 1;
            st.attachment = Some(Arc::clone(&runtime));
            info!("attach count = {}", st.attach_count);
            info!("events file: {}", events_path.display());

            if let Err(err) = Self::configure(runtime.as_ref(), vm_live) {
                error!("setup failed: {err}");
                self.dispose_locked(&mut st, ShutdownTrigger::Forced);
                return Err(err.into());
            }

            st.state = if vm_live {
                LifecycleState::LiveBootstrapping
            } else {
                LifecycleState::AwaitingVmInit
            };
            (runtime, st.attach_count)
        };

        if vm_live {
            // Outside the lock: replayed notifications may take a while
            if let Err(err) = replay(&self.processor, runtime.as_ref()) {
                error!("replay of earlier events failed: {err}");
                self.abort(generation);
                return Err(err.into());
            }
            let mut st = self.lock();
            if st.attach_count == generation && st.state == LifecycleState::LiveBootstrapping {
                st.state = LifecycleState::Live;
            }
        }

        Ok(())
    }

    fn configure(runtime: &dyn Runtime, vm_live: bool) -> Result<(), RuntimeError> {
        runtime.add_compiled_code_capability()?;
        runtime.install_callbacks()?;
        if vm_live {
            enable_live_notifications(runtime)
        } else {
            runtime.set_notification(Notification::VmInit, true)
        }
    }

    /// The runtime finished initializing: go live and start replay
    ///
    /// Replay runs on a runtime-managed thread so the init notification
    /// returns promptly.
    pub fn on_vm_init(&self) {
        info!("VM init");
        let mut st = self.lock();
        if st.state != LifecycleState::AwaitingVmInit {
            debug!("ignoring VM init in state {}", st.state);
            return;
        }
        let Some(runtime) = st.attachment.clone() else {
            return;
        };

        if let Err(err) = enable_live_notifications(runtime.as_ref()) {
            error!("enable notifications at VM init: {err}");
            self.dispose_locked(&mut st, ShutdownTrigger::Forced);
            return;
        }

        let processor = Arc::clone(&self.processor);
        let replay_runtime = Arc::clone(&runtime);
        let job: AgentJob = Box::new(move || {
            if let Err(err) = replay(&processor, replay_runtime.as_ref()) {
                warn!("replay of earlier events failed: {err}");
            }
        });
        if let Err(err) = runtime.spawn_agent_thread(REPLAY_THREAD_NAME, job) {
            error!("start replay thread at VM init: {err}");
            self.dispose_locked(&mut st, ShutdownTrigger::Forced);
            return;
        }

        st.state = LifecycleState::Live;
    }

    /// Tear down the active attachment; a no-op when there is none
    pub fn shutdown(&self, trigger: ShutdownTrigger) {
        match trigger {
            ShutdownTrigger::Command => info!("shutdown requested"),
            ShutdownTrigger::Forced => info!("forced shutdown requested"),
            ShutdownTrigger::VmDeath => info!("VM death"),
        }
        let mut st = self.lock();
        self.dispose_locked(&mut st, trigger);
    }

    /// Forced shutdown, but only if `generation` is still the live attachment
    fn abort(&self, generation: u64) {
        let mut st = self.lock();
        if st.attach_count == generation {
            self.dispose_locked(&mut st, ShutdownTrigger::Forced);
        }
    }

    fn dispose_locked(&self, st: &mut AgentState, trigger: ShutdownTrigger) {
        let Some(runtime) = st.attachment.take() else {
            debug!("no active attachment, nothing to shut down");
            return;
        };
        st.state = LifecycleState::Disposing;

        if trigger != ShutdownTrigger::Forced {
            match runtime.phase() {
                Ok(Phase::Live) => self.processor.write_thread_snapshot(runtime.as_ref()),
                Ok(phase) => debug!("skipping final thread dump in {phase} phase"),
                Err(err) => warn!("skipping final thread dump: {err}"),
            }
        }

        if trigger != ShutdownTrigger::VmDeath {
            disable_notifications(runtime.as_ref());
        }

        self.processor.begin_disposal();
        report_failed(runtime.dispose(), "can't dispose instrumentation environment");

        self.processor.stats().log_totals_and_reset();
        self.processor.close();
        logging::close();
        st.state = LifecycleState::Unattached;
    }
}
