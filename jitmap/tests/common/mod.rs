//! In-memory VM used by the lifecycle tests
//!
//! Records every call the agent makes and re-delivers its "already
//! compiled" units and stubs to the agent's processor when asked to
//! generate events, the way a real VM does.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use jitmap::domain::{CodeAddress, MethodId, Notification, Phase, RuntimeError, ThreadRef, Tid};
use jitmap::profiling::{CompiledCode, EventProcessor, OsThread, OsThreads, PcFrames};
use jitmap::runtime::{AgentJob, ManagedThread, Runtime, SymbolSource, ThreadNames};
use jitmap_common::{LogRecord, Payload};

/// Status a disposed environment answers with
pub const INVALID_ENVIRONMENT: i32 = 116;

pub const GREET: MethodId = MethodId(0x10);
pub const FORMAT: MethodId = MethodId(0x11);
pub const APPEND: MethodId = MethodId(0x12);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddCapability,
    InstallCallbacks,
    SetNotification(Notification, bool),
    GenerateEvents(Notification),
    SpawnAgentThread(String),
    Dispose,
}

pub struct FakeVm {
    processor: Arc<EventProcessor>,
    methods: HashMap<MethodId, (&'static str, &'static str)>,
    compiled: Mutex<Vec<CompiledCode>>,
    stubs: Mutex<Vec<(String, CodeAddress, u64)>>,
    managed: Mutex<Vec<ManagedThread>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<Call>>,
    agent_threads: Mutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl FakeVm {
    /// VM whose notifications go to `processor`
    pub fn new(processor: &Arc<EventProcessor>) -> Self {
        let methods = HashMap::from([
            (GREET, ("Lcom/example/Greeter;", "greet")),
            (FORMAT, ("Ljava/lang/String;", "format")),
            (APPEND, ("Ljava/lang/StringBuilder;", "append")),
        ]);
        Self {
            processor: Arc::clone(processor),
            methods,
            compiled: Mutex::new(Vec::new()),
            stubs: Mutex::new(Vec::new()),
            managed: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            agent_threads: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Code the VM compiled before the agent showed up
    pub fn with_history(self) -> Self {
        self.compiled.lock().unwrap().extend([
            CompiledCode::single(FORMAT, CodeAddress(0x1000), 0x80),
            CompiledCode {
                method: GREET,
                address: CodeAddress(0x2000),
                length: 0x100,
                inline: Some(vec![
                    PcFrames { pc: CodeAddress(0x2000), methods: vec![GREET] },
                    PcFrames { pc: CodeAddress(0x2040), methods: vec![APPEND, GREET] },
                ]),
            },
        ]);
        self.stubs.lock().unwrap().push(("Interpreter".to_string(), CodeAddress(0x9000), 0x4000));
        self
    }

    pub fn with_managed(self, threads: Vec<ManagedThread>) -> Self {
        *self.managed.lock().unwrap() = threads;
        self
    }

    /// Make the named operation fail with status 99
    pub fn failing(self, operation: &'static str) -> Self {
        self.failing.lock().unwrap().insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Wait for every agent thread started so far
    pub fn join_agent_threads(&self) {
        let handles: Vec<_> = self.agent_threads.lock().unwrap().drain(..).collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    /// Deliver a live compiled-method-load notification
    pub fn compile(&self, unit: CompiledCode) {
        self.processor.compiled_method_load(self, &unit);
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(RuntimeError::new(operation, 99));
        }
        Ok(())
    }

    fn live(&self, operation: &'static str) -> Result<(), RuntimeError> {
        if self.is_disposed() {
            Err(RuntimeError::new(operation, INVALID_ENVIRONMENT))
        } else {
            Ok(())
        }
    }
}

impl SymbolSource for FakeVm {
    fn method_name(&self, method: MethodId) -> Result<String, RuntimeError> {
        self.live("GetMethodName")?;
        self.methods
            .get(&method)
            .map(|(_, name)| (*name).to_string())
            .ok_or(RuntimeError::new("GetMethodName", 23))
    }

    fn declaring_class_signature(&self, method: MethodId) -> Result<String, RuntimeError> {
        self.live("GetClassSignature")?;
        self.methods
            .get(&method)
            .map(|(class, _)| (*class).to_string())
            .ok_or(RuntimeError::new("GetMethodDeclaringClass", 23))
    }
}

impl ThreadNames for FakeVm {
    fn thread_name(&self, thread: ThreadRef) -> Result<Option<String>, RuntimeError> {
        self.live("GetThreadInfo")?;
        Ok((thread.0 != 0).then(|| format!("worker-{}", thread.0)))
    }
}

impl Runtime for FakeVm {
    fn phase(&self) -> Result<Phase, RuntimeError> {
        self.live("GetPhase")?;
        Ok(Phase::Live)
    }

    fn add_compiled_code_capability(&self) -> Result<(), RuntimeError> {
        self.record("AddCapabilities", Call::AddCapability)
    }

    fn install_callbacks(&self) -> Result<(), RuntimeError> {
        self.record("SetEventCallbacks", Call::InstallCallbacks)
    }

    fn set_notification(&self, notification: Notification, enabled: bool) -> Result<(), RuntimeError> {
        self.record("SetEventNotificationMode", Call::SetNotification(notification, enabled))
    }

    fn generate_events(&self, notification: Notification) -> Result<(), RuntimeError> {
        self.record("GenerateEvents", Call::GenerateEvents(notification))?;
        match notification {
            Notification::CompiledMethodLoad => {
                let units = self.compiled.lock().unwrap().clone();
                for unit in &units {
                    self.processor.compiled_method_load(self, unit);
                }
            }
            Notification::DynamicCodeGenerated => {
                let stubs = self.stubs.lock().unwrap().clone();
                for (name, address, length) in &stubs {
                    self.processor.dynamic_code_generated(name, *address, *length);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn spawn_agent_thread(&self, name: &str, job: AgentJob) -> Result<(), RuntimeError> {
        self.record("RunAgentThread", Call::SpawnAgentThread(name.to_string()))?;
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(job)
            .map_err(|_| RuntimeError::new("RunAgentThread", 99))?;
        self.agent_threads.lock().unwrap().push(handle);
        Ok(())
    }

    fn managed_threads(&self) -> Result<Vec<ManagedThread>, RuntimeError> {
        self.live("GetAllThreads")?;
        Ok(self.managed.lock().unwrap().clone())
    }

    fn dispose(&self) -> Result<(), RuntimeError> {
        self.record("DisposeEnvironment", Call::Dispose)?;
        self.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Fixed OS thread list
pub struct FixedThreads {
    pub threads: Vec<OsThread>,
    pub current: Tid,
}

impl OsThreads for FixedThreads {
    fn enumerate(&self) -> anyhow::Result<Vec<OsThread>> {
        Ok(self.threads.clone())
    }

    fn current(&self) -> Tid {
        self.current
    }
}

pub fn os_thread(tid: u32, name: Option<&str>) -> OsThread {
    OsThread { tid: Tid(tid), name: name.map(str::to_string) }
}

/// Every record in an events file
pub fn read_records(path: &Path) -> Vec<Payload> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.parse::<LogRecord>().unwrap().payload)
        .collect()
}

pub fn method_loads(records: &[Payload]) -> Vec<(u64, u64, String)> {
    records
        .iter()
        .filter_map(|record| match record {
            Payload::MethodLoad { address, length, symbol } => Some((*address, *length, symbol.clone())),
            _ => None,
        })
        .collect()
}

pub fn thread_names(records: &[Payload]) -> Vec<(u32, String)> {
    records
        .iter()
        .filter_map(|record| match record {
            Payload::Thread { kernel_id, name, .. } => Some((*kernel_id, name.clone())),
            _ => None,
        })
        .collect()
}
