//! # Event Processing
//!
//! Handlers for the runtime's notifications, called from whatever thread
//! the runtime delivers them on. Each handler decodes or resolves what it
//! was given and appends the resulting records to the events file.
//!
//! ## Event Routing
//!
//! - Compiled method load → inline decoder → `method_load` per range
//! - Compiled method unload → resolver → `method_unload`
//! - Dynamic code generated → `method_load` with the stub name as symbol
//! - Thread start/end → thread registry → `thread`
//!
//! Handlers hold no lock across calls back into the runtime; the only
//! shared lock is the events file's, taken per record.

use std::path::{Path, PathBuf};
use std::time::Instant;

use jitmap_common::Payload;
use log::{debug, info, warn};

use super::diagnostics::{add_elapsed, AgentStats};
use super::inline_decoder::{decode, CompiledCode};
use super::thread_discovery::OsThreads;
use super::thread_registry::ThreadRegistry;
use crate::domain::{AttachError, CodeAddress, MethodId, ThreadRef};
use crate::export::{Appended, EventsLog};
use crate::lifecycle::DisposalFlag;
use crate::runtime::{Runtime, SymbolSource, ThreadNames};
use crate::symbolization::SymbolResolver;

/// Shared state of every notification handler
pub struct EventProcessor {
    events: EventsLog,
    stats: AgentStats,
    disposal: DisposalFlag,
    os: Box<dyn OsThreads>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(os: Box<dyn OsThreads>) -> Self {
        Self {
            events: EventsLog::new(),
            stats: AgentStats::default(),
            disposal: DisposalFlag::default(),
            os,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    #[must_use]
    pub fn events(&self) -> &EventsLog {
        &self.events
    }

    /// Open the configured events file, falling back to `fallback`
    ///
    /// Also re-arms symbol resolution for the new attachment.
    ///
    /// # Errors
    /// Returns `EventsFileUnavailable` if neither path can be created
    pub fn open(&self, configured: Option<&Path>, fallback: &Path) -> Result<PathBuf, AttachError> {
        let mut tried = Vec::new();
        for path in configured.into_iter().chain(std::iter::once(fallback)) {
            match self.events.open(path) {
                Ok(()) => {
                    self.disposal.clear();
                    return Ok(path.to_path_buf());
                }
                Err(err) => {
                    warn!("can't open events file {}: {err}", path.display());
                    tried.push(path.display().to_string());
                }
            }
        }
        Err(AttachError::EventsFileUnavailable { tried: tried.join(", ") })
    }

    pub fn close(&self) {
        self.events.close();
    }

    /// Make every later symbol resolution fail closed
    pub fn begin_disposal(&self) {
        self.disposal.raise();
    }

    fn write(&self, payload: Payload) {
        let started = Instant::now();
        match self.events.append(payload) {
            Ok(Appended::Written) => {}
            Ok(Appended::Closed) => AgentStats::count(&self.stats.dropped_after_close),
            Err(err) => warn!("writing events file: {err}"),
        }
        add_elapsed(&self.stats.io_nanos, started);
    }

    /// Write one `method_load` per decoded range of `unit`
    pub fn compiled_method_load(&self, source: &dyn SymbolSource, unit: &CompiledCode) {
        let started = Instant::now();
        let resolver = SymbolResolver::new(source, &self.disposal);
        decode(unit, &resolver, &self.stats, |range| {
            self.write(Payload::MethodLoad {
                address: range.start.0,
                length: range.length,
                symbol: range.symbol,
            });
        });
        add_elapsed(&self.stats.compiled_load_nanos, started);
    }

    pub fn compiled_method_unload(
        &self,
        source: &dyn SymbolSource,
        method: MethodId,
        address: CodeAddress,
    ) {
        let resolver = SymbolResolver::new(source, &self.disposal);
        let Some(symbol) = resolver.resolve(method) else {
            return;
        };
        self.write(Payload::MethodUnload { address: address.0, symbol });
    }

    /// Runtime stubs and interpreter code; the name comes with the event
    pub fn dynamic_code_generated(&self, name: &str, address: CodeAddress, length: u64) {
        self.write(Payload::MethodLoad { address: address.0, length, symbol: name.to_string() });
    }

    /// Thread start or end, delivered on the thread itself
    ///
    /// A thread that was renamed is reported again at its end with the
    /// last name.
    pub fn thread_event(&self, names: &dyn ThreadNames, thread: ThreadRef) {
        if self.disposal.is_disposing() {
            debug!("dropping thread event for {thread} during disposal");
            return;
        }
        let registry = ThreadRegistry::new(self.os.as_ref(), &self.stats);
        self.write(registry.resolve_one(names, thread).into());
    }

    /// Write one `thread` record per OS thread in the process
    pub fn write_thread_snapshot(&self, runtime: &dyn Runtime) {
        let registry = ThreadRegistry::new(self.os.as_ref(), &self.stats);
        let identities = registry.snapshot(runtime);
        info!("writing {} thread records", identities.len());
        for identity in identities {
            self.write(identity.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RuntimeError, Tid};
    use crate::profiling::inline_decoder::PcFrames;
    use crate::profiling::thread_discovery::OsThread;
    use jitmap_common::LogRecord;
    use std::fs;

    struct NoOs;

    impl OsThreads for NoOs {
        fn enumerate(&self) -> anyhow::Result<Vec<OsThread>> {
            Ok(vec![])
        }

        fn current(&self) -> Tid {
            Tid(4242)
        }
    }

    struct Symbols;

    impl SymbolSource for Symbols {
        fn method_name(&self, method: MethodId) -> Result<String, RuntimeError> {
            Ok(format!("m{}", method.0))
        }

        fn declaring_class_signature(&self, _method: MethodId) -> Result<String, RuntimeError> {
            Ok("Lorg/demo/App;".to_string())
        }
    }

    impl ThreadNames for Symbols {
        fn thread_name(&self, _thread: ThreadRef) -> Result<Option<String>, RuntimeError> {
            Ok(Some("main".to_string()))
        }
    }

    fn records(path: &Path) -> Vec<Payload> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| line.parse::<LogRecord>().unwrap().payload)
            .collect()
    }

    fn opened() -> (EventProcessor, tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.map");
        let processor = EventProcessor::new(Box::new(NoOs));
        processor.open(Some(&path), &dir.path().join("fallback.map")).unwrap();
        (processor, dir, path)
    }

    #[test]
    fn test_open_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("perf-1.map");
        let processor = EventProcessor::new(Box::new(NoOs));
        let opened = processor.open(Some(Path::new("/nonexistent/e.map")), &fallback).unwrap();
        assert_eq!(opened, fallback);
    }

    #[test]
    fn test_open_fails_when_nothing_opens() {
        let processor = EventProcessor::new(Box::new(NoOs));
        let err = processor
            .open(Some(Path::new("/nonexistent/a.map")), Path::new("/nonexistent/b.map"))
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("/nonexistent/a.map"));
    }

    #[test]
    fn test_compiled_load_inlined() {
        let (processor, _dir, path) = opened();
        let unit = CompiledCode {
            method: MethodId(1),
            address: CodeAddress(0x5000),
            length: 0x40,
            inline: Some(vec![PcFrames {
                pc: CodeAddress(0x5010),
                methods: vec![MethodId(2), MethodId(1)],
            }]),
        };
        processor.compiled_method_load(&Symbols, &unit);
        assert_eq!(
            records(&path),
            vec![
                Payload::MethodLoad {
                    address: 0x5000,
                    length: 0x10,
                    symbol: "org.demo.App.m1".into()
                },
                Payload::MethodLoad {
                    address: 0x5010,
                    length: 0x30,
                    symbol: "org.demo.App.m2->org.demo.App.m1".into()
                },
            ]
        );
    }

    #[test]
    fn test_unload_dynamic_and_thread() {
        let (processor, _dir, path) = opened();
        processor.compiled_method_unload(&Symbols, MethodId(3), CodeAddress(0x10));
        processor.dynamic_code_generated("Interpreter", CodeAddress(0x20), 4096);
        processor.thread_event(&Symbols, ThreadRef(1));
        assert_eq!(
            records(&path),
            vec![
                Payload::MethodUnload { address: 0x10, symbol: "org.demo.App.m3".into() },
                Payload::MethodLoad { address: 0x20, length: 4096, symbol: "Interpreter".into() },
                Payload::Thread { os_id: 4242, kernel_id: 4242, name: "java: main".into() },
            ]
        );
    }

    #[test]
    fn test_disposal_drops_resolved_records() {
        let (processor, _dir, path) = opened();
        processor.begin_disposal();
        processor.compiled_method_load(&Symbols, &CompiledCode::single(MethodId(1), CodeAddress(0), 8));
        processor.compiled_method_unload(&Symbols, MethodId(1), CodeAddress(0));
        processor.thread_event(&Symbols, ThreadRef(1));
        assert!(records(&path).is_empty());
    }

    #[test]
    fn test_write_after_close_counts_drop() {
        let (processor, _dir, _path) = opened();
        processor.close();
        processor.dynamic_code_generated("StubRoutines", CodeAddress(0x30), 64);
        assert_eq!(processor.stats().snapshot().dropped_after_close, 1);
        assert!(!processor.events().is_open());
    }
}
