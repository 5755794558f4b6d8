//! Diagnostic log contents across attach, duplicate attach and shutdown
//!
//! Kept in its own test binary: the diagnostic logger is process-wide and
//! every attach swaps its sink.

mod common;

use std::fs;
use std::sync::Arc;

use common::{os_thread, FakeVm, FixedThreads};
use jitmap::domain::Tid;
use jitmap::lifecycle::{Agent, ShutdownTrigger};
use jitmap::runtime::Runtime;

#[test]
fn test_duplicate_attach_is_reported_in_active_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_file = dir.path().join("agent.log");
    let os = FixedThreads { threads: vec![os_thread(100, Some("java"))], current: Tid(100) };
    let agent = Agent::new(Box::new(os), dir.path().join("perf-default.map"));
    let vm = Arc::new(FakeVm::new(agent.processor()).with_history());

    let options = format!(
        "events_file={},log_file={}",
        dir.path().join("events.map").display(),
        log_file.display()
    );
    let connected = Arc::clone(&vm);
    assert_eq!(
        agent.handle_invocation(Some(&options), true, move |_| Ok(connected as Arc<dyn Runtime>)),
        0
    );

    let second = format!("events_file={}", dir.path().join("other.map").display());
    let code = agent.handle_invocation(Some(&second), true, |_| Ok(Arc::clone(&vm) as Arc<dyn Runtime>));
    assert_eq!(code, 1001);

    agent.shutdown(ShutdownTrigger::Command);

    let log = fs::read_to_string(&log_file).unwrap();
    assert!(log.contains("attach count = 1"));
    assert!(log.contains("an attachment is already active"));
    assert!(log.contains("shutdown requested"));
}
