//! Counters for agent overhead
//!
//! Independent atomics, updated with relaxed ordering from every
//! notification thread. Values are approximate under race and carry no
//! correctness obligation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::info;

/// Accumulated counts and time spent in agent code
#[derive(Debug, Default)]
pub struct AgentStats {
    /// Entries written for whole, non-inlined units
    pub single_entries: AtomicU64,
    /// Entries written for sub-ranges of inlined units
    pub unfolded_entries: AtomicU64,
    /// Records that arrived after the events file was closed
    pub dropped_after_close: AtomicU64,
    pub io_nanos: AtomicU64,
    pub single_nanos: AtomicU64,
    pub unfolded_nanos: AtomicU64,
    pub scan_nanos: AtomicU64,
    pub compiled_load_nanos: AtomicU64,
    pub snapshot_nanos: AtomicU64,
}

/// Point-in-time copy of [`AgentStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub single_entries: u64,
    pub unfolded_entries: u64,
    pub dropped_after_close: u64,
    pub io: Duration,
    pub single: Duration,
    pub unfolded: Duration,
    pub scan: Duration,
    pub compiled_load: Duration,
    pub snapshot: Duration,
}

/// Add the time elapsed since `start` to `counter`
pub fn add_elapsed(counter: &AtomicU64, start: Instant) {
    let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
    counter.fetch_add(nanos, Ordering::Relaxed);
}

fn millis(duration: Duration) -> u128 {
    duration.as_millis()
}

impl AgentStats {
    pub fn count(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            single_entries: load(&self.single_entries),
            unfolded_entries: load(&self.unfolded_entries),
            dropped_after_close: load(&self.dropped_after_close),
            io: Duration::from_nanos(load(&self.io_nanos)),
            single: Duration::from_nanos(load(&self.single_nanos)),
            unfolded: Duration::from_nanos(load(&self.unfolded_nanos)),
            scan: Duration::from_nanos(load(&self.scan_nanos)),
            compiled_load: Duration::from_nanos(load(&self.compiled_load_nanos)),
            snapshot: Duration::from_nanos(load(&self.snapshot_nanos)),
        }
    }

    /// Log everything, plus how long the replay request itself took
    pub fn log_replay_summary(&self, replay: Duration) {
        let s = self.snapshot();
        info!("single = {}", s.single_entries);
        info!("unfolded = {}", s.unfolded_entries);
        info!("total load events = {} ms", millis(replay));
        info!("single_time = {} ms", millis(s.single));
        info!("unfolded_time = {} ms", millis(s.unfolded));
        info!("loop_time = {} ms", millis(s.scan));
        info!("cb_compiled_time = {} ms", millis(s.compiled_load));
    }

    /// Log the totals reported at shutdown and start over from zero
    pub fn log_totals_and_reset(&self) {
        let s = self.snapshot();
        info!("total time in compiled load handler: {} ms", millis(s.compiled_load));
        info!("total time in thread snapshot code: {} ms", millis(s.snapshot));
        info!("total time in agent IO code: {} ms", millis(s.io));
        if s.dropped_after_close > 0 {
            info!("records dropped after close: {}", s.dropped_after_close);
        }
        self.reset();
    }

    pub fn reset(&self) {
        for counter in [
            &self.single_entries,
            &self.unfolded_entries,
            &self.dropped_after_close,
            &self.io_nanos,
            &self.single_nanos,
            &self.unfolded_nanos,
            &self.scan_nanos,
            &self.compiled_load_nanos,
            &self.snapshot_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
