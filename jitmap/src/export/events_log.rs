//! Serialized writer for the events file
//!
//! Every record is formatted, written and flushed under one mutex, so
//! lines from concurrent notification threads never interleave and appear
//! in lock-acquisition order. Timestamps are taken under the lock, at
//! write time.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use jitmap_common::{LogRecord, Payload};

use crate::domain::Timestamp;

type Destination = Box<dyn Write + Send>;

/// Outcome of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Written,
    /// No destination is open; the record was discarded
    Closed,
}

/// The single append-only sink for `method_load`, `method_unload` and
/// `thread` records
#[derive(Default)]
pub struct EventsLog {
    destination: Mutex<Option<Destination>>,
}

impl EventsLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Destination>> {
        // A panic while holding the lock leaves at worst a partial line
        self.destination.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create or truncate `path` and make it the destination
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        *self.lock() = Some(Box::new(file));
        Ok(())
    }

    /// Flush and drop the destination; later appends are discarded
    pub fn close(&self) {
        if let Some(mut destination) = self.lock().take() {
            if let Err(err) = destination.flush() {
                log::warn!("flushing events file on close: {err}");
            }
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Timestamp, write and flush one record
    ///
    /// # Errors
    /// Returns an error if writing or flushing fails
    pub fn append(&self, payload: Payload) -> io::Result<Appended> {
        let mut guard = self.lock();
        let Some(destination) = guard.as_mut() else {
            return Ok(Appended::Closed);
        };
        let record = LogRecord::new(Timestamp::now().0, payload);
        writeln!(destination, "{record}")?;
        destination.flush()?;
        Ok(Appended::Written)
    }
}
