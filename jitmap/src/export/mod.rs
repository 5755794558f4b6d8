//! Events file output
//!
//! The line format itself lives in `jitmap-common` so offline consumers can
//! parse what this module writes.

pub mod events_log;

pub use events_log::{Appended, EventsLog};
