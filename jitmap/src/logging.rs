//! Diagnostic log sink
//!
//! `log` allows one global logger per process, but the agent can be
//! attached, shut down and attached again, each time with a different
//! `log_file`. A forwarding logger is installed once; every attach builds a
//! fresh `env_logger` behind it and every shutdown drops it, which closes
//! the file.
//!
//! Filter defaults: `info` when writing to a file, `warn` on stderr.
//! `JITMAP_LOG` overrides either, using `env_logger` filter syntax.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Once, PoisonError, RwLock, RwLockReadGuard};

use env_logger::{Builder, Env, Logger, Target};
use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the filter override
pub const LOG_ENV: &str = "JITMAP_LOG";

struct Forwarder {
    inner: RwLock<Option<Logger>>,
}

static FORWARDER: Forwarder = Forwarder { inner: RwLock::new(None) };
static INSTALL: Once = Once::new();

impl Forwarder {
    fn current(&self) -> RwLockReadGuard<'_, Option<Logger>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, logger: Option<Logger>) -> Option<Logger> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *inner, logger)
    }
}

impl Log for Forwarder {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.current().as_ref().is_some_and(|logger| logger.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        if let Some(logger) = self.current().as_ref() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        if let Some(logger) = self.current().as_ref() {
            logger.flush();
        }
    }
}

/// Where diagnostics are going for the current attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticSink {
    File(PathBuf),
    Stderr,
}

fn builder(default_level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(default_level)
        .format_timestamp_millis()
        .parse_env(Env::new().filter(LOG_ENV));
    builder
}

/// Start diagnostics for a new attachment
///
/// An unopenable `log_file` falls back to stderr; diagnostics are never a
/// reason to fail an attach.
pub fn open(log_file: Option<&Path>) -> DiagnosticSink {
    INSTALL.call_once(|| {
        if let Err(err) = log::set_logger(&FORWARDER) {
            eprintln!("jitmap: diagnostic logger not installed: {err}");
        }
    });

    let mut fallback_reason = None;
    let (logger, sink) = match log_file.map(|path| (path, File::create(path))) {
        Some((path, Ok(file))) => {
            let logger = builder(LevelFilter::Info).target(Target::Pipe(Box::new(file))).build();
            (logger, DiagnosticSink::File(path.to_path_buf()))
        }
        other => {
            if let Some((path, Err(err))) = other {
                fallback_reason = Some(format!("can't open log file {}: {err}", path.display()));
            }
            let logger = builder(LevelFilter::Warn).target(Target::Stderr).build();
            (logger, DiagnosticSink::Stderr)
        }
    };

    log::set_max_level(logger.filter());
    if let Some(previous) = FORWARDER.replace(Some(logger)) {
        previous.flush();
    }
    if let Some(reason) = fallback_reason {
        log::warn!("{reason}, logging to stderr");
    }
    sink
}

/// Flush and drop the current sink
pub fn close() {
    if let Some(logger) = FORWARDER.replace(None) {
        logger.flush();
    }
    log::set_max_level(LevelFilter::Off);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_open_falls_back_to_stderr() {
        let sink = open(Some(Path::new("/nonexistent-dir/agent.log")));
        assert_eq!(sink, DiagnosticSink::Stderr);
        assert_eq!(open(None), DiagnosticSink::Stderr);
    }

    #[test]
    fn test_open_file_sink_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        let sink = open(Some(&path));
        assert_eq!(sink, DiagnosticSink::File(path.clone()));
        // Other tests swap the sink concurrently, so only the file's
        // existence is stable here
        close();
        assert!(fs::metadata(&path).is_ok());
    }
}
