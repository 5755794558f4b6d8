//! Attach option string parsing
//!
//! The runtime hands the agent one string, e.g.
//! `events_file=/tmp/app.map,log_file=/tmp/agent.log`. Tokens are separated
//! by commas; anything unrecognized is skipped so that newer launchers can
//! pass options older agents do not know about.

use std::path::PathBuf;

use log::debug;

/// What the invocation asks the agent to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Attach and start recording
    #[default]
    Attach,
    /// Tear down an existing attachment
    Shutdown { force: bool },
}

/// Native thread layout offsets supplied on the option string
///
/// Managed threads only get an OS id when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutOverride {
    pub thread_osthread_offset: Option<usize>,
    pub osthread_id_offset: Option<usize>,
}

/// Parsed attach options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentOptions {
    pub events_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub command: Command,
    pub layout: LayoutOverride,
}

impl AgentOptions {
    /// Parse an option string; `None` (no options given) yields the defaults
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let mut options = AgentOptions::default();

        for token in raw.unwrap_or_default().split(',').filter(|t| !t.is_empty()) {
            if let Some(path) = token.strip_prefix("events_file=") {
                options.events_file = non_empty_path(path);
            } else if let Some(path) = token.strip_prefix("log_file=") {
                options.log_file = non_empty_path(path);
            } else if let Some(value) = token.strip_prefix("thread_osthread_offset=") {
                options.layout.thread_osthread_offset = parse_offset(token, value);
            } else if let Some(value) = token.strip_prefix("osthread_id_offset=") {
                options.layout.osthread_id_offset = parse_offset(token, value);
            } else if token == "shutdown" {
                // forceshutdown wins regardless of order
                if options.command == Command::Attach {
                    options.command = Command::Shutdown { force: false };
                }
            } else if token == "forceshutdown" {
                options.command = Command::Shutdown { force: true };
            } else {
                debug!("Ignoring unknown agent option: {token}");
            }
        }

        options
    }
}

fn non_empty_path(path: &str) -> Option<PathBuf> {
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn parse_offset(token: &str, value: &str) -> Option<usize> {
    match value.parse() {
        Ok(offset) => Some(offset),
        Err(_) => {
            debug!("Ignoring agent option with invalid offset: {token}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_none_is_default_attach() {
        let options = AgentOptions::parse(None);
        assert_eq!(options, AgentOptions::default());
        assert_eq!(options.command, Command::Attach);
    }

    #[test]
    fn test_parse_files() {
        let options = AgentOptions::parse(Some("events_file=/tmp/e.map,log_file=/tmp/agent.log"));
        assert_eq!(options.events_file, Some(PathBuf::from("/tmp/e.map")));
        assert_eq!(options.log_file, Some(PathBuf::from("/tmp/agent.log")));
        assert_eq!(options.command, Command::Attach);
    }

    #[test]
    fn test_parse_shutdown_variants() {
        assert_eq!(
            AgentOptions::parse(Some("shutdown")).command,
            Command::Shutdown { force: false }
        );
        assert_eq!(
            AgentOptions::parse(Some("forceshutdown")).command,
            Command::Shutdown { force: true }
        );
        assert_eq!(
            AgentOptions::parse(Some("forceshutdown,shutdown")).command,
            Command::Shutdown { force: true }
        );
    }

    #[test]
    fn test_parse_ignores_unknown_and_empty_tokens() {
        let options = AgentOptions::parse(Some(",verbose,,events_file=,foo=bar"));
        assert_eq!(options, AgentOptions::default());
    }

    #[test]
    fn test_parse_layout_overrides() {
        let options =
            AgentOptions::parse(Some("thread_osthread_offset=296,osthread_id_offset=0x60"));
        assert_eq!(options.layout.thread_osthread_offset, Some(296));
        assert_eq!(options.layout.osthread_id_offset, None);
    }
}
