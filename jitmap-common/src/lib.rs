//! # Shared Record Format (Agent ↔ Consumers)
//!
//! Defines the line-oriented record format written by the `jitmap` agent and
//! read back by offline consumers (profilers that translate raw program
//! counters into frames and thread ids into names).
//!
//! ## Line Formats
//!
//! One record per line, space-delimited, fields in order:
//!
//! ```text
//! <epoch-ms> method_load: 0x<hex-address> <decimal-length> <symbol-or-chain>
//! <epoch-ms> method_unload: 0x<hex-address> <symbol>
//! <epoch-ms> thread: <decimal-os-id> 0x<hex-kernel-id> <display-name>
//! ```
//!
//! The last field of every kind is free text and may contain spaces
//! (`C2 CompilerThread0`, `Interpreter`), so parsing splits only the leading
//! fields.
//!
//! ## Key Types
//!
//! - [`LogRecord`] - one timestamped line
//! - [`Payload`] - the kind-specific fields of a line
//! - [`RecordKind`] - the tag that follows the timestamp

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// Text Constants
// ============================================================================

/// Separator between the frames of an inlined symbol chain (innermost first)
pub const CHAIN_SEPARATOR: &str = "->";

/// Display-name prefix for threads the managed runtime knows about
pub const JAVA_THREAD_PREFIX: &str = "java: ";

/// Display-name prefix for threads only the operating system knows about
pub const NATIVE_THREAD_PREFIX: &str = "native: ";

// ============================================================================
// Record Types
// ============================================================================

/// Kind tag of a record line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordKind {
    MethodLoad,
    MethodUnload,
    Thread,
}

impl RecordKind {
    /// Tag as written in the line, without the trailing colon
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            RecordKind::MethodLoad => "method_load",
            RecordKind::MethodUnload => "method_unload",
            RecordKind::Thread => "thread",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "method_load" => Some(RecordKind::MethodLoad),
            "method_unload" => Some(RecordKind::MethodUnload),
            "thread" => Some(RecordKind::Thread),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind-specific fields of a record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Payload {
    /// A range of compiled code became valid
    ///
    /// `symbol` is either `Class.method` or an inlined chain
    /// `inner.method->...->outer.method`.
    MethodLoad { address: u64, length: u64, symbol: String },

    /// Compiled code starting at `address` was discarded
    MethodUnload { address: u64, symbol: String },

    /// Identity of one operating-system thread
    ///
    /// `name` carries the [`JAVA_THREAD_PREFIX`] or [`NATIVE_THREAD_PREFIX`].
    Thread { os_id: u64, kernel_id: u32, name: String },
}

impl Payload {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Payload::MethodLoad { .. } => RecordKind::MethodLoad,
            Payload::MethodUnload { .. } => RecordKind::MethodUnload,
            Payload::Thread { .. } => RecordKind::Thread,
        }
    }
}

/// One line of the events file
///
/// `timestamp_ms` is wall-clock time at write, in milliseconds since the
/// Unix epoch. Lines are ordered by write, not by when the runtime produced
/// the underlying event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogRecord {
    pub timestamp_ms: u64,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: Payload,
}

impl LogRecord {
    #[must_use]
    pub fn new(timestamp_ms: u64, payload: Payload) -> Self {
        Self { timestamp_ms, payload }
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.payload.kind()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: ", self.timestamp_ms, self.kind())?;
        match &self.payload {
            Payload::MethodLoad { address, length, symbol } => {
                write!(f, "0x{address:x} {length} {symbol}")
            }
            Payload::MethodUnload { address, symbol } => write!(f, "0x{address:x} {symbol}"),
            Payload::Thread { os_id, kernel_id, name } => {
                write!(f, "{os_id} 0x{kernel_id:x} {name}")
            }
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Error returned when a line does not match any record format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unknown record kind `{0}`")]
    UnknownKind(String),

    #[error("invalid number in field `{field}`: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

fn next_field<'a>(rest: &mut &'a str, name: &'static str) -> Result<&'a str, ParseError> {
    let (field, tail) = rest.split_once(' ').ok_or(ParseError::MissingField(name))?;
    *rest = tail;
    Ok(field)
}

fn decimal<T: FromStr>(value: &str, field: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber { field, value: value.to_string() })
}

fn hex(value: &str, field: &'static str) -> Result<u64, ParseError> {
    value
        .strip_prefix("0x")
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| ParseError::InvalidNumber { field, value: value.to_string() })
}

impl FromStr for LogRecord {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let timestamp_ms = decimal(next_field(&mut rest, "timestamp")?, "timestamp")?;
        let tag = next_field(&mut rest, "kind")?;
        let kind = tag
            .strip_suffix(':')
            .and_then(RecordKind::from_tag)
            .ok_or_else(|| ParseError::UnknownKind(tag.to_string()))?;

        let payload = match kind {
            RecordKind::MethodLoad => {
                let address = hex(next_field(&mut rest, "address")?, "address")?;
                let length = decimal(next_field(&mut rest, "length")?, "length")?;
                Payload::MethodLoad { address, length, symbol: rest.to_string() }
            }
            RecordKind::MethodUnload => {
                let address = hex(next_field(&mut rest, "address")?, "address")?;
                Payload::MethodUnload { address, symbol: rest.to_string() }
            }
            RecordKind::Thread => {
                let os_id = decimal(next_field(&mut rest, "os_id")?, "os_id")?;
                let kernel_field = next_field(&mut rest, "kernel_id")?;
                let kernel_id = u32::try_from(hex(kernel_field, "kernel_id")?).map_err(|_| {
                    ParseError::InvalidNumber { field: "kernel_id", value: kernel_field.to_string() }
                })?;
                Payload::Thread { os_id, kernel_id, name: rest.to_string() }
            }
        };

        Ok(LogRecord { timestamp_ms, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_load_format() {
        let record = LogRecord::new(
            1_700_000_000_123,
            Payload::MethodLoad {
                address: 0x7f3a_1000_0040,
                length: 200,
                symbol: "com.acme.Foo.bar".to_string(),
            },
        );
        assert_eq!(record.to_string(), "1700000000123 method_load: 0x7f3a10000040 200 com.acme.Foo.bar");
    }

    #[test]
    fn test_method_unload_format() {
        let record = LogRecord::new(
            42,
            Payload::MethodUnload { address: 0xdead, symbol: "java.lang.String.hashCode".to_string() },
        );
        assert_eq!(record.to_string(), "42 method_unload: 0xdead java.lang.String.hashCode");
    }

    #[test]
    fn test_thread_format() {
        let record = LogRecord::new(
            7,
            Payload::Thread { os_id: 4321, kernel_id: 0x10e3, name: "java: main".to_string() },
        );
        assert_eq!(record.to_string(), "7 thread: 4321 0x10e3 java: main");
    }

    #[test]
    fn test_parse_chain_with_spaces_in_last_field() {
        let record: LogRecord =
            "9 method_load: 0x1000 64 a.B.inner->a.B.outer".parse().expect("valid line");
        assert_eq!(
            record.payload,
            Payload::MethodLoad { address: 0x1000, length: 64, symbol: "a.B.inner->a.B.outer".into() }
        );

        let record: LogRecord = "9 thread: 17 0x11 java: C2 CompilerThread0\n".parse().unwrap();
        assert_eq!(
            record.payload,
            Payload::Thread { os_id: 17, kernel_id: 0x11, name: "java: C2 CompilerThread0".into() }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert_eq!("".parse::<LogRecord>(), Err(ParseError::MissingField("timestamp")));
        assert_eq!(
            "1 method_loaded: 0x1 2 x".parse::<LogRecord>(),
            Err(ParseError::UnknownKind("method_loaded:".into()))
        );
        assert!(matches!(
            "1 method_load: 1000 2 x".parse::<LogRecord>(),
            Err(ParseError::InvalidNumber { field: "address", .. })
        ));
        assert_eq!("1 method_unload: 0x10".parse::<LogRecord>(), Err(ParseError::MissingField("address")));
    }

    #[test]
    fn test_display_then_parse_keeps_fields() {
        let record = LogRecord::new(
            1,
            Payload::Thread { os_id: 99, kernel_id: u32::MAX, name: "native: 99".into() },
        );
        assert_eq!(record.to_string().parse::<LogRecord>(), Ok(record));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json_shape() {
        let record = LogRecord::new(
            5,
            Payload::MethodUnload { address: 16, symbol: "p.C.m".to_string() },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "method_unload");
        assert_eq!(json["timestamp_ms"], 5);
        assert_eq!(json["symbol"], "p.C.m");
    }
}
