//! # jitmap - JIT Code Map Agent for the JVM
//!
//! jitmap is an in-process JVMTI agent that records where the JIT put each
//! compiled method, including the methods it inlined, plus a map from
//! kernel thread ids to thread names. Native profilers (`perf` and
//! friends) read the resulting events file to symbolize samples that land
//! in JIT-compiled code.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Java VM                                │
//! │   compiled load/unload · dynamic code · thread start/end · init │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ JVMTI notifications (any thread)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    jitmap (This Crate)                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │     jvm      │──▶│    Event     │──▶│  Events Log  │         │
//! │  │ (callbacks)  │   │  Processor   │   │ (perf map)   │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │         ▲                  │                                    │
//! │         │           ┌──────┴───────┐   ┌──────────────┐         │
//! │  ┌──────┴───────┐   │   Inline     │   │   Thread     │         │
//! │  │  Lifecycle   │   │   Decoder    │   │   Registry   │         │
//! │  │  Controller  │   └──────┬───────┘   └──────────────┘         │
//! │  └──────────────┘          ▼                                    │
//! │                     ┌──────────────┐                            │
//! │                     │  Symbol      │                            │
//! │                     │  Resolver    │                            │
//! │                     └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`profiling`]: notification handling, inline decoding, thread identity,
//!   overhead counters
//! - [`symbolization`]: method handles to `package.Class.method` names
//! - [`export`]: the events file writer
//! - [`lifecycle`]: attach, replay and teardown state machine
//! - [`jvm`]: JNI/JVMTI bindings, callbacks and library entry points
//! - [`runtime`]: the traits the core sees the VM through
//! - [`cli`]: attach option string
//! - [`logging`]: diagnostic log sink
//! - [`domain`]: newtypes, errors and exit codes
//!
//! ## Typical Usage
//!
//! ```bash
//! # At VM start
//! java -agentpath:/path/to/libjitmap.so=events_file=/tmp/app.map -jar app.jar
//!
//! # Into a running VM
//! jcmd <PID> JVMTI.agent_load /path/to/libjitmap.so events_file=/tmp/app.map
//!
//! # Stop recording
//! jcmd <PID> JVMTI.agent_load /path/to/libjitmap.so shutdown
//! ```

pub mod cli;
pub mod domain;
pub mod export;
pub mod jvm;
pub mod lifecycle;
pub mod logging;
pub mod profiling;
pub mod runtime;
pub mod symbolization;
