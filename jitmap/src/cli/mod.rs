//! Agent option handling

pub mod options;

pub use options::{AgentOptions, Command, LayoutOverride};
