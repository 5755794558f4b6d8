//! Symbol resolution for compiled methods
//!
//! Turns opaque method handles into `Class.method` strings using the
//! runtime's metadata queries.

pub mod descriptor;
pub mod resolver;

pub use descriptor::{class_name_from_descriptor, qualified_method_name};
pub use resolver::SymbolResolver;
