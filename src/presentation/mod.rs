//! Presentation layer: the command-line front end.

/// Command runner.
pub mod commands;

pub use commands::{AppContext, run};
