//! Presentation layer: the command-line interface and grid rendering.

pub mod cli;
pub mod output;

pub use cli::*;
pub use output::*;
