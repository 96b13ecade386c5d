//! Infrastructure layer: configuration and grid persistence.
//!
//! Reads engine settings from TOML and moves grids between the workbook and
//! CSV or JSON files.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::*;
pub use error::*;
pub use persistence::*;
