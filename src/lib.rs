//! gridcalc - spreadsheet formula engine
//!
//! A small formula language over a fixed-size grid of text cells: A1-style
//! references, arithmetic, `SUM`/`AVG` ranges and spreadsheet error
//! sentinels, recalculated to a fixpoint after every edit.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
