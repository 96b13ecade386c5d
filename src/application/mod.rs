//! Application layer: the workbook host that owns a grid and drives the engine.
//!
//! All edits pass through [`Workbook`], which gates formulas on entry and
//! runs the recalculation scheduler when asked to settle.

pub mod state;

pub use state::*;
