//! Fixpoint recalculation over the whole grid.
//!
//! Instead of ordering formulas by their dependencies, the scheduler sweeps
//! every formula cell row by row and repeats the sweep until one pass
//! changes nothing. Each evaluation reads the live value matrix, so a value
//! written earlier in a pass is already visible to cells later in the same
//! pass. The number of passes is capped at the cell count. A circular chain
//! that never settles stops there with its last values in place. So does an
//! acyclic chain exactly as deep as the cap: its values are final, but no
//! pass was left to confirm it.

use serde::Serialize;

use super::models::GridView;
use super::services::FormulaEvaluator;

/// Outcome of one [`recalculate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecalcReport {
    /// Sweeps performed, including the final clean one.
    pub passes: usize,
    /// Cell writes across all sweeps.
    pub cells_changed: usize,
    /// Whether a sweep that changed nothing confirmed the grid is stable.
    ///
    /// `false` means the pass cap was reached while cells were still
    /// changing. That is always the case for a cycle, and also for an
    /// acyclic chain whose depth equals the cap.
    pub converged: bool,
}

/// Recomputes every formula cell in place until the grid stops changing.
///
/// `formulas` and `data` are `rows x cols` matrices; cells missing from a
/// short row are treated as empty and never written.
pub fn recalculate(
    evaluator: &FormulaEvaluator,
    formulas: &[Vec<String>],
    data: &mut [Vec<String>],
    rows: usize,
    cols: usize,
) -> RecalcReport {
    let max_passes = rows.saturating_mul(cols);
    let mut report = RecalcReport::default();

    while report.passes < max_passes {
        report.passes += 1;
        let changed = sweep(evaluator, formulas, data, rows, cols);
        report.cells_changed += changed;

        if changed == 0 {
            report.converged = true;
            break;
        }
    }

    if report.converged {
        tracing::debug!(
            passes = report.passes,
            cells_changed = report.cells_changed,
            "recalculation converged"
        );
    } else {
        tracing::warn!(
            passes = report.passes,
            cells_changed = report.cells_changed,
            "recalculation hit the pass limit with cells still changing"
        );
    }

    report
}

/// Runs one row-major pass and returns how many cells it rewrote.
fn sweep(
    evaluator: &FormulaEvaluator,
    formulas: &[Vec<String>],
    data: &mut [Vec<String>],
    rows: usize,
    cols: usize,
) -> usize {
    let mut changed = 0;

    for row in 0..rows {
        for col in 0..cols {
            let Some(formula) = formulas.get(row).and_then(|r| r.get(col)) else {
                continue;
            };
            if formula.is_empty() || evaluator.is_visual_formula(formula) {
                continue;
            }

            let value = evaluator.evaluate_formula(formula, &GridView::new(data, rows, cols));

            let Some(slot) = data.get_mut(row).and_then(|r| r.get_mut(col)) else {
                continue;
            };
            if *slot != value {
                tracing::trace!(row, col, %value, "cell value changed");
                *slot = value;
                changed += 1;
            }
        }
    }

    changed
}
