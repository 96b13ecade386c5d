//! Workbook state: the host's single edit path into the engine.
//!
//! Every change to the grid goes through [`Workbook`], which applies the
//! formula validity gate on the way in, keeps an undo history of cell edits
//! and tracks whether the grid still needs a recalculation.

use std::collections::VecDeque;

use crate::domain::{
    CellRef, DomainError, DomainResult, FormulaEvaluator, Grid, GridBounds, RecalcReport,
    recalculate,
};

const MAX_UNDO_STACK_SIZE: usize = 100;

/// Recalculation state of a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcState {
    /// Every formula value reflects the current grid.
    Idle,
    /// Cells or the grid size changed since the last recalculation.
    Converging,
}

/// Contents of one cell: its display value and its formula (empty if none).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellContent {
    pub value: String,
    pub formula: String,
}

/// Represents an action that can be undone/redone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    CellModified {
        row: usize,
        col: usize,
        old_cell: CellContent,
        new_cell: CellContent,
    },
}

/// Tally of a paste or import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Cells written inside the grid.
    pub cells: usize,
    /// Cells stored as live formulas.
    pub formulas: usize,
    /// `=` text that failed the gate and was stored as plain text.
    pub rejected_formulas: usize,
    /// Cells that fell outside the grid.
    pub dropped: usize,
}

/// A grid together with its evaluator, edit history and recalculation state.
///
/// # Examples
///
/// ```
/// use gridcalc::application::{RecalcState, Workbook};
/// use gridcalc::domain::{FormulaEvaluator, GridBounds};
///
/// let mut book = Workbook::new(3, 3, GridBounds::default(), FormulaEvaluator::default()).unwrap();
/// book.set_cell_input(0, 0, "4").unwrap();
/// book.set_cell_input(0, 1, "=A1*2").unwrap();
/// assert_eq!(book.state(), RecalcState::Converging);
///
/// book.settle();
/// assert_eq!(book.grid().value(0, 1), "8");
/// assert_eq!(book.state(), RecalcState::Idle);
/// ```
#[derive(Debug, Clone)]
pub struct Workbook {
    grid: Grid,
    bounds: GridBounds,
    evaluator: FormulaEvaluator,
    state: RecalcState,
    undo_stack: VecDeque<UndoAction>,
    redo_stack: VecDeque<UndoAction>,
}

impl Workbook {
    /// Creates an empty workbook of the given size.
    pub fn new(
        rows: usize,
        cols: usize,
        bounds: GridBounds,
        evaluator: FormulaEvaluator,
    ) -> DomainResult<Self> {
        let grid = Grid::new(rows, cols, &bounds)?;
        Ok(Self::with_grid(grid, bounds, evaluator))
    }

    /// Adopts a grid decoded from elsewhere.
    ///
    /// Formulas that fail the validity gate are demoted to plain text in the
    /// value matrix, so nothing unvetted is ever evaluated.
    pub fn from_grid(
        grid: Grid,
        bounds: GridBounds,
        evaluator: FormulaEvaluator,
    ) -> DomainResult<Self> {
        let mut grid = Grid::from_matrices(grid.data, grid.formulas, &bounds)?;

        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let formula = &grid.formulas[row][col];
                if formula.is_empty() || evaluator.is_valid_formula(formula) {
                    continue;
                }
                tracing::debug!(
                    cell = %CellRef::new(row, col),
                    formula = %formula,
                    "demoting formula that fails the validity gate"
                );
                grid.data[row][col] = std::mem::take(&mut grid.formulas[row][col]);
            }
        }

        Ok(Self::with_grid(grid, bounds, evaluator))
    }

    fn with_grid(grid: Grid, bounds: GridBounds, evaluator: FormulaEvaluator) -> Self {
        let state = if grid.formula_count() > 0 {
            RecalcState::Converging
        } else {
            RecalcState::Idle
        };

        Self {
            grid,
            bounds,
            evaluator,
            state,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }

    pub fn bounds(&self) -> &GridBounds {
        &self.bounds
    }

    pub fn evaluator(&self) -> &FormulaEvaluator {
        &self.evaluator
    }

    pub fn state(&self) -> RecalcState {
        self.state
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> CellContent {
        CellContent {
            value: self.grid.value(row, col).to_string(),
            formula: self.grid.formula(row, col).to_string(),
        }
    }

    /// Classifies raw input text into cell contents via the validity gate.
    fn classify_input(&self, text: &str) -> CellContent {
        if text.starts_with('=') && self.evaluator.is_valid_formula(text) {
            CellContent {
                value: String::new(),
                formula: text.to_string(),
            }
        } else {
            if text.starts_with('=') {
                tracing::debug!(text, "input failed the formula gate, storing as text");
            }
            CellContent {
                value: text.to_string(),
                formula: String::new(),
            }
        }
    }

    /// Writes typed input into a cell and records it for undo.
    ///
    /// Text accepted by the validity gate becomes a live formula; anything
    /// else is stored as plain text and clears a previous formula.
    pub fn set_cell_input(&mut self, row: usize, col: usize, text: &str) -> DomainResult<()> {
        self.grid.check_cell(row, col)?;
        let new_cell = self.classify_input(text);
        self.replace_cell_with_undo(row, col, new_cell)
    }

    /// Empties a cell and records it for undo.
    pub fn clear_cell(&mut self, row: usize, col: usize) -> DomainResult<()> {
        self.grid.check_cell(row, col)?;
        self.replace_cell_with_undo(row, col, CellContent::default())
    }

    fn replace_cell_with_undo(
        &mut self,
        row: usize,
        col: usize,
        new_cell: CellContent,
    ) -> DomainResult<()> {
        let old_cell = self.cell(row, col);
        if old_cell == new_cell {
            return Ok(());
        }

        self.apply_cell(row, col, new_cell.clone())?;
        self.record_action(UndoAction::CellModified {
            row,
            col,
            old_cell,
            new_cell,
        });
        Ok(())
    }

    fn apply_cell(&mut self, row: usize, col: usize, cell: CellContent) -> DomainResult<()> {
        self.grid.set_value(row, col, cell.value)?;
        self.grid.set_formula(row, col, cell.formula)?;
        self.state = RecalcState::Converging;
        Ok(())
    }

    /// Pastes a block of raw text with its top-left corner at `origin`.
    ///
    /// Each cell goes through the validity gate. Cells beyond the grid are
    /// dropped. A paste starts a new edit history.
    pub fn import_rows(&mut self, origin: CellRef, rows: &[Vec<String>]) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for (dr, line) in rows.iter().enumerate() {
            for (dc, text) in line.iter().enumerate() {
                let target = origin
                    .row
                    .checked_add(dr)
                    .zip(origin.col.checked_add(dc))
                    .map(|(row, col)| CellRef::new(row, col))
                    .filter(|cell| self.grid.contains(*cell));
                let Some(CellRef { row, col }) = target else {
                    summary.dropped += 1;
                    continue;
                };

                let cell = self.classify_input(text);
                if !cell.formula.is_empty() {
                    summary.formulas += 1;
                } else if text.starts_with('=') {
                    summary.rejected_formulas += 1;
                }

                self.grid.data[row][col] = cell.value;
                self.grid.formulas[row][col] = cell.formula;
                summary.cells += 1;
            }
        }

        if summary.dropped > 0 {
            tracing::debug!(dropped = summary.dropped, "import cells fell outside the grid");
        }

        self.undo_stack.clear();
        self.redo_stack.clear();
        if summary.cells > 0 {
            self.state = RecalcState::Converging;
        }
        summary
    }

    /// Changes the grid size, dropping cells outside the new bounds.
    pub fn resize(&mut self, rows: usize, cols: usize) -> DomainResult<()> {
        self.grid.resize(rows, cols, &self.bounds)?;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = RecalcState::Converging;
        Ok(())
    }

    /// Records an action for undo/redo functionality.
    ///
    /// Adds the action to the undo stack and clears the redo stack.
    fn record_action(&mut self, action: UndoAction) {
        self.undo_stack.push_back(action);
        if self.undo_stack.len() > MAX_UNDO_STACK_SIZE {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Reverts the last cell edit.
    pub fn undo(&mut self) -> DomainResult<()> {
        let action = self.undo_stack.pop_back().ok_or(DomainError::NothingToUndo)?;
        let UndoAction::CellModified { row, col, old_cell, .. } = action.clone();
        self.apply_cell(row, col, old_cell)?;
        self.redo_stack.push_back(action);
        Ok(())
    }

    /// Reapplies the last undone cell edit.
    pub fn redo(&mut self) -> DomainResult<()> {
        let action = self.redo_stack.pop_back().ok_or(DomainError::NothingToRedo)?;
        let UndoAction::CellModified { row, col, new_cell, .. } = action.clone();
        self.apply_cell(row, col, new_cell)?;
        self.undo_stack.push_back(action);
        Ok(())
    }

    /// Recalculates if anything changed since the last run.
    ///
    /// Returns the report of the run, or `None` when the workbook was idle.
    pub fn settle(&mut self) -> Option<RecalcReport> {
        if self.state == RecalcState::Idle {
            return None;
        }

        let Grid {
            rows,
            cols,
            data,
            formulas,
        } = &mut self.grid;
        let report = recalculate(&self.evaluator, formulas, data, *rows, *cols);

        self.state = RecalcState::Idle;
        Some(report)
    }

    /// Evaluates a formula against the current values without storing it.
    pub fn evaluate(&self, formula: &str) -> String {
        self.evaluator.evaluate_formula(formula, &self.grid)
    }
}
