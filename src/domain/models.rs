use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};
use super::reference::CellRef;

/// Allowed grid dimensions, 30 rows by 15 columns unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridBounds {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            max_rows: 30,
            max_cols: 15,
        }
    }
}

impl GridBounds {
    pub fn validate(&self, rows: usize, cols: usize) -> DomainResult<()> {
        if (1..=self.max_rows).contains(&rows) && (1..=self.max_cols).contains(&cols) {
            Ok(())
        } else {
            Err(DomainError::DimensionsOutOfBounds {
                rows,
                cols,
                max_rows: self.max_rows,
                max_cols: self.max_cols,
            })
        }
    }
}

/// Read access to the value matrix as the evaluator sees it.
pub trait CellSource {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    /// Raw display text of a cell, `None` outside the stored matrix.
    fn raw_text(&self, row: usize, col: usize) -> Option<&str>;

    /// Numeric value of a cell under the coercion rule: empty, missing,
    /// non-numeric and error-sentinel text all count as zero.
    fn cell_value(&self, row: usize, col: usize) -> f64 {
        self.raw_text(row, col).map(coerce_number).unwrap_or(0.0)
    }

    /// Whether the cell shows anything once markup and whitespace are removed.
    fn has_content(&self, row: usize, col: usize) -> bool {
        self.raw_text(row, col)
            .is_some_and(|text| !strip_tags(text).trim().is_empty())
    }
}

/// A borrowed view over a value matrix.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    data: &'a [Vec<String>],
    rows: usize,
    cols: usize,
}

impl<'a> GridView<'a> {
    pub fn new(data: &'a [Vec<String>], rows: usize, cols: usize) -> Self {
        Self { data, rows, cols }
    }
}

impl CellSource for GridView<'_> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn raw_text(&self, row: usize, col: usize) -> Option<&str> {
        self.data.get(row)?.get(col).map(String::as_str)
    }
}

/// The grid's two dense matrices: display values and formulas.
///
/// A non-empty formula cell always starts with `=`; the matching value cell
/// holds its last computed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<String>>,
    pub formulas: Vec<Vec<String>>,
}

impl Grid {
    /// Creates an empty grid, checking the size against `bounds`.
    pub fn new(rows: usize, cols: usize, bounds: &GridBounds) -> DomainResult<Self> {
        bounds.validate(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            data: empty_matrix(rows, cols),
            formulas: empty_matrix(rows, cols),
        })
    }

    /// Wraps existing matrices after checking both have the declared shape.
    pub fn from_matrices(
        data: Vec<Vec<String>>,
        formulas: Vec<Vec<String>>,
        bounds: &GridBounds,
    ) -> DomainResult<Self> {
        let rows = data.len();
        let cols = data.first().map(Vec::len).unwrap_or(0);
        bounds.validate(rows, cols)?;

        check_shape("value", &data, rows, cols)?;
        check_shape("formula", &formulas, rows, cols)?;

        Ok(Self {
            rows,
            cols,
            data,
            formulas,
        })
    }

    pub fn view(&self) -> GridView<'_> {
        GridView::new(&self.data, self.rows, self.cols)
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.is_within(self.rows, self.cols)
    }

    pub fn check_cell(&self, row: usize, col: usize) -> DomainResult<CellRef> {
        let cell = CellRef::new(row, col);
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(DomainError::CellOutOfBounds(cell.to_string()))
        }
    }

    pub fn value(&self, row: usize, col: usize) -> &str {
        self.raw_text(row, col).unwrap_or("")
    }

    pub fn formula(&self, row: usize, col: usize) -> &str {
        self.formulas
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: String) -> DomainResult<()> {
        self.check_cell(row, col)?;
        self.data[row][col] = value;
        Ok(())
    }

    pub fn set_formula(&mut self, row: usize, col: usize, formula: String) -> DomainResult<()> {
        self.check_cell(row, col)?;
        self.formulas[row][col] = formula;
        Ok(())
    }

    /// Number of cells holding a formula.
    pub fn formula_count(&self) -> usize {
        self.formulas
            .iter()
            .flatten()
            .filter(|formula| !formula.is_empty())
            .count()
    }

    /// Changes the grid size, keeping the overlapping top-left region.
    ///
    /// Cells that fall outside the new size are dropped together with their formulas.
    pub fn resize(&mut self, rows: usize, cols: usize, bounds: &GridBounds) -> DomainResult<()> {
        bounds.validate(rows, cols)?;

        for matrix in [&mut self.data, &mut self.formulas] {
            matrix.resize_with(rows, Vec::new);
            for row in matrix.iter_mut() {
                row.resize_with(cols, String::new);
            }
        }

        self.rows = rows;
        self.cols = cols;
        Ok(())
    }
}

impl CellSource for Grid {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn raw_text(&self, row: usize, col: usize) -> Option<&str> {
        self.data.get(row)?.get(col).map(String::as_str)
    }
}

fn empty_matrix(rows: usize, cols: usize) -> Vec<Vec<String>> {
    vec![vec![String::new(); cols]; rows]
}

fn check_shape(
    matrix: &'static str,
    cells: &[Vec<String>],
    rows: usize,
    cols: usize,
) -> DomainResult<()> {
    if cells.len() == rows && cells.iter().all(|row| row.len() == cols) {
        Ok(())
    } else {
        Err(DomainError::ShapeMismatch { matrix, rows, cols })
    }
}

/// Coerces cell text to a number, treating anything unparseable as zero.
pub fn coerce_number(text: &str) -> f64 {
    parse_float_prefix(text).unwrap_or(0.0)
}

/// Parses the longest numeric prefix of `text`, after leading whitespace.
///
/// Mirrors the lenient prefix parse browsers apply to cell text: `"12abc"`
/// is 12, `" -3.5e2x"` is -350, `".5"` is 0.5, and `"abc"` has no value.
/// `"Infinity"` (optionally signed) parses as an infinity.
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    if s[end..].starts_with("Infinity") {
        let negative = s.starts_with('-');
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Removes `<...>` markup from cell text. An unclosed `<` is kept as text.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
