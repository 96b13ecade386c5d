//! Cell and range reference codec.
//!
//! Converts between spreadsheet-style addresses ("A1", "B2:C10") and
//! zero-based grid coordinates. Columns use bijective base-26 letters with
//! no zero digit, so 0 is "A", 25 is "Z" and 26 is "AA".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;

/// A zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn is_within(&self, rows: usize, cols: usize) -> bool {
        self.row < rows && self.col < cols
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.col), self.row as u128 + 1)
    }
}

impl FromStr for CellRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cell_ref(s).ok_or_else(|| DomainError::InvalidCellReference(s.to_string()))
    }
}

/// A rectangular block of cells, always stored with `start <= end` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRef {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl RangeRef {
    /// Builds a range from two corners given in any order.
    pub fn from_corners(a: CellRef, b: CellRef) -> Self {
        Self {
            start_row: a.row.min(b.row),
            start_col: a.col.min(b.col),
            end_row: a.row.max(b.row),
            end_col: a.col.max(b.col),
        }
    }

    pub fn start(&self) -> CellRef {
        CellRef::new(self.start_row, self.start_col)
    }

    pub fn end(&self) -> CellRef {
        CellRef::new(self.end_row, self.end_col)
    }

    pub fn is_single_cell(&self) -> bool {
        self.start_row == self.end_row && self.start_col == self.end_col
    }

    /// Whether the whole range fits inside a grid of the given size.
    pub fn is_within(&self, rows: usize, cols: usize) -> bool {
        self.end_row < rows && self.end_col < cols
    }

    /// Cells of the range in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> {
        let (start_col, end_col) = (self.start_col, self.end_col);
        (self.start_row..=self.end_row)
            .flat_map(move |row| (start_col..=end_col).map(move |col| CellRef::new(row, col)))
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&build_range_ref(self))
    }
}

impl FromStr for RangeRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s).ok_or_else(|| DomainError::InvalidCellReference(s.to_string()))
    }
}

/// Converts a zero-based column index to its letter label.
pub fn column_to_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as u128 + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Converts column letters back to a zero-based index.
///
/// Case-insensitive. Returns `None` for empty input, any non-letter, or a
/// label too long to fit in `usize`.
pub fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut acc: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}

/// Parses "A1"-style text into a zero-based position.
///
/// Letters must be followed by digits with nothing else around them. Row
/// numbers are 1-based in text, so "A0" does not name a cell.
pub fn parse_cell_ref(text: &str) -> Option<CellRef> {
    let split = text.find(|ch: char| !ch.is_ascii_alphabetic())?;
    let (letters, digits) = text.split_at(split);

    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let col = letters_to_column(letters)?;
    let row = digits.parse::<usize>().ok()?.checked_sub(1)?;
    Some(CellRef::new(row, col))
}

/// Parses "A1:B2"-style text into a normalized range.
pub fn parse_range(text: &str) -> Option<RangeRef> {
    let mut parts = text.split(':');
    let (first, second) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let a = parse_cell_ref(first)?;
    let b = parse_cell_ref(second)?;
    Some(RangeRef::from_corners(a, b))
}

pub fn build_cell_ref(row: usize, col: usize) -> String {
    CellRef::new(row, col).to_string()
}

/// Renders a range; a single-cell range renders as a bare cell reference.
pub fn build_range_ref(range: &RangeRef) -> String {
    if range.is_single_cell() {
        range.start().to_string()
    } else {
        format!("{}:{}", range.start(), range.end())
    }
}
