use thiserror::Error;

/// A failed computation, stored in the value matrix as its sentinel text.
///
/// The `Display` output of each variant is exactly the sentinel the host
/// writes into the cell, so `err.to_string()` is the cell's display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CellError {
    /// Division by a divisor that evaluated to zero.
    #[error("#DIV/0!")]
    DivByZero,
    /// A cell or range reference outside the grid, or one that cannot be resolved.
    #[error("#REF!")]
    Ref,
    /// An unknown function name or a malformed function argument.
    #[error("#NAME?")]
    Name,
    /// A malformed expression or a tokenization failure.
    #[error("#ERROR!")]
    Malformed,
}

impl CellError {
    pub const ALL: [CellError; 4] = [
        CellError::DivByZero,
        CellError::Ref,
        CellError::Name,
        CellError::Malformed,
    ];

    pub fn sentinel(&self) -> &'static str {
        match self {
            CellError::DivByZero => "#DIV/0!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Malformed => "#ERROR!",
        }
    }

    /// Recognizes a sentinel previously written into a cell.
    pub fn from_sentinel(text: &str) -> Option<CellError> {
        Self::ALL.into_iter().find(|err| err.sentinel() == text)
    }
}

/// Lexing failures. Evaluation reports these as [`CellError::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),
}

/// Failures on the host edit path and grid construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Grid size {rows}x{cols} is outside the allowed 1..={max_rows} x 1..={max_cols}")]
    DimensionsOutOfBounds {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    #[error("{matrix} matrix has shape that does not match {rows}x{cols}")]
    ShapeMismatch {
        matrix: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("Cell {0} is outside the grid")]
    CellOutOfBounds(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type DomainResult<T> = Result<T, DomainError>;
