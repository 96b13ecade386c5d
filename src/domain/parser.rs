//! Recursive descent evaluator for formula token streams.
//!
//! Parsing and evaluation happen in the same pass: each grammar rule returns
//! the value of the text it consumed, so no syntax tree is built.
//!
//! # Grammar
//!
//! ```bnf
//! Expression ::= Term ( ( "+" | "-" ) Term )*
//! Term       ::= Factor ( ( "*" | "/" ) Factor )*
//! Factor     ::= ( "+" | "-" ) Factor | Number | CellRef | Call | "(" Expression ")"
//! Call       ::= Identifier "(" ArgRange ")"
//! ArgRange   ::= CellRef ( ":" CellRef )?
//! ```
//!
//! Binary operators are left-associative and `*` `/` bind tighter than `+` `-`.
//! The grammar is LL(1), so the parser never backtracks. Unary signs and
//! parentheses may nest at most [`MAX_NESTING_DEPTH`] deep; deeper input is
//! malformed.

use super::errors::CellError;
use super::lexer::{Operator, Token};
use super::models::CellSource;
use super::reference::{RangeRef, parse_cell_ref};

/// Deepest chain of unary signs and parentheses a formula may nest.
pub const MAX_NESTING_DEPTH: usize = 64;

/// What a parse does with the values it meets.
#[derive(Clone, Copy)]
pub enum Pass<'c> {
    /// Compute a value against the given grid.
    Evaluate(&'c dyn CellSource),
    /// Check grammar only. The grid is never read, division never fails and
    /// function names are not looked up.
    Check,
}

/// Built-in range aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
}

impl Aggregate {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SUM" => Some(Aggregate::Sum),
            "AVG" => Some(Aggregate::Avg),
            _ => None,
        }
    }

    /// Applies the aggregate over a range already known to be inside the grid.
    pub fn apply(&self, range: &RangeRef, source: &dyn CellSource) -> f64 {
        match self {
            Aggregate::Sum => range
                .cells()
                .map(|cell| source.cell_value(cell.row, cell.col))
                .sum(),
            Aggregate::Avg => {
                let (sum, count) = range
                    .cells()
                    .filter(|cell| source.has_content(cell.row, cell.col))
                    .fold((0.0, 0usize), |(sum, count), cell| {
                        (sum + source.cell_value(cell.row, cell.col), count + 1)
                    });
                if count == 0 { 0.0 } else { sum / count as f64 }
            }
        }
    }
}

/// Recursive descent parser that computes while it parses.
pub struct Parser<'t, 'c> {
    tokens: &'t [Token],
    position: usize,
    depth: usize,
    pass: Pass<'c>,
}

impl<'t, 'c> Parser<'t, 'c> {
    pub fn new(tokens: &'t [Token], pass: Pass<'c>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            pass,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consumes the current token if it equals `expected`.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parses the whole token stream as one expression.
    ///
    /// An empty stream and any tokens left over after the expression are
    /// both malformed.
    pub fn parse(&mut self) -> Result<f64, CellError> {
        if self.tokens.is_empty() {
            return Err(CellError::Malformed);
        }

        let value = self.parse_expression()?;

        if self.position < self.tokens.len() {
            return Err(CellError::Malformed);
        }

        Ok(value)
    }

    fn parse_expression(&mut self) -> Result<f64, CellError> {
        let mut left = self.parse_term()?;

        while let Some(Token::Operator(op @ (Operator::Add | Operator::Subtract))) = self.peek() {
            self.advance();
            let right = self.parse_term()?;
            left = match op {
                Operator::Add => left + right,
                _ => left - right,
            };
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<f64, CellError> {
        let mut left = self.parse_factor()?;

        while let Some(Token::Operator(op @ (Operator::Multiply | Operator::Divide))) = self.peek() {
            self.advance();
            let right = self.parse_factor()?;
            left = match op {
                Operator::Multiply => left * right,
                _ => self.divide(left, right)?,
            };
        }

        Ok(left)
    }

    fn divide(&self, left: f64, right: f64) -> Result<f64, CellError> {
        if right != 0.0 {
            return Ok(left / right);
        }
        match self.pass {
            Pass::Evaluate(_) => Err(CellError::DivByZero),
            Pass::Check => Ok(0.0),
        }
    }

    fn parse_factor(&mut self) -> Result<f64, CellError> {
        let Some(token) = self.peek() else {
            return Err(CellError::Malformed);
        };

        match token {
            Token::Operator(Operator::Add) => {
                self.advance();
                self.nested(Self::parse_factor)
            }
            Token::Operator(Operator::Subtract) => {
                self.advance();
                Ok(-self.nested(Self::parse_factor)?)
            }
            Token::Number(value) => {
                self.advance();
                Ok(*value)
            }
            Token::CellRef(text) => {
                self.advance();
                self.resolve_cell(text)
            }
            Token::Identifier(name) => {
                self.advance();
                self.parse_call(name)
            }
            Token::LeftParen => {
                self.advance();
                let value = self.nested(Self::parse_expression)?;
                if !self.eat(&Token::RightParen) {
                    return Err(CellError::Malformed);
                }
                Ok(value)
            }
            _ => Err(CellError::Malformed),
        }
    }

    /// Runs `rule` one nesting level deeper.
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<f64, CellError>,
    ) -> Result<f64, CellError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CellError::Malformed);
        }
        self.depth += 1;
        let value = rule(self);
        self.depth -= 1;
        value
    }

    fn resolve_cell(&self, text: &str) -> Result<f64, CellError> {
        let Pass::Evaluate(source) = self.pass else {
            return Ok(0.0);
        };

        let cell = parse_cell_ref(text).ok_or(CellError::Ref)?;
        if !cell.is_within(source.rows(), source.cols()) {
            return Err(CellError::Ref);
        }
        Ok(source.cell_value(cell.row, cell.col))
    }

    /// Parses `( ArgRange )` after a function name and applies the function.
    fn parse_call(&mut self, name: &str) -> Result<f64, CellError> {
        if !self.eat(&Token::LeftParen) {
            return Err(CellError::Malformed);
        }

        let aggregate = match self.pass {
            Pass::Evaluate(_) => Some(Aggregate::from_name(name).ok_or(CellError::Name)?),
            Pass::Check => None,
        };

        let first = self.expect_cell_ref()?;
        let second = if self.eat(&Token::Colon) {
            self.expect_cell_ref()?
        } else {
            first
        };

        if !self.eat(&Token::RightParen) {
            return Err(CellError::Malformed);
        }

        let (Some(aggregate), Pass::Evaluate(source)) = (aggregate, self.pass) else {
            return Ok(0.0);
        };

        let start = parse_cell_ref(first).ok_or(CellError::Name)?;
        let end = parse_cell_ref(second).ok_or(CellError::Name)?;
        let range = RangeRef::from_corners(start, end);

        if !range.is_within(source.rows(), source.cols()) {
            return Err(CellError::Ref);
        }

        Ok(aggregate.apply(&range, source))
    }

    fn expect_cell_ref(&mut self) -> Result<&'t str, CellError> {
        match self.peek() {
            Some(Token::CellRef(text)) => {
                self.advance();
                Ok(text.as_str())
            }
            _ => Err(CellError::Name),
        }
    }
}

/// Evaluates a token stream against a grid.
pub fn evaluate_tokens(tokens: &[Token], source: &dyn CellSource) -> Result<f64, CellError> {
    Parser::new(tokens, Pass::Evaluate(source)).parse()
}

/// Checks that a token stream forms one complete expression.
pub fn check_structure(tokens: &[Token]) -> Result<(), CellError> {
    Parser::new(tokens, Pass::Check).parse().map(|_| ())
}
