//! Tokenizer for formula bodies.
//!
//! Turns the text after a formula's leading `=` into a flat token stream in
//! one forward pass. Cell references and function names share the letter
//! class and are told apart only by a digit run directly after the letters:
//! `A1` is a reference, `SUM` is an identifier, and `SUM1` is a reference.

use std::fmt;

use super::errors::LexError;

/// The four arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }
}

/// A lexical token. Produced and consumed within a single evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// Uppercased reference text, e.g. `AB12`.
    CellRef(String),
    /// Uppercased function name candidate.
    Identifier(String),
    Operator(Operator),
    Colon,
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{value}"),
            Token::CellRef(text) | Token::Identifier(text) => f.write_str(text),
            Token::Operator(op) => write!(f, "{}", op.symbol()),
            Token::Colon => f.write_str(":"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
        }
    }
}

/// Lexical analyzer for formula bodies.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char, Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    /// Collects characters while `pred` holds.
    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current_char {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    /// Reads a maximal run of digits and dots and validates its shape.
    ///
    /// Accepted shapes are `123`, `1.5` and `.5`. Anything else in the run
    /// (`1.`, `1.2.3`, `..`) is rejected rather than split.
    fn read_number(&mut self) -> Result<f64, LexError> {
        let text = self.read_while(|ch| ch.is_ascii_digit() || ch == '.');

        let well_formed = match text.split_once('.') {
            None => true,
            Some((int_part, frac_part)) => {
                !frac_part.is_empty()
                    && frac_part.bytes().all(|b| b.is_ascii_digit())
                    && int_part.bytes().all(|b| b.is_ascii_digit())
            }
        };

        if !well_formed {
            return Err(LexError::InvalidNumber(text));
        }

        text.parse::<f64>().map_err(|_| LexError::InvalidNumber(text))
    }

    /// Reads letters and an immediately following digit run, if any.
    fn read_word(&mut self) -> Token {
        let letters = self.read_while(|ch| ch.is_ascii_alphabetic());
        let digits = self.read_while(|ch| ch.is_ascii_digit());

        if digits.is_empty() {
            Token::Identifier(letters.to_ascii_uppercase())
        } else {
            Token::CellRef(format!("{}{}", letters.to_ascii_uppercase(), digits))
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(None);
        };

        let token = match ch {
            '0'..='9' | '.' => Token::Number(self.read_number()?),
            'A'..='Z' | 'a'..='z' => self.read_word(),
            _ => {
                let token = match ch {
                    '+' => Token::Operator(Operator::Add),
                    '-' => Token::Operator(Operator::Subtract),
                    '*' => Token::Operator(Operator::Multiply),
                    '/' => Token::Operator(Operator::Divide),
                    ':' => Token::Colon,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    other => return Err(LexError::UnexpectedCharacter(other)),
                };
                self.advance();
                token
            }
        };

        Ok(Some(token))
    }

    /// Consumes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Tokenizes a formula body (the text after `=`).
pub fn tokenize(body: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(body).tokenize()
}
