//! Formula engine: reference codec, lexer, evaluator, validity gate and
//! recalculation scheduler.

pub mod errors;
pub mod lexer;
pub mod models;
pub mod parser;
pub mod reference;
pub mod scheduler;
pub mod services;

pub use errors::*;
pub use lexer::{Lexer, Operator, Token, tokenize};
pub use models::*;
pub use parser::{Aggregate, MAX_NESTING_DEPTH, Parser, Pass, check_structure, evaluate_tokens};
pub use reference::*;
pub use scheduler::*;
pub use services::*;
