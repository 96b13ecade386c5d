//! Formula evaluation services.
//!
//! [`FormulaEvaluator`] is the engine's entry point for single formulas: it
//! turns a formula string into display text and decides which strings may be
//! stored as live formulas at all.

use super::errors::CellError;
use super::lexer::{Token, tokenize};
use super::models::CellSource;
use super::parser::{check_structure, evaluate_tokens};

/// Formula names handed through to the renderer without evaluation.
pub const DEFAULT_VISUAL_FORMULAS: [&str; 3] = ["PROGRESS", "RATING", "TAG"];

/// Evaluates formulas and gates which strings count as formulas.
///
/// Supported features:
/// - Arithmetic operations: +, -, *, / with unary signs and parentheses
/// - Cell references: A1, B2, AA12
/// - Range aggregates: SUM(A1:B3), AVG(C1:C10)
/// - Error sentinels: #DIV/0!, #REF!, #NAME?, #ERROR!
///
/// # Examples
///
/// ```
/// use gridcalc::domain::{FormulaEvaluator, GridView};
///
/// let data = vec![vec!["1".to_string(), "2".to_string()]];
/// let view = GridView::new(&data, 1, 2);
/// let evaluator = FormulaEvaluator::default();
///
/// assert_eq!(evaluator.evaluate_formula("=A1+B1*3", &view), "7");
/// assert_eq!(evaluator.evaluate_formula("=SUM(A1:B1)", &view), "3");
/// assert_eq!(evaluator.evaluate_formula("=1/0", &view), "#DIV/0!");
/// assert!(evaluator.is_valid_formula("=SUM(A1:B2)"));
/// assert!(!evaluator.is_valid_formula("=1+*2"));
/// ```
#[derive(Debug, Clone)]
pub struct FormulaEvaluator {
    /// Uppercase names of pass-through formulas such as `=PROGRESS(50)`.
    visual_formulas: Vec<String>,
}

impl Default for FormulaEvaluator {
    fn default() -> Self {
        Self::with_visual_formulas(DEFAULT_VISUAL_FORMULAS)
    }
}

impl FormulaEvaluator {
    pub fn with_visual_formulas<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            visual_formulas: names
                .into_iter()
                .map(|name| name.as_ref().trim().to_ascii_uppercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    pub fn visual_formulas(&self) -> &[String] {
        &self.visual_formulas
    }

    /// Evaluates a formula and returns its display text.
    ///
    /// Formulas must start with `=`. Other strings are returned unchanged.
    /// Failures come back as the matching error sentinel.
    pub fn evaluate_formula(&self, formula: &str, source: &dyn CellSource) -> String {
        if !formula.starts_with('=') {
            return formula.to_string();
        }

        match self.evaluate(formula, source) {
            Ok(value) => format_number(value),
            Err(err) => err.to_string(),
        }
    }

    /// Evaluates a formula to its numeric value.
    pub fn evaluate(&self, formula: &str, source: &dyn CellSource) -> Result<f64, CellError> {
        let body = formula.strip_prefix('=').unwrap_or(formula).trim();

        let tokens = tokenize(body).map_err(|err| {
            tracing::debug!(formula, error = %err, "formula failed to tokenize");
            CellError::Malformed
        })?;

        let value = evaluate_tokens(&tokens, source).inspect_err(|err| {
            tracing::debug!(formula, error = %err, "formula evaluation failed");
        })?;

        if value.is_finite() {
            Ok(value)
        } else {
            tracing::debug!(formula, value, "formula produced a non-finite value");
            Err(CellError::Malformed)
        }
    }

    /// Decides whether `text` may be stored as a live formula.
    ///
    /// Accepts `=` text that is either a configured visual formula or a body
    /// that tokenizes into at least one token, balances its parentheses and
    /// forms one complete expression.
    pub fn is_valid_formula(&self, text: &str) -> bool {
        let Some(body) = text.strip_prefix('=') else {
            return false;
        };

        if self.is_visual_body(body) {
            return true;
        }

        match tokenize(body.trim()) {
            Ok(tokens) => {
                !tokens.is_empty() && parens_balanced(&tokens) && check_structure(&tokens).is_ok()
            }
            Err(_) => false,
        }
    }

    /// Whether `text` is a call to one of the pass-through visual formulas.
    pub fn is_visual_formula(&self, text: &str) -> bool {
        text.strip_prefix('=')
            .is_some_and(|body| self.is_visual_body(body))
    }

    fn is_visual_body(&self, body: &str) -> bool {
        let body = body.trim_start();
        let name_len = body
            .find(|ch: char| !ch.is_ascii_alphabetic())
            .unwrap_or(body.len());
        let (name, rest) = body.split_at(name_len);

        !name.is_empty()
            && rest.trim_start().starts_with('(')
            && self
                .visual_formulas
                .iter()
                .any(|visual| visual.eq_ignore_ascii_case(name))
    }
}

/// Parenthesis depth never goes negative and ends at zero.
fn parens_balanced(tokens: &[Token]) -> bool {
    let mut depth: usize = 0;
    for token in tokens {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Magnitudes at or above this print in exponent form.
const EXPONENT_FORM_ABOVE: f64 = 1e21;
/// Magnitudes below this print in exponent form.
const EXPONENT_FORM_BELOW: f64 = 1e-6;

/// Formats a computed value for display.
///
/// Integers print without a fractional part. Other values are rounded to 10
/// decimal places first so that `0.1 + 0.2` shows as `0.3`. Very large and
/// very small magnitudes use exponent form with an explicit sign, as in
/// `1e+21` and `1e-7`.
pub fn format_number(value: f64) -> String {
    let value = if value.fract() == 0.0 {
        value
    } else {
        format!("{value:.10}").parse::<f64>().unwrap_or(value)
    };

    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude < EXPONENT_FORM_ABOVE && magnitude >= EXPONENT_FORM_BELOW {
        return value.to_string();
    }

    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::GridView;

    fn matrix(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn create_test_data() -> Vec<Vec<String>> {
        matrix(&[
            &["10", "20", "30"],
            &["5", "15", "25"],
        ])
    }

    fn evaluate(formula: &str, data: &[Vec<String>], rows: usize, cols: usize) -> String {
        FormulaEvaluator::default().evaluate_formula(formula, &GridView::new(data, rows, cols))
    }

    #[test]
    fn test_non_formula_passthrough() {
        let data = create_test_data();
        assert_eq!(evaluate("hello", &data, 2, 3), "hello");
        assert_eq!(evaluate("123", &data, 2, 3), "123");
        assert_eq!(evaluate("", &data, 2, 3), "");
    }

    #[test]
    fn test_simple_arithmetic() {
        let data = create_test_data();
        assert_eq!(evaluate("=2+3", &data, 2, 3), "5");
        assert_eq!(evaluate("=10-3", &data, 2, 3), "7");
        assert_eq!(evaluate("=4*5", &data, 2, 3), "20");
        assert_eq!(evaluate("=15/3", &data, 2, 3), "5");
        assert_eq!(evaluate("=2+3*4", &data, 2, 3), "14");
    }

    #[test]
    fn test_cell_arithmetic() {
        let data = create_test_data();
        assert_eq!(evaluate("=A1+B1", &data, 2, 3), "30");
        assert_eq!(evaluate("=C1-A1", &data, 2, 3), "20");
        assert_eq!(evaluate("=A1*A2", &data, 2, 3), "50");
        assert_eq!(evaluate("=B1/A2", &data, 2, 3), "4");
    }

    #[test]
    fn test_sum_over_two_by_two() {
        let data = matrix(&[&["1", "3"], &["2", "4"]]);
        assert_eq!(evaluate("=SUM(A1:B2)", &data, 2, 2), "10");
    }

    #[test]
    fn test_avg_of_empty_cell_is_zero() {
        let data = matrix(&[&[""]]);
        assert_eq!(evaluate("=AVG(A1:A1)", &data, 1, 1), "0");
    }

    #[test]
    fn test_avg_function() {
        let data = create_test_data();
        assert_eq!(evaluate("=AVG(A1:C1)", &data, 2, 3), "20");
        assert_eq!(evaluate("=AVG(A1:A2)", &data, 2, 3), "7.5");
    }

    #[test]
    fn test_missing_and_text_cells_coerce_to_zero() {
        let data = matrix(&[&["", "abc", "#DIV/0!", "7 apples"]]);
        assert_eq!(evaluate("=A1+1", &data, 1, 4), "1");
        assert_eq!(evaluate("=B1*5", &data, 1, 4), "0");
        assert_eq!(evaluate("=C1+2", &data, 1, 4), "2");
        assert_eq!(evaluate("=D1+1", &data, 1, 4), "8");
        assert_eq!(evaluate("=SUM(A1:D1)", &data, 1, 4), "7");
    }

    #[test]
    fn test_error_sentinels() {
        let data = matrix(&[&["1", "2", "3", "4", "5"]]);
        assert_eq!(evaluate("=1/0", &data, 1, 5), "#DIV/0!");
        assert_eq!(evaluate("=Z1", &data, 1, 5), "#REF!");
        assert_eq!(evaluate("=FOO(A1)", &data, 1, 5), "#NAME?");
        assert_eq!(evaluate("=(1+2", &data, 1, 5), "#ERROR!");
        assert_eq!(evaluate("=", &data, 1, 5), "#ERROR!");
        assert_eq!(evaluate("=1 2", &data, 1, 5), "#ERROR!");
        assert_eq!(evaluate("=1.2.3", &data, 1, 5), "#ERROR!");
        assert_eq!(evaluate("=A1 % 2", &data, 1, 5), "#ERROR!");
    }

    #[test]
    fn test_division_by_zero_ignores_context() {
        let empty = matrix(&[&[""]]);
        let full = create_test_data();
        assert_eq!(evaluate("=1/0", &empty, 1, 1), "#DIV/0!");
        assert_eq!(evaluate("=1/0", &full, 2, 3), "#DIV/0!");
    }

    #[test]
    fn test_case_insensitive_functions() {
        let data = create_test_data();
        assert_eq!(evaluate("=sum(a1:b1)", &data, 2, 3), "30");
        assert_eq!(evaluate("=Sum(A1:B1)", &data, 2, 3), "30");
        assert_eq!(evaluate("=avg(A1:B1)", &data, 2, 3), "15");
    }

    #[test]
    fn test_whitespace_handling() {
        let data = create_test_data();
        assert_eq!(evaluate("= 2 + 3 ", &data, 2, 3), "5");
        assert_eq!(evaluate("=SUM( A1 : B1 )", &data, 2, 3), "30");
        assert_eq!(evaluate("= A1 * 2 ", &data, 2, 3), "20");
    }

    #[test]
    fn test_large_numbers() {
        let data = matrix(&[&["1000000", "2000000"]]);
        assert_eq!(evaluate("=A1+B1", &data, 1, 2), "3000000");
        assert_eq!(evaluate("=A1*B1", &data, 1, 2), "2000000000000");
    }

    #[test]
    fn test_negative_numbers() {
        let data = matrix(&[&["-10", "5"]]);
        assert_eq!(evaluate("=A1+B1", &data, 1, 2), "-5");
        assert_eq!(evaluate("=A1*B1", &data, 1, 2), "-50");
        assert_eq!(evaluate("=-5+10", &data, 1, 2), "5");
        assert_eq!(evaluate("=-0", &data, 1, 2), "0");
    }

    #[test]
    fn test_decimal_precision() {
        let data = create_test_data();
        assert_eq!(evaluate("=1/3", &data, 2, 3), "0.3333333333");
        assert_eq!(evaluate("=22/7", &data, 2, 3), "3.1428571429");
        assert_eq!(evaluate("=0.1+0.2", &data, 2, 3), "0.3");
        assert_eq!(evaluate("=2.5*2", &data, 2, 3), "5");
    }

    #[test]
    fn test_non_finite_results_are_errors() {
        let data = matrix(&[&["Infinity", "1e308"]]);
        assert_eq!(evaluate("=A1", &data, 1, 2), "#ERROR!");
        assert_eq!(evaluate("=B1*10", &data, 1, 2), "#ERROR!");
        assert_eq!(evaluate("=1/A1", &data, 1, 2), "0");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.30000000000000004), "0.3");
        assert_eq!(format_number(2.00000000000001), "2");
        assert_eq!(format_number(-1.25), "-1.25");
    }

    #[test]
    fn test_format_number_exponent_form() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn test_extreme_results_use_exponent_form() {
        let data = create_test_data();
        assert_eq!(evaluate("=10000000000*100000000000", &data, 2, 3), "1e+21");
        assert_eq!(evaluate("=1/10000000", &data, 2, 3), "1e-7");
    }

    #[test]
    fn test_is_valid_formula() {
        let evaluator = FormulaEvaluator::default();

        assert!(evaluator.is_valid_formula("=SUM(A1:B2)"));
        assert!(evaluator.is_valid_formula("=A1+B1"));
        assert!(evaluator.is_valid_formula("=1/0"));
        assert!(evaluator.is_valid_formula("= (1 + 2) * 3"));
        assert!(evaluator.is_valid_formula("=FOO(A1)"));

        assert!(!evaluator.is_valid_formula("=1+*2"));
        assert!(!evaluator.is_valid_formula("plain text"));
        assert!(!evaluator.is_valid_formula("="));
        assert!(!evaluator.is_valid_formula("=   "));
        assert!(!evaluator.is_valid_formula("=(1+2"));
        assert!(!evaluator.is_valid_formula("=1+2)"));
        assert!(!evaluator.is_valid_formula("=)1+2("));
        assert!(!evaluator.is_valid_formula("=alert('x')"));
        assert!(!evaluator.is_valid_formula("=1.2.3"));
        assert!(!evaluator.is_valid_formula(" =1+2"));
    }

    #[test]
    fn test_visual_formulas_pass_through() {
        let evaluator = FormulaEvaluator::default();
        assert!(evaluator.is_valid_formula("=PROGRESS(75)"));
        assert!(evaluator.is_valid_formula("=tag(\"urgent\", red)"));
        assert!(evaluator.is_visual_formula("=RATING (4)"));
        assert!(!evaluator.is_visual_formula("=PROGRESS"));
        assert!(!evaluator.is_visual_formula("=SUM(A1:A2)"));

        let custom = FormulaEvaluator::with_visual_formulas(["sparkline"]);
        assert!(custom.is_valid_formula("=SPARKLINE(A1:A5, 'bar')"));
        assert!(!custom.is_valid_formula("=PROGRESS(75)"));
    }

    #[test]
    fn test_gate_rejects_excessive_nesting() {
        let evaluator = FormulaEvaluator::default();
        assert!(!evaluator.is_valid_formula(&format!("={}1", "-".repeat(200_000))));
        assert!(!evaluator.is_valid_formula(&format!(
            "={}1{}",
            "(".repeat(100_000),
            ")".repeat(100_000)
        )));
        assert!(evaluator.is_valid_formula(&format!("={}1{}", "(".repeat(10), ")".repeat(10))));
    }

    #[test]
    fn test_parens_balanced() {
        let tokens = |body: &str| tokenize(body).unwrap();
        assert!(parens_balanced(&tokens("((1))")));
        assert!(!parens_balanced(&tokens("(()")));
        assert!(!parens_balanced(&tokens(")(")));
    }
}
