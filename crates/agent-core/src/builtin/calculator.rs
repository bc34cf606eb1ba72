//! Calculator Tool
//!
//! Evaluates arithmetic expressions over a deliberately tiny grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! number := digits ['.' digits] | '.' digits
//! ```
//!
//! Input containing anything other than digits, `+ - * / ( ) .` and
//! whitespace is rejected before parsing starts, as is input longer than
//! [`MAX_EXPRESSION_LEN`]. Parentheses and unary signs may nest at most
//! [`MAX_NESTING`] levels deep.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::tool::{ParameterSchema, Tool, ToolArguments, ToolSchema};

/// Calculator tool - evaluates mathematical expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculator".into(),
            description: "Perform basic mathematical calculations".into(),
            parameters: vec![ParameterSchema::required(
                "expression",
                "string",
                "Mathematical expression to evaluate (e.g., '2 + 2', '10 * 5')",
            )],
        }
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value> {
        let expression = args
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::ToolValidation("Missing expression".into()))?;

        let result = evaluate_expression(expression).map_err(AgentError::ToolExecution)?;

        Ok(json!({
            "success": true,
            "result": number_value(result),
            "expression": expression,
        }))
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate_expression(expression: &str) -> std::result::Result<f64, String> {
    if !expression.chars().all(is_allowed) {
        return Err("Expression contains invalid characters".into());
    }
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "Expression is too long ({} characters, at most {MAX_EXPRESSION_LEN})",
            expression.len()
        ));
    }

    let mut parser = Parser {
        input: expression.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos < parser.input.len() {
        return Err(format!(
            "Unexpected '{}' at position {}",
            char::from(parser.input[parser.pos]),
            parser.pos
        ));
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err("Result is not a finite number".into())
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.') || c.is_ascii_whitespace()
}

/// Integral results are reported as JSON integers
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_value(result: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if result.fract() == 0.0 && result.abs() < MAX_EXACT {
        json!(result as i64)
    } else {
        json!(result)
    }
}

/// Longest expression accepted, in bytes
pub const MAX_EXPRESSION_LEN: usize = 1024;

/// Deepest nesting of parentheses and unary signs
pub const MAX_NESTING: usize = 256;

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.input.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == b'+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'/' {
                if rhs == 0.0 {
                    return Err("Division by zero".into());
                }
                value /= rhs;
            } else {
                value *= rhs;
            }
        }
        Ok(value)
    }

    /// Recursion guard; every nested `factor` goes through here
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> std::result::Result<f64, String>,
    ) -> std::result::Result<f64, String> {
        if self.depth >= MAX_NESTING {
            return Err(format!("Expression is nested too deeply (more than {MAX_NESTING} levels)"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn factor(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                self.nested(|p| p.factor().map(|v| -v))
            }
            Some(b'+') => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                if self.peek() != Some(b')') {
                    return Err("Missing closing parenthesis".into());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("Unexpected '{}' at position {}", char::from(c), self.pos)),
            None => Err("Unexpected end of expression".into()),
        }
    }

    fn number(&mut self) -> std::result::Result<f64, String> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(&c) = self.input.get(self.pos) {
            match c {
                b'0'..=b'9' => {}
                b'.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            self.pos += 1;
        }

        // input is ASCII at this point
        let literal = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|e| e.to_string())?;
        literal
            .parse::<f64>()
            .map_err(|_| format!("Invalid number '{literal}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> f64 {
        evaluate_expression(expr).unwrap()
    }

    #[test]
    fn test_calculator() {
        assert!((eval("2 + 2") - 4.0).abs() < f64::EPSILON);
        assert!((eval("10 * 5") - 50.0).abs() < f64::EPSILON);
        assert!((eval("(2 + 3) * 4") - 20.0).abs() < f64::EPSILON);
        assert!((eval("10 - 4 - 3") - 3.0).abs() < f64::EPSILON);
        assert!((eval("2 + 3 * 4") - 14.0).abs() < f64::EPSILON);
        assert!((eval("-(1.5 + .5) / 4") + 0.5).abs() < f64::EPSILON);
        assert!((eval("\t25 *\n4 ") - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_anything_outside_grammar() {
        for expr in ["import os", "__import__('os')", "2 ^ 8", "1e3", "abs(-1)", "2; 3"] {
            let err = evaluate_expression(expr).unwrap_err();
            assert_eq!(err, "Expression contains invalid characters", "{expr}");
        }
    }

    #[test]
    fn test_malformed_expressions() {
        assert_eq!(evaluate_expression("1 / 0").unwrap_err(), "Division by zero");
        assert!(evaluate_expression("").is_err());
        assert!(evaluate_expression("(1 + 2").is_err());
        assert!(evaluate_expression("1 + 2)").is_err());
        assert!(evaluate_expression("1.2.3").is_err());
        assert!(evaluate_expression("2 ** 3").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!((eval(&ok) - 1.0).abs() < f64::EPSILON);
        assert!((eval(&format!("{}7", "-".repeat(MAX_NESTING))) - 7.0).abs() < f64::EPSILON);

        let parens = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        let err = evaluate_expression(&parens).unwrap_err();
        assert!(err.contains("nested too deeply"), "{err}");

        let signs = format!("{}1", "-+".repeat(150));
        let err = evaluate_expression(&signs).unwrap_err();
        assert!(err.contains("nested too deeply"), "{err}");
    }

    #[test]
    fn test_huge_expressions_fail_cleanly() {
        let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(evaluate_expression(&parens).unwrap_err().contains("too long"));

        let signs = format!("{}1", "-".repeat(20_000));
        assert!(evaluate_expression(&signs).unwrap_err().contains("too long"));

        let sum = vec!["1"; 600].join("+");
        assert!(evaluate_expression(&sum).unwrap_err().contains("too long"));
    }

    #[tokio::test]
    async fn test_execute_reports_integers() {
        let mut args = ToolArguments::new();
        args.insert("expression".into(), json!("2 + 2"));
        let value = CalculatorTool.execute(&args).await.unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["result"], json!(4));
        assert_eq!(value["expression"], "2 + 2");

        args.insert("expression".into(), json!("10 / 4"));
        let value = CalculatorTool.execute(&args).await.unwrap();
        assert_eq!(value["result"], json!(2.5));
    }

    #[tokio::test]
    async fn test_execute_rejects_injection() {
        let mut args = ToolArguments::new();
        args.insert("expression".into(), json!("import os"));
        let err = CalculatorTool.execute(&args).await.unwrap_err();

        assert!(matches!(err, AgentError::ToolExecution(_)));
    }
}
