//! Calculator tool: a small arithmetic expression evaluator.
//!
//! Supports `+ - * / % ^`, parentheses, unary minus, the functions
//! `sqrt abs sin cos tan log ln`, and the constants `pi` and `e`.
//! `log` is base 10, `ln` is natural.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use toolbridge_core::{Tool, ToolError, ToolOutput};

/// Expression evaluation error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("invalid character '{0}' in expression")]
    InvalidCharacter(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("unknown function or constant '{0}'")]
    UnknownIdentifier(String),
    #[error("result is not a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                // Accept ** as an alias for ^.
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(start))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(CalcError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), CalcError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(_) => Err(CalcError::UnexpectedToken(self.pos - 1)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    // additive := multiplicative (('+' | '-') multiplicative)*
    fn additive(&mut self) -> Result<f64, CalcError> {
        let mut value = self.multiplicative()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.multiplicative()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.multiplicative()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // multiplicative := unary (('*' | '/' | '%') unary)*
    fn multiplicative(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value /= self.unary()?;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    value %= self.unary()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := '-' unary | power
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(-self.unary()?);
        }
        self.power()
    }

    // power := atom ('^' unary)?   -- right associative
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.additive()?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "e" => Ok(std::f64::consts::E),
                "sqrt" | "abs" | "sin" | "cos" | "tan" | "log" | "ln" => {
                    self.expect(&Token::LParen)?;
                    let arg = self.additive()?;
                    self.expect(&Token::RParen)?;
                    Ok(match name.as_str() {
                        "sqrt" => arg.sqrt(),
                        "abs" => arg.abs(),
                        "sin" => arg.sin(),
                        "cos" => arg.cos(),
                        "tan" => arg.tan(),
                        "log" => arg.log10(),
                        _ => arg.ln(),
                    })
                }
                _ => Err(CalcError::UnknownIdentifier(name)),
            },
            Some(_) => Err(CalcError::UnexpectedToken(self.pos - 1)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression.
///
/// # Errors
/// Returns `CalcError` for malformed input, unknown identifiers, or a
/// non-finite result (overflow, division by zero).
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.additive()?;

    if parser.pos != parser.tokens.len() {
        return Err(CalcError::UnexpectedToken(parser.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct CalculatorInput {
    expression: String,
}

/// Calculator tool.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn description(&self) -> &'static str {
        "Performs mathematical calculations. Supports basic operators (+, -, *, /, %, \
         ^), functions (sqrt, abs, sin, cos, tan, log, ln) and the constants pi and e."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate, e.g. \"2 + 2\", \"sqrt(16)\", \"sin(pi/2)\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: CalculatorInput =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let expression = input.expression.trim();
        if expression.is_empty() {
            return Err(ToolError::InvalidInput(
                "expression must not be empty".to_string(),
            ));
        }

        let result =
            evaluate(expression).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        Ok(ToolOutput::text(format!("{expression} = {result}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_basic_arithmetic() {
        assert!(close(evaluate("2 + 2").unwrap(), 4.0));
        assert!(close(evaluate("2 + 3 * 4").unwrap(), 14.0));
        assert!(close(evaluate("(2 + 3) * 4").unwrap(), 20.0));
        assert!(close(evaluate("10 % 3").unwrap(), 1.0));
        assert!(close(evaluate("7 / 2").unwrap(), 3.5));
    }

    #[test]
    fn test_power_is_right_associative() {
        assert!(close(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0));
        assert!(close(evaluate("2 ** 10").unwrap(), 1024.0));
    }

    #[test]
    fn test_unary_minus() {
        assert!(close(evaluate("-3 + 5").unwrap(), 2.0));
        assert!(close(evaluate("2 * -3").unwrap(), -6.0));
        assert!(close(evaluate("-(2 + 3)").unwrap(), -5.0));
    }

    #[test]
    fn test_functions_and_constants() {
        assert!(close(evaluate("sqrt(16)").unwrap(), 4.0));
        assert!(close(evaluate("abs(-7)").unwrap(), 7.0));
        assert!(close(evaluate("sin(pi / 2)").unwrap(), 1.0));
        assert!(close(evaluate("cos(0)").unwrap(), 1.0));
        assert!(close(evaluate("log(1000)").unwrap(), 3.0));
        assert!(close(evaluate("ln(e)").unwrap(), 1.0));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            evaluate("2 $ 2").unwrap_err(),
            CalcError::InvalidCharacter('$')
        );
        assert!(matches!(
            evaluate("foo(1)").unwrap_err(),
            CalcError::UnknownIdentifier(_)
        ));
        assert_eq!(evaluate("2 +").unwrap_err(), CalcError::UnexpectedEnd);
        assert_eq!(evaluate("(2 + 3").unwrap_err(), CalcError::UnexpectedEnd);
        assert!(matches!(
            evaluate("2 3").unwrap_err(),
            CalcError::UnexpectedToken(_)
        ));
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        assert_eq!(evaluate("1 / 0").unwrap_err(), CalcError::NotFinite);
    }

    #[tokio::test]
    async fn test_tool_call() {
        let out = CalculatorTool
            .call(serde_json::json!({"expression": "2 + 2"}))
            .await
            .unwrap();
        let toolbridge_core::ToolContent::Text { text } = &out.content[0];
        assert_eq!(text, "2 + 2 = 4");
    }

    #[tokio::test]
    async fn test_tool_rejects_empty_expression() {
        let err = CalculatorTool
            .call(serde_json::json!({"expression": "  "}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
