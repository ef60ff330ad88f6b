//! Built-in in-process tools

use crate::error::Result;
use crate::tool::{Tool, ToolContext};
use async_trait::async_trait;

/// Evaluates arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate arithmetic expressions."
    }

    async fn run(&self, input: &str, _context: &ToolContext) -> Result<String> {
        match eval(input) {
            Ok(value) => Ok(value.to_string()),
            Err(e) => Ok(format!("error: {}", e)),
        }
    }
}

/// Relays a text message to the frontend event stream
pub struct MessageTool;

#[async_trait]
impl Tool for MessageTool {
    fn name(&self) -> &str {
        "message"
    }

    fn description(&self) -> &str {
        "Send a message to the frontend event stream"
    }

    async fn run(&self, input: &str, _context: &ToolContext) -> Result<String> {
        Ok(format!("Message sent: {}", input))
    }
}

/// Evaluate `+ - * /` with parentheses over f64
fn eval(expr: &str) -> std::result::Result<f64, String> {
    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pos = 0;
    let value = parse_sum(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("unexpected input at position {}", pos));
    }
    Ok(value)
}

fn parse_sum(tokens: &[char], pos: &mut usize) -> std::result::Result<f64, String> {
    let mut value = parse_product(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        if op != '+' && op != '-' {
            break;
        }
        *pos += 1;
        let rhs = parse_product(tokens, pos)?;
        value = if op == '+' { value + rhs } else { value - rhs };
    }
    Ok(value)
}

fn parse_product(tokens: &[char], pos: &mut usize) -> std::result::Result<f64, String> {
    let mut value = parse_atom(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        if op != '*' && op != '/' {
            break;
        }
        *pos += 1;
        let rhs = parse_atom(tokens, pos)?;
        value = if op == '*' { value * rhs } else { value / rhs };
    }
    Ok(value)
}

fn parse_atom(tokens: &[char], pos: &mut usize) -> std::result::Result<f64, String> {
    match tokens.get(*pos) {
        Some('(') => {
            *pos += 1;
            let value = parse_sum(tokens, pos)?;
            if tokens.get(*pos) != Some(&')') {
                return Err("missing closing parenthesis".to_string());
            }
            *pos += 1;
            Ok(value)
        }
        Some('-') => {
            *pos += 1;
            Ok(-parse_atom(tokens, pos)?)
        }
        Some(c) if c.is_ascii_digit() || *c == '.' => {
            let start = *pos;
            while tokens
                .get(*pos)
                .is_some_and(|c| c.is_ascii_digit() || *c == '.')
            {
                *pos += 1;
            }
            let literal: String = tokens[start..*pos].iter().collect();
            literal
                .parse::<f64>()
                .map_err(|_| format!("invalid number: {}", literal))
        }
        Some(c) => Err(format!("unexpected character: {}", c)),
        None => Err("unexpected end of expression".to_string()),
    }
}
