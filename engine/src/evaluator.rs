//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates formula ASTs against a row object.
//! CONTEXT: After a formula is compiled by the parser crate, this module
//! traverses the tree and computes the result. Identifiers are dot-paths
//! into the row, operators follow script coercion rules (see value.rs), and
//! calls dispatch to a fixed helper table.
//!
//! SUPPORTED FEATURES:
//! - Literals: numbers, strings, booleans, null, undefined
//! - Field paths: amount, order.total (segments must start like identifiers;
//!   numeric array segments are only reachable through `resolve_path`)
//! - Binary operations: + - * / % == === != !== < <= > >=
//! - Logical operations: && || (return an operand, short-circuit)
//! - Unary operations: ! + -
//! - Conditionals: test ? a : b
//! - Functions: SUM, AVG, MIN, MAX, ABS, ROUND, IF

use crate::value::{to_fixed, Value};
use parser::{BinaryOperator, Expression, Literal, LogicalOperator, UnaryOperator};
use thiserror::Error;

/// Largest digit count ROUND accepts.
pub const MAX_ROUND_DIGITS: f64 = 100.0;

/// Failures raised while walking a formula. Callers collapse these to
/// `Value::Undefined`.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },

    #[error("{function}: digits must be between 0 and 100, got {digits}")]
    DigitsOutOfRange { function: String, digits: f64 },
}

pub type EvalResult = Result<Value, EvalError>;

/// Reads a dot-path from a row. A key containing the full path wins over
/// walking the segments, so `{"a.b": 1}` resolves `a.b` to 1.
pub fn resolve_path(row: &serde_json::Value, path: &str) -> Value {
    if path.is_empty() {
        return Value::Undefined;
    }
    if let Some(direct) = row.as_object().and_then(|map| map.get(path)) {
        return Value::from_json(direct);
    }

    let mut current = row;
    for segment in path.split('.') {
        let next = match current {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Undefined,
        }
    }
    Value::from_json(current)
}

/// The formula evaluator.
pub struct Evaluator<'a> {
    row: &'a serde_json::Value,
}

impl<'a> Evaluator<'a> {
    /// Creates a new Evaluator bound to one row.
    pub fn new(row: &'a serde_json::Value) -> Self {
        Evaluator { row }
    }

    /// Evaluates an AST expression and returns the result.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(literal) => Ok(self.eval_literal(literal)),
            Expression::Identifier(path) => Ok(resolve_path(self.row, path)),
            Expression::Unary { op, operand } => self.eval_unary_op(*op, operand),
            Expression::Binary { left, op, right } => self.eval_binary_op(left, *op, right),
            Expression::Logical { left, op, right } => {
                let lhs = self.evaluate(left)?;
                match (op, lhs.is_truthy()) {
                    (LogicalOperator::And, false) | (LogicalOperator::Or, true) => Ok(lhs),
                    _ => self.evaluate(right),
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
            Expression::Call { name, args } => self.eval_function(name, args),
        }
    }

    fn eval_literal(&self, literal: &Literal) -> Value {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::Text(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Null => Value::Null,
            Literal::Undefined => Value::Undefined,
        }
    }

    fn eval_unary_op(&self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let value = self.evaluate(operand)?;
        Ok(match op {
            UnaryOperator::Not => Value::Boolean(!value.is_truthy()),
            UnaryOperator::Plus => Value::Number(value.to_number()),
            UnaryOperator::Negate => Value::Number(-value.to_number()),
        })
    }

    fn eval_binary_op(&self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalResult {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        let result = match op {
            BinaryOperator::Add => self.eval_add(&lhs, &rhs),
            BinaryOperator::Subtract => Value::Number(lhs.to_number() - rhs.to_number()),
            BinaryOperator::Multiply => Value::Number(lhs.to_number() * rhs.to_number()),
            BinaryOperator::Divide => Value::Number(lhs.to_number() / rhs.to_number()),
            // f64 `%` truncates like the script remainder operator
            BinaryOperator::Remainder => Value::Number(lhs.to_number() % rhs.to_number()),
            BinaryOperator::Equal => Value::Boolean(lhs.loose_equals(&rhs)),
            BinaryOperator::NotEqual => Value::Boolean(!lhs.loose_equals(&rhs)),
            BinaryOperator::StrictEqual => Value::Boolean(lhs.strict_equals(&rhs)),
            BinaryOperator::StrictNotEqual => Value::Boolean(!lhs.strict_equals(&rhs)),
            BinaryOperator::LessThan => Value::Boolean(lhs.compare(&rhs).is_some_and(|o| o.is_lt())),
            BinaryOperator::LessEqual => Value::Boolean(lhs.compare(&rhs).is_some_and(|o| o.is_le())),
            BinaryOperator::GreaterThan => Value::Boolean(lhs.compare(&rhs).is_some_and(|o| o.is_gt())),
            BinaryOperator::GreaterEqual => {
                Value::Boolean(lhs.compare(&rhs).is_some_and(|o| o.is_ge()))
            }
        };
        Ok(result)
    }

    /// `+` concatenates when either side is text after primitive conversion.
    fn eval_add(&self, left: &Value, right: &Value) -> Value {
        let lhs = left.to_primitive();
        let rhs = right.to_primitive();
        match (&lhs, &rhs) {
            (Value::Text(_), _) | (_, Value::Text(_)) => {
                Value::Text(format!("{}{}", lhs.to_text(), rhs.to_text()))
            }
            _ => Value::Number(lhs.to_number() + rhs.to_number()),
        }
    }

    /// Evaluates a function call. Unknown helpers yield undefined.
    fn eval_function(&self, name: &str, args: &[Expression]) -> EvalResult {
        let name_upper = name.to_uppercase();

        match name_upper.as_str() {
            "SUM" => self.fn_sum(args),
            "AVG" => self.fn_avg(args),
            "MIN" => self.fn_min(args),
            "MAX" => self.fn_max(args),
            "ABS" => self.fn_abs(args),
            "ROUND" => self.fn_round(args),
            "IF" => self.fn_if(args),
            _ => Ok(Value::Undefined),
        }
    }

    /// Collects numeric values from evaluated arguments, flattening arrays.
    /// Nullish, blank and non-numeric values are skipped.
    fn collect_numbers(&self, args: &[Expression]) -> Result<Vec<f64>, EvalError> {
        let mut numbers = Vec::new();
        for arg in args {
            let value = self.evaluate(arg)?;
            push_numbers(&value, &mut numbers);
        }
        Ok(numbers)
    }

    // ==================== Aggregate Functions ====================

    fn fn_sum(&self, args: &[Expression]) -> EvalResult {
        let numbers = self.collect_numbers(args)?;
        Ok(Value::Number(numbers.iter().sum()))
    }

    fn fn_avg(&self, args: &[Expression]) -> EvalResult {
        let numbers = self.collect_numbers(args)?;
        if numbers.is_empty() {
            return Ok(Value::Undefined);
        }
        let sum: f64 = numbers.iter().sum();
        Ok(Value::Number(sum / numbers.len() as f64))
    }

    fn fn_min(&self, args: &[Expression]) -> EvalResult {
        let numbers = self.collect_numbers(args)?;
        Ok(numbers
            .into_iter()
            .reduce(f64::min)
            .map(Value::Number)
            .unwrap_or(Value::Undefined))
    }

    fn fn_max(&self, args: &[Expression]) -> EvalResult {
        let numbers = self.collect_numbers(args)?;
        Ok(numbers
            .into_iter()
            .reduce(f64::max)
            .map(Value::Number)
            .unwrap_or(Value::Undefined))
    }

    // ==================== Math Functions ====================

    fn fn_abs(&self, args: &[Expression]) -> EvalResult {
        let value = match args.first() {
            Some(arg) => self.evaluate(arg)?,
            None => Value::Undefined,
        };
        Ok(Value::Number(value.to_number().abs()))
    }

    fn fn_round(&self, args: &[Expression]) -> EvalResult {
        let number = match args.first() {
            Some(arg) => self.evaluate(arg)?.to_number(),
            None => f64::NAN,
        };

        let digits = match args.get(1) {
            Some(arg) => {
                let value = self.evaluate(arg)?;
                if value.is_undefined() {
                    0.0
                } else {
                    let d = value.to_number().trunc();
                    if d.is_nan() {
                        0.0
                    } else {
                        d
                    }
                }
            }
            None => 0.0,
        };

        if !(0.0..=MAX_ROUND_DIGITS).contains(&digits) {
            return Err(EvalError::DigitsOutOfRange {
                function: "ROUND".to_string(),
                digits,
            });
        }

        if !number.is_finite() {
            return Ok(Value::Number(number));
        }

        let text = to_fixed(number, digits as usize);
        text.parse::<f64>()
            .map(Value::Number)
            .map_err(|e| EvalError::InvalidArgument {
                function: "ROUND".to_string(),
                message: e.to_string(),
            })
    }

    // ==================== Logical Functions ====================

    /// IF only evaluates the branch it selects.
    fn fn_if(&self, args: &[Expression]) -> EvalResult {
        let condition = match args.first() {
            Some(arg) => self.evaluate(arg)?,
            None => Value::Undefined,
        };
        let branch = if condition.is_truthy() { args.get(1) } else { args.get(2) };
        match branch {
            Some(expr) => self.evaluate(expr),
            None => Ok(Value::Undefined),
        }
    }
}

fn push_numbers(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_numbers(item, out);
            }
        }
        Value::Undefined | Value::Null => {}
        Value::Text(s) if s.trim().is_empty() => {}
        other => {
            let n = other.to_number();
            if !n.is_nan() {
                out.push(n);
            }
        }
    }
}

/// Compiles (through the shared cache) and evaluates `source` against `row`.
/// Uncompilable formulas and evaluation errors both produce undefined.
pub fn evaluate_formula(source: &str, row: &serde_json::Value) -> Value {
    let Some(expr) = parser::compile_formula(source) else {
        crate::log_debug!("FORMULA", "formula did not compile: {}", source);
        return Value::Undefined;
    };
    match Evaluator::new(row).evaluate(&expr) {
        Ok(value) => value,
        Err(e) => {
            crate::log_debug!("FORMULA", "evaluation failed for '{}': {}", source, e);
            Value::Undefined
        }
    }
}
