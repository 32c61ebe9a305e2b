//! FILENAME: engine/src/value.rs
//! PURPOSE: The dynamic value type flowing through formulas and strategies.
//! CONTEXT: Row data arrives as JSON. Formulas and rules need script-like
//! coercion rules on top of it (truthiness, loose equality, numeric
//! conversion, `undefined` distinct from `null`), which plain
//! `serde_json::Value` cannot express. This module implements those rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing field, failed evaluation, or "no result".
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    Array(Vec<Value>),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl Value {
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Object(map.clone()),
        }
    }

    /// Converts back to JSON. `undefined` and non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(map.clone()),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Null, undefined, blank text, empty array and empty object are "empty".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Boolean(_) | Value::Number(_) => false,
        }
    }

    /// Numeric conversion with script semantics (`undefined` -> NaN, `null` -> 0).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Text(s) => parse_number_text(s),
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_primitive().to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) => f64::NAN,
        }
    }

    /// Arrays and objects collapse to their text form; scalars are unchanged.
    pub fn to_primitive(&self) -> Value {
        match self {
            Value::Array(_) | Value::Object(_) => Value::Text(self.to_text()),
            other => other.clone(),
        }
    }

    /// String conversion with script semantics.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_text(*n),
            Value::Text(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| if item.is_nullish() { String::new() } else { item.to_text() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Text used when rendering a cell: nullish values render as "".
    pub fn display_text(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_text()
        }
    }

    /// `===`. Arrays and objects compare structurally since values are owned.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_equals(y))
            }
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }

    /// `==`.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::Text(_)) | (Value::Text(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Boolean(b), _) => Value::Number(if *b { 1.0 } else { 0.0 }).loose_equals(other),
            (_, Value::Boolean(b)) => self.loose_equals(&Value::Number(if *b { 1.0 } else { 0.0 })),
            (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::Text(_))
            | (Value::Number(_) | Value::Text(_), Value::Array(_) | Value::Object(_)) => {
                self.to_primitive().loose_equals(&other.to_primitive())
            }
            _ => self.strict_equals(other),
        }
    }

    /// Relational comparison: text against text compares lexicographically,
    /// anything else numerically. `None` when either side is NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let left = self.to_primitive();
        let right = other.to_primitive();
        if let (Value::Text(a), Value::Text(b)) = (&left, &right) {
            return Some(a.cmp(b));
        }
        left.to_number().partial_cmp(&right.to_number())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

// ============================================================================
// NUMBER <-> TEXT
// ============================================================================

fn parse_number_text(text: &str) -> f64 {
    let trimmed = text.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan"; script conversion does not
        s if s.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        s => s.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Formats a number the way script engines print them.
pub fn number_to_text(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        // Covers -0
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    format!("{}", n)
}

/// Largest number of fractional digits `to_fixed` renders.
pub const MAX_PRECISION: u32 = 100;

/// Fixed-point formatting with `toFixed` semantics: rounding is done on the
/// exact binary value, and exact ties round away from zero.
pub fn to_fixed(value: f64, digits: usize) -> String {
    let digits = digits.min(MAX_PRECISION as usize);
    if !value.is_finite() || value.abs() >= 1e21 {
        return number_to_text(value);
    }
    if value < 0.0 {
        return format!("-{}", to_fixed(-value, digits));
    }

    // Every finite double has a terminating decimal expansion of at most
    // 1074 fractional digits, so this rendering is exact.
    let exact = format!("{:.1100}", value);
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut out: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part.as_bytes().get(digits).is_some_and(|b| *b >= b'5');
    if round_up {
        let mut idx = out.len();
        loop {
            if idx == 0 {
                out.insert(0, 1);
                break;
            }
            idx -= 1;
            if out[idx] == 9 {
                out[idx] = 0;
            } else {
                out[idx] += 1;
                break;
            }
        }
    }

    let int_len = out.len() - digits;
    let mut text: String = out[..int_len].iter().map(|d| char::from(b'0' + d)).collect();
    if digits > 0 {
        text.push('.');
        text.extend(out[int_len..].iter().map(|d| char::from(b'0' + d)));
    }
    text
}

/// Rounds through `to_fixed` and reads the number back.
pub fn round_to_precision(value: f64, digits: u32) -> f64 {
    let digits = digits.min(MAX_PRECISION);
    if !value.is_finite() {
        return value;
    }
    to_fixed(value, digits as usize).parse::<f64>().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_script_rules() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Text("0".to_string()).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn numeric_conversion() {
        assert_eq!(Value::Text(" 12.5 ".to_string()).to_number(), 12.5);
        assert_eq!(Value::Text(String::new()).to_number(), 0.0);
        assert!(Value::Text("inf".to_string()).to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::Array(vec![Value::Number(4.0)]).to_number(), 4.0);
    }

    #[test]
    fn number_text_matches_script_output() {
        assert_eq!(number_to_text(7.0), "7");
        assert_eq!(number_to_text(-0.0), "0");
        assert_eq!(number_to_text(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_text(1e21), "1e+21");
        assert_eq!(number_to_text(1.5e-7), "1.5e-7");
    }

    #[test]
    fn loose_and_strict_equality() {
        let five = Value::Number(5.0);
        let five_text = Value::Text("5".to_string());
        assert!(five.loose_equals(&five_text));
        assert!(!five.strict_equals(&five_text));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::Boolean(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn compare_text_and_numbers() {
        let a = Value::Text("apple".to_string());
        let b = Value::Text("banana".to_string());
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(Value::Text("10".to_string()).compare(&Value::Number(9.0)), Some(Ordering::Greater));
        assert_eq!(Value::Undefined.compare(&Value::Number(1.0)), None);
    }

    #[test]
    fn to_fixed_uses_exact_binary_value() {
        // 1.005 is stored as 1.00499999999999989...
        assert_eq!(to_fixed(1.005, 2), "1.00");
        // Exact ties round away from zero
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(-2.5, 0), "-3");
        assert_eq!(to_fixed(9.995, 2), "9.99");
        assert_eq!(to_fixed(99.5, 0), "100");
        assert_eq!(to_fixed(1.0, 3), "1.000");
        assert_eq!(to_fixed(-0.0, 1), "0.0");
        assert_eq!(round_to_precision(1.005, 2), 1.0);
        assert_eq!(round_to_precision(3.14159, 3), 3.142);
    }

    #[test]
    fn precision_is_capped() {
        let capped = to_fixed(1.5, usize::MAX);
        assert_eq!(capped, to_fixed(1.5, MAX_PRECISION as usize));
        assert_eq!(capped.len(), 2 + MAX_PRECISION as usize);
        assert_eq!(round_to_precision(1.5, u32::MAX), 1.5);
    }

    #[test]
    fn json_round_trip_keeps_undefined_as_null() {
        let value = Value::from_json(&json!({"a": [1, "x", null]}));
        assert!(matches!(value, Value::Object(_)));
        assert_eq!(Value::Undefined.to_json(), json!(null));
        assert_eq!(Value::Number(f64::NAN).to_json(), json!(null));
    }
}
