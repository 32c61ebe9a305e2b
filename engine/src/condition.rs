//! FILENAME: engine/src/condition.rs
//! PURPOSE: Declarative rule conditions.
//! CONTEXT: A rule's `when` may be a JSON condition tree such as
//! `{"and": [{"gt": 10}, {"field": "status", "in": ["open", "late"]}]}`.
//! The JSON is parsed once into `Condition`, then evaluated per row against
//! a `StrategyContext`. Without `field`, a comparison reads the running cell
//! value; children inherit their parent's field.

use crate::strategy::StrategyContext;
use crate::value::Value;
use regex::{Regex, RegexBuilder};

/// Operator keys in the order they are looked up. The first key present in
/// a condition object decides its meaning.
pub const OPERATOR_KEYS: [&str; 21] = [
    "and", "or", "not", "eq", "neq", "gt", "gte", "lt", "lte", "in", "notIn", "includes",
    "startsWith", "endsWith", "regex", "notRegex", "between", "empty", "notEmpty", "truthy",
    "falsy",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare { field: Option<String>, op: ConditionOp },
    /// Malformed input. Always false.
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOp {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Includes(Value),
    StartsWith(String),
    EndsWith(String),
    Regex(Pattern),
    NotRegex(Pattern),
    Between(Value, Value),
    Empty,
    NotEmpty,
    Truthy,
    Falsy,
}

/// A regex operand. Accepts `"pattern"` or `"/pattern/flags"`; the `i`, `m`
/// and `s` flags are honored. An invalid pattern never matches.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    regex: Option<Regex>,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Pattern {
    pub fn new(source: &str) -> Self {
        let (body, flags) = split_literal(source);
        let regex = RegexBuilder::new(body)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build();
        let regex = match regex {
            Ok(regex) => Some(regex),
            Err(e) => {
                crate::log_warn!("STRATEGY", "invalid regex condition '{}': {}", source, e);
                None
            }
        };
        Pattern {
            source: source.to_string(),
            regex,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn is_match(&self, text: &str) -> Option<bool> {
        self.regex.as_ref().map(|r| r.is_match(text))
    }
}

fn split_literal(source: &str) -> (&str, &str) {
    if let Some(rest) = source.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| "gimsuy".contains(c)) {
                return (&rest[..end], flags);
            }
        }
    }
    (source, "")
}

// ============================================================================
// PARSING
// ============================================================================

impl Condition {
    pub fn from_json(raw: &serde_json::Value) -> Condition {
        Condition::parse(raw, None)
    }

    fn parse(raw: &serde_json::Value, inherited: Option<&str>) -> Condition {
        let serde_json::Value::Object(map) = raw else {
            return Condition::Invalid;
        };
        let field = match map.get("field") {
            Some(serde_json::Value::String(f)) if !f.is_empty() => Some(f.as_str()),
            _ => inherited,
        };

        let Some(key) = OPERATOR_KEYS.iter().copied().find(|k| map.contains_key(*k)) else {
            return Condition::Invalid;
        };
        let operand = &map[key];

        match key {
            "and" | "or" => {
                let Some(items) = operand.as_array() else {
                    return Condition::Invalid;
                };
                let children = items.iter().map(|c| Condition::parse(c, field)).collect();
                if key == "and" {
                    Condition::And(children)
                } else {
                    Condition::Or(children)
                }
            }
            "not" => Condition::Not(Box::new(Condition::parse(operand, field))),
            _ => match parse_op(key, operand) {
                Some(op) => Condition::Compare {
                    field: field.map(str::to_string),
                    op,
                },
                None => Condition::Invalid,
            },
        }
    }
}

fn parse_op(key: &str, operand: &serde_json::Value) -> Option<ConditionOp> {
    let value = Value::from_json(operand);
    let flag = value.is_truthy();
    let op = match key {
        "eq" => ConditionOp::Eq(value),
        "neq" => ConditionOp::Neq(value),
        "gt" => ConditionOp::Gt(value),
        "gte" => ConditionOp::Gte(value),
        "lt" => ConditionOp::Lt(value),
        "lte" => ConditionOp::Lte(value),
        "in" => ConditionOp::In(as_list(value)),
        "notIn" => ConditionOp::NotIn(as_list(value)),
        "includes" => ConditionOp::Includes(value),
        "startsWith" => ConditionOp::StartsWith(value.display_text()),
        "endsWith" => ConditionOp::EndsWith(value.display_text()),
        "regex" => ConditionOp::Regex(Pattern::new(operand.as_str()?)),
        "notRegex" => ConditionOp::NotRegex(Pattern::new(operand.as_str()?)),
        "between" => match value {
            Value::Array(bounds) if bounds.len() >= 2 => {
                ConditionOp::Between(bounds[0].clone(), bounds[1].clone())
            }
            _ => return None,
        },
        "empty" if flag => ConditionOp::Empty,
        "empty" => ConditionOp::NotEmpty,
        "notEmpty" if flag => ConditionOp::NotEmpty,
        "notEmpty" => ConditionOp::Empty,
        "truthy" if flag => ConditionOp::Truthy,
        "truthy" => ConditionOp::Falsy,
        "falsy" if flag => ConditionOp::Falsy,
        "falsy" => ConditionOp::Truthy,
        _ => return None,
    };
    Some(op)
}

fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        single => vec![single],
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

impl Condition {
    pub fn evaluate(&self, ctx: &StrategyContext<'_>) -> bool {
        match self {
            Condition::And(children) => children.iter().all(|c| c.evaluate(ctx)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(ctx)),
            Condition::Not(inner) => match inner.as_ref() {
                Condition::Invalid => false,
                other => !other.evaluate(ctx),
            },
            Condition::Compare { field, op } => {
                let subject = ctx.get_value(field.as_deref());
                op.test(&subject)
            }
            Condition::Invalid => false,
        }
    }
}

impl ConditionOp {
    pub fn test(&self, subject: &Value) -> bool {
        match self {
            ConditionOp::Eq(target) => subject.loose_equals(target),
            ConditionOp::Neq(target) => !subject.loose_equals(target),
            ConditionOp::Gt(target) => subject.compare(target).is_some_and(|o| o.is_gt()),
            ConditionOp::Gte(target) => subject.compare(target).is_some_and(|o| o.is_ge()),
            ConditionOp::Lt(target) => subject.compare(target).is_some_and(|o| o.is_lt()),
            ConditionOp::Lte(target) => subject.compare(target).is_some_and(|o| o.is_le()),
            ConditionOp::In(list) => list.iter().any(|item| item.strict_equals(subject)),
            ConditionOp::NotIn(list) => !list.iter().any(|item| item.strict_equals(subject)),
            ConditionOp::Includes(target) => match subject {
                Value::Array(items) => items.iter().any(|item| item.strict_equals(target)),
                Value::Text(text) => text.contains(target.display_text().as_str()),
                _ => false,
            },
            ConditionOp::StartsWith(prefix) => {
                !subject.is_nullish() && subject.to_text().starts_with(prefix.as_str())
            }
            ConditionOp::EndsWith(suffix) => {
                !subject.is_nullish() && subject.to_text().ends_with(suffix.as_str())
            }
            ConditionOp::Regex(pattern) => pattern.is_match(&subject.display_text()).unwrap_or(false),
            ConditionOp::NotRegex(pattern) => pattern
                .is_match(&subject.display_text())
                .map(|m| !m)
                .unwrap_or(false),
            ConditionOp::Between(min, max) => {
                subject.compare(min).is_some_and(|o| o.is_ge())
                    && subject.compare(max).is_some_and(|o| o.is_le())
            }
            ConditionOp::Empty => subject.is_empty(),
            ConditionOp::NotEmpty => !subject.is_empty(),
            ConditionOp::Truthy => subject.is_truthy(),
            ConditionOp::Falsy => !subject.is_truthy(),
        }
    }
}
