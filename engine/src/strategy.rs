//! FILENAME: engine/src/strategy.rs
//! PURPOSE: Strategy configuration, rule, context and result types.
//! CONTEXT: A strategy describes how a cell (or row) derives its value and
//! appearance: a base value source (formula / compute / static value), a
//! display decorator (text / prefix / suffix / unit), visual fields
//! (className / style / clickable / onClick) and an ordered list of
//! conditional rules that may override any of them.
//!
//! Strategies are deserialized from host JSON. Callbacks (compute, rule
//! predicates, onClick) cannot come from JSON and are attached with the
//! builder methods.

use crate::column::ColumnDefinition;
use crate::condition::Condition;
use crate::evaluator::resolve_path;
use crate::lenient;
use crate::value::{Value, MAX_PRECISION};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Marker class appended to clickable cells.
pub const CLICKABLE_CLASS: &str = "is-clickable";

pub type ComputeFn = Arc<dyn Fn(&StrategyContext<'_>) -> Value + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&StrategyContext<'_>) -> bool + Send + Sync>;
pub type ClickFn = Arc<dyn Fn(&StrategyContext<'_>) -> Result<(), StrategyError> + Send + Sync>;

/// CSS-like property map. Property order is irrelevant to rendering.
pub type StyleMap = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("click handler failed: {0}")]
    Handler(String),

    #[error("{callback} callback panicked: {message}")]
    Panicked { callback: String, message: String },
}

// ============================================================================
// CONTEXT
// ============================================================================

/// What every compute, predicate and click callback sees.
#[derive(Debug, Clone)]
pub struct StrategyContext<'a> {
    pub row: &'a serde_json::Value,
    pub row_index: usize,
    pub column: Option<&'a ColumnDefinition>,
    pub field: Option<&'a str>,
    /// The running value. Rules see the value left by earlier rules.
    pub value: Value,
}

impl<'a> StrategyContext<'a> {
    pub fn for_row(row: &'a serde_json::Value, row_index: usize) -> Self {
        StrategyContext {
            row,
            row_index,
            column: None,
            field: None,
            value: Value::Undefined,
        }
    }

    /// `None` reads the running value; `Some(path)` reads the row by dot-path.
    pub fn get_value(&self, path: Option<&str>) -> Value {
        match path {
            None => self.value.clone(),
            Some(path) => resolve_path(self.row, path),
        }
    }
}

// ============================================================================
// STRATEGY CONFIG
// ============================================================================

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(skip)]
    pub compute: Option<ComputeFn>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub formula: Option<String>,
    #[serde(default, deserialize_with = "deserialize_precision")]
    pub precision: Option<u32>,

    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub suffix: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub unit_separator: Option<String>,

    #[serde(default, deserialize_with = "deserialize_class_name")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_style")]
    pub style: Option<StyleMap>,
    #[serde(default, deserialize_with = "lenient::optional_bool")]
    pub clickable: Option<bool>,
    #[serde(skip)]
    pub on_click: Option<ClickFn>,
    #[serde(default, deserialize_with = "lenient::optional_bool")]
    pub stop_propagation: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_rules")]
    pub rules: Vec<StrategyRule>,
}

impl StrategyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_compute<F>(mut self, compute: F) -> Self
    where
        F: Fn(&StrategyContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.compute = Some(Arc::new(compute));
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision.min(MAX_PRECISION));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_unit_separator(mut self, separator: impl Into<String>) -> Self {
        self.unit_separator = Some(separator.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style
            .get_or_insert_with(StyleMap::new)
            .insert(property.into(), value.into());
        self
    }

    pub fn with_clickable(mut self, clickable: bool) -> Self {
        self.clickable = Some(clickable);
        self
    }

    pub fn with_on_click<F>(mut self, on_click: F) -> Self
    where
        F: Fn(&StrategyContext<'_>) -> Result<(), StrategyError> + Send + Sync + 'static,
    {
        self.on_click = Some(Arc::new(on_click));
        self
    }

    pub fn with_stop_propagation(mut self, stop: bool) -> Self {
        self.stop_propagation = Some(stop);
        self
    }

    pub fn with_rule(mut self, rule: StrategyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Supplies a formula, compute callback or static value.
    pub fn has_value_source(&self) -> bool {
        self.formula.is_some() || self.compute.is_some() || self.value.is_some()
    }

    /// Supplies any display decorator field.
    pub fn has_decorator(&self) -> bool {
        self.text.is_some() || self.prefix.is_some() || self.suffix.is_some() || self.unit.is_some()
    }

    /// Supplies any visual field.
    pub fn has_visual(&self) -> bool {
        self.class_name.is_some()
            || self.style.is_some()
            || self.clickable.is_some()
            || self.on_click.is_some()
            || self.stop_propagation.is_some()
    }
}

impl fmt::Debug for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfig")
            .field("value", &self.value)
            .field("compute", &self.compute.as_ref().map(|_| "<fn>"))
            .field("formula", &self.formula)
            .field("precision", &self.precision)
            .field("text", &self.text)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("unit", &self.unit)
            .field("unit_separator", &self.unit_separator)
            .field("class_name", &self.class_name)
            .field("style", &self.style)
            .field("clickable", &self.clickable)
            .field("on_click", &self.on_click.as_ref().map(|_| "<fn>"))
            .field("stop_propagation", &self.stop_propagation)
            .field("rules", &self.rules)
            .finish()
    }
}

// ============================================================================
// RULES
// ============================================================================

/// When a rule applies.
#[derive(Clone)]
pub enum RuleCondition {
    /// A literal boolean; a missing `when` is `Always(true)`.
    Always(bool),
    /// A host callback.
    Predicate(PredicateFn),
    /// A declarative condition tree. Malformed trees evaluate to false.
    Tree(Condition),
}

impl Default for RuleCondition {
    fn default() -> Self {
        RuleCondition::Always(true)
    }
}

impl RuleCondition {
    pub fn from_json(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => RuleCondition::Always(true),
            serde_json::Value::Bool(b) => RuleCondition::Always(*b),
            other => RuleCondition::Tree(Condition::from_json(other)),
        }
    }

    pub fn matches(&self, ctx: &StrategyContext<'_>) -> bool {
        match self {
            RuleCondition::Always(b) => *b,
            RuleCondition::Predicate(predicate) => guard("when", false, || predicate(ctx)),
            RuleCondition::Tree(condition) => condition.evaluate(ctx),
        }
    }
}

impl fmt::Debug for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCondition::Always(b) => write!(f, "Always({})", b),
            RuleCondition::Predicate(_) => write!(f, "Predicate(<fn>)"),
            RuleCondition::Tree(condition) => write!(f, "Tree({:?})", condition),
        }
    }
}

impl<'de> Deserialize<'de> for RuleCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(RuleCondition::from_json(&raw))
    }
}

/// A conditional overlay: when `when` holds, `apply` is layered on top.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyRule {
    #[serde(default)]
    pub when: RuleCondition,
    #[serde(flatten)]
    pub apply: StrategyConfig,
}

impl StrategyRule {
    pub fn new(when: RuleCondition, apply: StrategyConfig) -> Self {
        StrategyRule { when, apply }
    }

    pub fn always(apply: StrategyConfig) -> Self {
        StrategyRule::new(RuleCondition::Always(true), apply)
    }

    pub fn when<F>(predicate: F, apply: StrategyConfig) -> Self
    where
        F: Fn(&StrategyContext<'_>) -> bool + Send + Sync + 'static,
    {
        StrategyRule::new(RuleCondition::Predicate(Arc::new(predicate)), apply)
    }

    pub fn when_condition(condition: Condition, apply: StrategyConfig) -> Self {
        StrategyRule::new(RuleCondition::Tree(condition), apply)
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Clone)]
pub struct CellStrategyResult {
    pub value: Value,
    pub display_value: Value,
    pub has_display_override: bool,
    pub class_name: String,
    pub style: Option<StyleMap>,
    pub clickable: bool,
    pub on_click: Option<ClickFn>,
    pub stop_propagation: bool,
}

impl CellStrategyResult {
    /// Runs the click handler, if any. Failures are logged, never raised.
    pub fn dispatch_click(&self, ctx: &StrategyContext<'_>) -> bool {
        dispatch_click(self.on_click.as_ref(), ctx)
    }
}

impl fmt::Debug for CellStrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellStrategyResult")
            .field("value", &self.value)
            .field("display_value", &self.display_value)
            .field("has_display_override", &self.has_display_override)
            .field("class_name", &self.class_name)
            .field("style", &self.style)
            .field("clickable", &self.clickable)
            .field("on_click", &self.on_click.as_ref().map(|_| "<fn>"))
            .field("stop_propagation", &self.stop_propagation)
            .finish()
    }
}

#[derive(Clone)]
pub struct RowStrategyResult {
    pub class_name: String,
    pub style: Option<StyleMap>,
    pub clickable: bool,
    pub on_click: Option<ClickFn>,
    pub stop_propagation: bool,
}

impl RowStrategyResult {
    pub fn dispatch_click(&self, ctx: &StrategyContext<'_>) -> bool {
        dispatch_click(self.on_click.as_ref(), ctx)
    }
}

impl fmt::Debug for RowStrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStrategyResult")
            .field("class_name", &self.class_name)
            .field("style", &self.style)
            .field("clickable", &self.clickable)
            .field("on_click", &self.on_click.as_ref().map(|_| "<fn>"))
            .field("stop_propagation", &self.stop_propagation)
            .finish()
    }
}

// ============================================================================
// VISUAL ACCUMULATOR
// ============================================================================

/// Space-separated class tokens, de-duplicated, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn push(&mut self, class_name: &str) {
        for token in class_name.split_whitespace() {
            if !self.0.iter().any(|existing| existing == token) {
                self.0.push(token.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self) -> String {
        self.0.join(" ")
    }
}

/// Joins two className values token-wise.
pub fn merge_class_names(base: Option<&str>, overlay: Option<&str>) -> Option<String> {
    let mut list = ClassList::default();
    for part in [base, overlay].into_iter().flatten() {
        list.push(part);
    }
    if list.is_empty() {
        None
    } else {
        Some(list.join())
    }
}

/// Running visual state while a strategy and its rules are layered.
#[derive(Clone)]
pub(crate) struct VisualState {
    pub classes: ClassList,
    pub style: Option<StyleMap>,
    pub clickable: bool,
    pub on_click: Option<ClickFn>,
    pub stop_propagation: bool,
}

impl VisualState {
    pub fn new() -> Self {
        VisualState {
            classes: ClassList::default(),
            style: None,
            clickable: false,
            on_click: None,
            stop_propagation: true,
        }
    }

    pub fn apply(&mut self, source: &StrategyConfig) {
        if let Some(class_name) = &source.class_name {
            self.classes.push(class_name);
        }
        if let Some(style) = &source.style {
            let target = self.style.get_or_insert_with(StyleMap::new);
            for (property, value) in style {
                target.insert(property.clone(), value.clone());
            }
        }
        if source.clickable == Some(true) {
            self.clickable = true;
        }
        if let Some(handler) = &source.on_click {
            self.on_click = Some(handler.clone());
            self.clickable = true;
        }
        if let Some(stop) = source.stop_propagation {
            self.stop_propagation = stop;
        }
    }
}

// ============================================================================
// CALLBACK GUARDS
// ============================================================================

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs a host callback, replacing a panic with `fallback`.
pub(crate) fn guard<T>(callback: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            crate::log_warn!(
                "STRATEGY",
                "{} callback panicked: {}",
                callback,
                panic_message(payload.as_ref())
            );
            fallback
        }
    }
}

/// Invokes a click handler, reporting failures and panics as errors.
pub fn try_dispatch_click(handler: &ClickFn, ctx: &StrategyContext<'_>) -> Result<(), StrategyError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(StrategyError::Panicked {
            callback: "onClick".to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Invokes a click handler if present. Returns whether it ran cleanly.
pub fn dispatch_click(handler: Option<&ClickFn>, ctx: &StrategyContext<'_>) -> bool {
    let Some(handler) = handler else {
        return false;
    };
    match try_dispatch_click(handler, ctx) {
        Ok(()) => true,
        Err(e) => {
            crate::log_warn!("STRATEGY", "row {}: {}", ctx.row_index, e);
            false
        }
    }
}

// ============================================================================
// DESERIALIZATION HELPERS
// ============================================================================

fn deserialize_precision<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let precision = Value::from_json(&raw).to_number();
    if raw.is_null() || !precision.is_finite() || precision < 0.0 {
        return Ok(None);
    }
    Ok(Some(precision.trunc().min(f64::from(MAX_PRECISION)) as u32))
}

fn deserialize_class_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(parts) => {
            let mut list = ClassList::default();
            for part in parts.iter().filter_map(|p| p.as_str()) {
                list.push(part);
            }
            Some(list.join())
        }
        _ => None,
    })
}

/// Object of scalars; numbers and booleans are stringified, nulls dropped.
fn deserialize_style<'de, D>(deserializer: D) -> Result<Option<StyleMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Object(map) = raw else {
        return Ok(None);
    };
    let style = map
        .iter()
        .filter_map(|(property, value)| match value {
            serde_json::Value::String(s) => Some((property.clone(), s.clone())),
            serde_json::Value::Number(n) => Some((property.clone(), n.to_string())),
            serde_json::Value::Bool(b) => Some((property.clone(), b.to_string())),
            _ => None,
        })
        .collect();
    Ok(Some(style))
}

/// A rule list. Entries that are not objects are dropped.
pub(crate) fn deserialize_rules<'de, D>(deserializer: D) -> Result<Vec<StrategyRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(rules_from_json(&raw))
}

pub(crate) fn rules_from_json(raw: &serde_json::Value) -> Vec<StrategyRule> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match serde_json::from_value::<StrategyRule>(item.clone()) {
            Ok(rule) => Some(rule),
            Err(e) => {
                crate::log_debug!("STRATEGY", "dropping malformed rule: {}", e);
                None
            }
        })
        .collect()
}
