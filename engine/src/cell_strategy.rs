//! FILENAME: engine/src/cell_strategy.rs
//! PURPOSE: Resolves the effective strategy of a cell and applies it to a row.
//! CONTEXT: Three sources may configure a cell, lowest precedence first:
//!   1. grid.cellStrategy[field]        (legacy per-field map)
//!   2. grid.strategy.columns[field]    (structured per-field map)
//!   3. column.strategy                 (embedded in the column definition)
//! They are merged once per (grid, column, field) and memoized by the
//! strategy cache; `apply_cell_strategy` then runs per row.
//!
//! APPLICATION ORDER:
//! - Base value: formula -> compute -> value -> raw cell value
//! - Base visual fields, then matching rules in order. A rule's value source
//!   replaces the running value before later rules are tested.
//! - The last decorator source (text/prefix/suffix/unit) formats the display.

use crate::column::ColumnDefinition;
use crate::evaluator::evaluate_formula;
use crate::grid_config::{FieldStrategyMap, GridConfig};
use crate::strategy::{
    guard, merge_class_names, CellStrategyResult, StrategyConfig, StrategyContext, VisualState,
    CLICKABLE_CLASS,
};
use crate::strategy_cache::StrategyCache;
use crate::value::{round_to_precision, to_fixed, Value};
use std::sync::Arc;

/// Everything needed to resolve one cell.
#[derive(Debug, Clone)]
pub struct CellStrategyInput<'a> {
    pub column: &'a ColumnDefinition,
    /// Field being rendered. Defaults to the column's dataIndex, then key.
    pub field: Option<&'a str>,
    pub grid: Option<&'a GridConfig>,
    pub row: &'a serde_json::Value,
    pub row_index: usize,
    pub raw_value: Value,
}

impl<'a> CellStrategyInput<'a> {
    pub fn new(column: &'a ColumnDefinition, row: &'a serde_json::Value, row_index: usize) -> Self {
        CellStrategyInput {
            column,
            field: None,
            grid: None,
            row,
            row_index,
            raw_value: Value::Undefined,
        }
    }

    pub fn with_field(mut self, field: &'a str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_grid(mut self, grid: &'a GridConfig) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_raw_value(mut self, raw_value: Value) -> Self {
        self.raw_value = raw_value;
        self
    }

    /// The field name rules and callbacks see.
    pub fn effective_field(&self) -> Option<&'a str> {
        self.column.strategy_lookup_keys(self.field).first().copied()
    }
}

// ============================================================================
// MERGE
// ============================================================================

fn lookup<'m>(map: &'m FieldStrategyMap, keys: &[&str]) -> Option<&'m StrategyConfig> {
    keys.iter().find_map(|k| map.get(*k))
}

/// Layers `overlay` on top of `base`. Rules concatenate, className merges
/// token-wise, style merges per property, everything else is replaced.
pub fn merge_strategy(base: &StrategyConfig, overlay: &StrategyConfig) -> StrategyConfig {
    let style = match (&base.style, &overlay.style) {
        (Some(lower), Some(upper)) => {
            let mut merged = lower.clone();
            merged.extend(upper.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(merged)
        }
        (lower, upper) => upper.clone().or_else(|| lower.clone()),
    };

    let mut rules = base.rules.clone();
    rules.extend(overlay.rules.iter().cloned());

    StrategyConfig {
        value: overlay.value.clone().or_else(|| base.value.clone()),
        compute: overlay.compute.clone().or_else(|| base.compute.clone()),
        formula: overlay.formula.clone().or_else(|| base.formula.clone()),
        precision: overlay.precision.or(base.precision),
        text: overlay.text.clone().or_else(|| base.text.clone()),
        prefix: overlay.prefix.clone().or_else(|| base.prefix.clone()),
        suffix: overlay.suffix.clone().or_else(|| base.suffix.clone()),
        unit: overlay.unit.clone().or_else(|| base.unit.clone()),
        unit_separator: overlay
            .unit_separator
            .clone()
            .or_else(|| base.unit_separator.clone()),
        class_name: merge_class_names(base.class_name.as_deref(), overlay.class_name.as_deref()),
        style,
        clickable: overlay.clickable.or(base.clickable),
        on_click: overlay.on_click.clone().or_else(|| base.on_click.clone()),
        stop_propagation: overlay.stop_propagation.or(base.stop_propagation),
        rules,
    }
}

/// Merges the strategy sources that apply to a cell. `None` when no source
/// configures it.
pub fn merge_cell_strategy(
    column: &ColumnDefinition,
    field: Option<&str>,
    grid: Option<&GridConfig>,
) -> Option<StrategyConfig> {
    let keys = column.strategy_lookup_keys(field);

    let legacy = grid
        .and_then(|g| g.cell_strategy.as_deref())
        .and_then(|map| lookup(map, &keys));
    let structured = grid
        .and_then(|g| g.strategy.as_deref())
        .and_then(|s| lookup(&s.columns, &keys));
    let embedded = column.strategy.as_deref();

    [legacy, structured, embedded]
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<StrategyConfig>, source| match acc {
            None => Some(source.clone()),
            Some(base) => Some(merge_strategy(&base, source)),
        })
}

// ============================================================================
// APPLICATION
// ============================================================================

fn clamp_precision(value: Value, precision: Option<u32>) -> Value {
    match (value, precision) {
        (Value::Number(n), Some(digits)) if n.is_finite() => Value::Number(round_to_precision(n, digits)),
        (other, _) => other,
    }
}

/// Evaluates the value sources of `source` in order. Sources that produce
/// undefined fall through to the next.
fn resolve_value_source(source: &StrategyConfig, ctx: &StrategyContext<'_>) -> Option<Value> {
    if let Some(formula) = &source.formula {
        let value = evaluate_formula(formula, ctx.row);
        if !value.is_undefined() {
            return Some(value);
        }
    }
    if let Some(compute) = &source.compute {
        let value = guard("compute", Value::Undefined, || compute(ctx));
        if !value.is_undefined() {
            return Some(value);
        }
    }
    source.value.clone()
}

fn decorate(value: &Value, decorator: &StrategyConfig, base: &StrategyConfig) -> Value {
    if let Some(text) = &decorator.text {
        return Value::Text(text.clone());
    }

    let precision = decorator.precision.or(base.precision);
    let value_text = match (value, precision) {
        (Value::Number(n), Some(digits)) => to_fixed(*n, digits as usize),
        _ => value.display_text(),
    };

    let mut out = String::new();
    out.push_str(decorator.prefix.as_deref().unwrap_or(""));
    out.push_str(&value_text);
    if let Some(unit) = decorator.unit.as_deref().filter(|u| !u.is_empty()) {
        let separator = decorator
            .unit_separator
            .as_deref()
            .or(base.unit_separator.as_deref())
            .unwrap_or("");
        out.push_str(separator);
        out.push_str(unit);
    }
    out.push_str(decorator.suffix.as_deref().unwrap_or(""));
    Value::Text(out)
}

/// Applies a merged strategy to one cell.
pub fn apply_cell_strategy(strategy: &StrategyConfig, input: &CellStrategyInput<'_>) -> CellStrategyResult {
    let mut ctx = StrategyContext {
        row: input.row,
        row_index: input.row_index,
        column: Some(input.column),
        field: input.effective_field(),
        value: input.raw_value.clone(),
    };

    let base_value = resolve_value_source(strategy, &ctx).unwrap_or_else(|| input.raw_value.clone());
    let mut running = clamp_precision(base_value, strategy.precision);

    let mut visual = VisualState::new();
    visual.apply(strategy);

    let mut decorator: Option<&StrategyConfig> = strategy.has_decorator().then_some(strategy);

    for rule in &strategy.rules {
        ctx.value = running.clone();
        if !rule.when.matches(&ctx) {
            continue;
        }
        visual.apply(&rule.apply);
        if rule.apply.has_value_source() {
            if let Some(value) = resolve_value_source(&rule.apply, &ctx) {
                running = clamp_precision(value, rule.apply.precision.or(strategy.precision));
            }
        }
        if rule.apply.has_decorator() {
            decorator = Some(&rule.apply);
        }
    }

    let (display_value, has_display_override) = match decorator {
        Some(source) => (decorate(&running, source, strategy), true),
        None => (running.clone(), false),
    };

    if visual.clickable {
        visual.classes.push(CLICKABLE_CLASS);
    }

    CellStrategyResult {
        value: running,
        display_value,
        has_display_override,
        class_name: visual.classes.join(),
        style: visual.style,
        clickable: visual.clickable,
        on_click: visual.on_click,
        stop_propagation: visual.stop_propagation,
    }
}

/// Resolves a cell through the cache. `None` when no strategy applies.
pub fn resolve_cell_strategy_result(
    cache: &mut StrategyCache,
    input: &CellStrategyInput<'_>,
) -> Option<CellStrategyResult> {
    let strategy: Arc<StrategyConfig> = cache.cell_strategy(input.column, input.field, input.grid)?;
    Some(apply_cell_strategy(&strategy, input))
}
