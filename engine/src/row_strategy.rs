//! FILENAME: engine/src/row_strategy.rs
//! PURPOSE: Resolves row-level visual strategies.
//! CONTEXT: Rows have no value cascade. Rules from `strategy.rows` and the
//! legacy `rowStrategy` list are tested in order against a row-scoped
//! context (no column, no field, undefined value) and their visual fields
//! are layered like cell rules.

use crate::grid_config::GridConfig;
use crate::strategy::{RowStrategyResult, StrategyContext, VisualState};
use crate::strategy_cache::StrategyCache;

/// Resolves one row. `None` when no rule contributes a visual change.
pub fn resolve_row_strategy_result(
    cache: &mut StrategyCache,
    grid: Option<&GridConfig>,
    row: &serde_json::Value,
    row_index: usize,
) -> Option<RowStrategyResult> {
    let rules = cache.row_rules(grid);
    if rules.is_empty() {
        return None;
    }

    let ctx = StrategyContext::for_row(row, row_index);
    let mut visual = VisualState::new();
    let mut contributed = false;

    for rule in rules.iter() {
        if !rule.apply.has_visual() || !rule.when.matches(&ctx) {
            continue;
        }
        visual.apply(&rule.apply);
        contributed = true;
    }

    if !contributed {
        return None;
    }

    Some(RowStrategyResult {
        class_name: visual.classes.join(),
        style: visual.style,
        clickable: visual.clickable,
        on_click: visual.on_click,
        stop_propagation: visual.stop_propagation,
    })
}
