//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the table strategy engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell_strategy;
pub mod column;
pub mod condition;
pub mod evaluator;
pub mod grid_config;
pub mod lenient;
pub mod logging;
pub mod permission;
pub mod row_strategy;
pub mod strategy;
pub mod strategy_cache;
pub mod value;

// Re-export commonly used types at the crate root
pub use cell_strategy::{
    apply_cell_strategy, merge_cell_strategy, merge_strategy, resolve_cell_strategy_result,
    CellStrategyInput,
};
pub use column::{ColumnDefinition, ColumnId, FixedSide};
pub use condition::{Condition, ConditionOp, Pattern};
pub use evaluator::{evaluate_formula, resolve_path, EvalError, EvalResult, Evaluator};
pub use grid_config::{ColumnCustomPersistence, FieldStrategyMap, GridConfig, GridId, GridStrategy};
pub use permission::{
    evaluate_tool_permission, filter_permitted, filter_permitted_tools, AccessSource,
    PermissionArg, PermissionDirective, PermissionMode, PermissionOptions, ToolDefinition,
};
pub use row_strategy::resolve_row_strategy_result;
pub use strategy::{
    dispatch_click, CellStrategyResult, ClickFn, ComputeFn, PredicateFn, RowStrategyResult,
    RuleCondition, StrategyConfig, StrategyContext, StrategyError, StrategyRule, StyleMap,
    CLICKABLE_CLASS,
};
pub use strategy_cache::{CacheStats, StrategyCache};
pub use value::{number_to_text, round_to_precision, to_fixed, Value, MAX_PRECISION};
