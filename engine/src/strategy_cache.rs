//! FILENAME: engine/src/strategy_cache.rs
//! PURPOSE: Memoizes merged cell strategies and collected row rules.
//! CONTEXT: Resolving a cell merges up to three strategy sources; doing that
//! for every visible cell on every render is wasteful. Entries are keyed by
//! grid handle, then column handle, then field name, and remember the `Arc`
//! of every source they were built from. A lookup is a hit only while all
//! of those pointers are unchanged, so replacing a source invalidates the
//! entry on its next lookup without any explicit teardown.
//!
//! Handles are never reused, so entries for dropped grids or columns are
//! only garbage; `retire_grid` / `retire_column` reclaim them.

use crate::column::{ColumnDefinition, ColumnId};
use crate::grid_config::{FieldStrategyMap, GridConfig, GridId, GridStrategy};
use crate::strategy::{StrategyConfig, StrategyRule};
use rustc_hash::FxHashMap;
use std::sync::Arc;

fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Debug, Clone)]
struct CellCacheEntry {
    column_strategy: Option<Arc<StrategyConfig>>,
    legacy_strategy: Option<Arc<FieldStrategyMap>>,
    strategy_config: Option<Arc<GridStrategy>>,
    value: Option<Arc<StrategyConfig>>,
}

#[derive(Debug, Clone)]
struct RowCacheEntry {
    strategy_config: Option<Arc<GridStrategy>>,
    row_strategy: Option<Arc<Vec<StrategyRule>>>,
    rules: Arc<Vec<StrategyRule>>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

type FieldEntries = FxHashMap<String, CellCacheEntry>;

/// Strategy cache. Owned by the caller; one per table is typical.
#[derive(Debug, Default)]
pub struct StrategyCache {
    /// `None` holds columns resolved without a grid configuration.
    cells: FxHashMap<Option<GridId>, FxHashMap<ColumnId, FieldEntries>>,
    rows: FxHashMap<GridId, RowCacheEntry>,
    stats: CacheStats,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the merged strategy for a cell, reusing the cached `Arc` while
    /// none of its sources were replaced. `None` when nothing configures it.
    pub fn cell_strategy(
        &mut self,
        column: &ColumnDefinition,
        field: Option<&str>,
        grid: Option<&GridConfig>,
    ) -> Option<Arc<StrategyConfig>> {
        let field_key = column
            .strategy_lookup_keys(field)
            .first()
            .copied()
            .unwrap_or("")
            .to_string();
        let legacy = grid.and_then(|g| g.cell_strategy.clone());
        let structured = grid.and_then(|g| g.strategy.clone());

        let entries = self
            .cells
            .entry(grid.map(|g| g.id))
            .or_default()
            .entry(column.id)
            .or_default();

        if let Some(entry) = entries.get(&field_key) {
            if same(&entry.column_strategy, &column.strategy)
                && same(&entry.legacy_strategy, &legacy)
                && same(&entry.strategy_config, &structured)
            {
                self.stats.hits += 1;
                return entry.value.clone();
            }
        }

        self.stats.misses += 1;
        let value = crate::cell_strategy::merge_cell_strategy(column, field, grid).map(Arc::new);
        entries.insert(
            field_key,
            CellCacheEntry {
                column_strategy: column.strategy.clone(),
                legacy_strategy: legacy,
                strategy_config: structured,
                value: value.clone(),
            },
        );
        value
    }

    /// Returns the row rules of a grid: `strategy.rows` then `rowStrategy`.
    pub fn row_rules(&mut self, grid: Option<&GridConfig>) -> Arc<Vec<StrategyRule>> {
        let Some(grid) = grid else {
            return Arc::new(Vec::new());
        };

        if let Some(entry) = self.rows.get(&grid.id) {
            if same(&entry.strategy_config, &grid.strategy) && same(&entry.row_strategy, &grid.row_strategy) {
                self.stats.hits += 1;
                return entry.rules.clone();
            }
        }

        self.stats.misses += 1;
        let mut rules: Vec<StrategyRule> = grid
            .strategy
            .as_ref()
            .map(|s| s.rows.clone())
            .unwrap_or_default();
        if let Some(legacy) = &grid.row_strategy {
            rules.extend(legacy.iter().cloned());
        }
        let rules = Arc::new(rules);
        self.rows.insert(
            grid.id,
            RowCacheEntry {
                strategy_config: grid.strategy.clone(),
                row_strategy: grid.row_strategy.clone(),
                rules: rules.clone(),
            },
        );
        rules
    }

    /// Drops everything cached for a grid.
    pub fn retire_grid(&mut self, grid: GridId) {
        self.cells.remove(&Some(grid));
        self.rows.remove(&grid);
    }

    /// Drops everything cached for a column, under every grid.
    pub fn retire_column(&mut self, column: ColumnId) {
        for columns in self.cells.values_mut() {
            columns.remove(&column);
        }
        self.cells.retain(|_, columns| !columns.is_empty());
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.rows.clear();
    }

    /// Number of cached cell entries across all grids and columns.
    pub fn cell_entries(&self) -> usize {
        self.cells
            .values()
            .flat_map(|columns| columns.values())
            .map(|fields| fields.len())
            .sum()
    }

    pub fn row_entries(&self) -> usize {
        self.rows.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_config::GridStrategy;

    fn grid_with_amount(class_name: &str) -> GridConfig {
        GridConfig::new().with_strategy(
            GridStrategy::default().with_column("amount", StrategyConfig::new().with_class_name(class_name)),
        )
    }

    #[test]
    fn hit_returns_identical_arc() {
        let mut cache = StrategyCache::new();
        let grid = grid_with_amount("num");
        let column = ColumnDefinition::new("amount");

        let first = cache.cell_strategy(&column, None, Some(&grid)).unwrap();
        let second = cache.cell_strategy(&column, None, Some(&grid)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn replacing_grid_strategy_forces_recompute() {
        let mut cache = StrategyCache::new();
        let mut grid = grid_with_amount("num");
        let column = ColumnDefinition::new("amount");

        let first = cache.cell_strategy(&column, None, Some(&grid)).unwrap();
        // Deep-equal replacement still invalidates
        let replacement = grid.strategy.as_deref().cloned().unwrap();
        grid.strategy = Some(Arc::new(replacement));
        let second = cache.cell_strategy(&column, None, Some(&grid)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn replacing_column_strategy_forces_recompute() {
        let mut cache = StrategyCache::new();
        let mut column = ColumnDefinition::new("amount").with_strategy(StrategyConfig::new().with_prefix("$"));

        let first = cache.cell_strategy(&column, None, None).unwrap();
        column.strategy = Some(Arc::new(StrategyConfig::new().with_prefix("€")));
        let second = cache.cell_strategy(&column, None, None).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.prefix.as_deref(), Some("€"));
    }

    #[test]
    fn absent_strategy_is_cached_too() {
        let mut cache = StrategyCache::new();
        let column = ColumnDefinition::new("plain");
        assert!(cache.cell_strategy(&column, None, None).is_none());
        assert!(cache.cell_strategy(&column, None, None).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn entries_are_per_field() {
        let mut cache = StrategyCache::new();
        let grid = grid_with_amount("num");
        let column = ColumnDefinition::new("amount");
        cache.cell_strategy(&column, Some("amount"), Some(&grid));
        cache.cell_strategy(&column, Some("other"), Some(&grid));
        assert_eq!(cache.cell_entries(), 2);
    }

    #[test]
    fn row_rules_are_cached_and_ordered() {
        let mut cache = StrategyCache::new();
        let mut grid = GridConfig::new()
            .with_strategy(
                GridStrategy::default().with_row_rule(StrategyRule::always(StrategyConfig::new().with_class_name("a"))),
            )
            .with_row_strategy(vec![StrategyRule::always(StrategyConfig::new().with_class_name("b"))]);

        let first = cache.row_rules(Some(&grid));
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].apply.class_name.as_deref(), Some("a"));
        assert!(Arc::ptr_eq(&first, &cache.row_rules(Some(&grid))));

        grid.row_strategy = None;
        assert_eq!(cache.row_rules(Some(&grid)).len(), 1);
        assert!(cache.row_rules(None).is_empty());
    }

    #[test]
    fn retire_and_clear() {
        let mut cache = StrategyCache::new();
        let grid = grid_with_amount("num");
        let a = ColumnDefinition::new("amount");
        let b = ColumnDefinition::new("amount");
        cache.cell_strategy(&a, None, Some(&grid));
        cache.cell_strategy(&b, None, Some(&grid));
        cache.cell_strategy(&a, None, None);
        cache.row_rules(Some(&grid));
        assert_eq!(cache.cell_entries(), 3);

        cache.retire_column(a.id);
        assert_eq!(cache.cell_entries(), 1);

        cache.retire_grid(grid.id);
        assert_eq!(cache.cell_entries(), 0);
        assert_eq!(cache.row_entries(), 0);

        cache.cell_strategy(&a, None, None);
        cache.clear();
        assert_eq!(cache.cell_entries(), 0);
    }
}
