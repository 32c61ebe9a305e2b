//! FILENAME: parser/src/cache.rs
//! PURPOSE: Memoizes compiled formulas by source string.
//! CONTEXT: The same column formula is compiled once and evaluated for every
//! visible row, so the compiled AST is cached. The cache is bounded and evicts
//! the oldest inserted entry first. Failures are cached too, so a broken
//! formula is not re-parsed on every row.

use crate::ast::Expression;
use crate::parser::parse;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default number of compiled formulas kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Outcome of compiling one source string. `None` means "uncompilable".
pub type Compiled = Option<Arc<Expression>>;

#[derive(Debug)]
pub struct FormulaCache {
    entries: FxHashMap<String, Compiled>,
    /// Insertion order, oldest at front
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        FormulaCache {
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the compiled form of `source`, parsing it on a miss.
    pub fn compile(&mut self, source: &str) -> Compiled {
        if let Some(compiled) = self.entries.get(source) {
            self.hits += 1;
            return compiled.clone();
        }

        self.misses += 1;
        let compiled = parse(source).ok().map(Arc::new);
        self.insert(source.to_string(), compiled.clone());
        compiled
    }

    fn insert(&mut self, source: String, compiled: Compiled) {
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(source.clone());
        self.entries.insert(source, compiled);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// (hits, misses) since creation or the last clear.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for FormulaCache {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED_CACHE: Lazy<Mutex<FormulaCache>> = Lazy::new(|| Mutex::new(FormulaCache::new()));

/// Compiles a formula through the process-wide cache.
/// Blank input and parse failures both yield `None`.
pub fn compile_formula(source: &str) -> Compiled {
    if source.trim().is_empty() {
        return None;
    }
    match SHARED_CACHE.lock() {
        Ok(mut cache) => cache.compile(source),
        // Poisoned lock: compile without caching
        Err(_) => parse(source).ok().map(Arc::new),
    }
}

/// Drops every entry of the process-wide cache.
pub fn clear_formula_cache() {
    if let Ok(mut cache) = SHARED_CACHE.lock() {
        cache.clear();
    }
}
