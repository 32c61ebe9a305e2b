//! FILENAME: parser/src/lib.rs
//! PURPOSE: Library root for the table formula parser.
//! CONTEXT: This module exposes the lexer, parser, AST and compile cache
//! needed to convert cell formula strings into evaluatable expression trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: + - * / %
//! - Comparison: == === != !== < <= > >=
//! - Logical: && || ! (short-circuit, operand-returning)
//! - Conditional: cond ? a : b
//! - Dotted field paths: order.total
//! - Function calls: SUM(a, b), IF(a > b, a, b)
//! - Parentheses for grouping

pub mod ast;
pub mod cache;
pub mod lexer;
pub mod parser;
pub mod token;


pub use ast::{BinaryOperator, Expression, Literal, LogicalOperator, UnaryOperator};
pub use cache::{clear_formula_cache, compile_formula, Compiled, FormulaCache, DEFAULT_CACHE_CAPACITY};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, ParseError, ParseResult, Parser, MAX_DEPTH};
pub use token::Token;
