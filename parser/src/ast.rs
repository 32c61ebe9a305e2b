//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The evaluator in the engine crate
//! then walks this tree against a row object.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: numbers, strings, booleans, null, undefined
//! - Field paths: amount, order.total
//! - Unary operations: ! + -
//! - Binary operations: + - * / % == === != !== < <= > >=
//! - Logical operations: && || (short-circuit)
//! - Conditionals: cond ? a : b
//! - Function calls: SUM(a, b), ROUND(price, 2)

/// Represents a parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal constant.
    Literal(Literal),

    /// A dotted field path resolved against the row ("order.total").
    Identifier(String),

    /// A unary operation: op operand (e.g., -price, !done).
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// A binary operation: left op right (e.g., qty * price).
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A short-circuiting logical operation. Evaluates to one of its operands.
    Logical {
        left: Box<Expression>,
        op: LogicalOperator,
        right: Box<Expression>,
    },

    /// test ? consequent : alternate
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// A helper call like SUM(a, b) or IF(a > b, a, b).
    Call { name: String, args: Vec<Expression> },
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
}

/// Binary operators, grouped by precedence level (lowest first).
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    // Equality
    Equal,          // ==
    StrictEqual,    // ===
    NotEqual,       // !=
    StrictNotEqual, // !==

    // Relational
    LessThan,     // <
    LessEqual,    // <=
    GreaterThan,  // >
    GreaterEqual, // >=

    // Additive
    Add,      // +
    Subtract, // -

    // Multiplicative
    Multiply,  // *
    Divide,    // /
    Remainder, // %
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LogicalOperator {
    And, // &&
    Or,  // ||
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Not,    // !
    Plus,   // +
    Negate, // -
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::StrictEqual => "===",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::StrictNotEqual => "!==",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
        };
        write!(f, "{}", symbol)
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
            Literal::Undefined => write!(f, "undefined"),
        }
    }
}
