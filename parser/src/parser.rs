//! FILENAME: parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. The whole input
//! is tokenized up front; the parser then walks the token vector with an
//! explicit cursor.
//!
//! GRAMMAR (lowest precedence first):
//!   formula        --> ["="] conditional EOF
//!   conditional    --> logical_or ( "?" conditional ":" conditional )?
//!   logical_or     --> logical_and ( "||" logical_and )*
//!   logical_and    --> equality ( "&&" equality )*
//!   equality       --> relational ( ("==" | "===" | "!=" | "!==") relational )*
//!   relational     --> additive ( ("<" | "<=" | ">" | ">=") additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/" | "%") unary )*
//!   unary          --> ("!" | "+" | "-") unary | primary
//!   primary        --> NUMBER | STRING | BOOLEAN | NULL | UNDEFINED
//!                    | IDENTIFIER | function_call | "(" conditional ")"
//!   function_call  --> IDENTIFIER "(" ( conditional ("," conditional)* )? ")"

use crate::ast::{BinaryOperator, Expression, Literal, LogicalOperator, UnaryOperator};
use crate::lexer::tokenize;
use crate::token::Token;

/// Limit on AST depth: parentheses, unary operators, conditionals and every
/// operator in a left-associative chain each count one level.
pub const MAX_DEPTH: usize = 256;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// The Parser owns the token vector and a cursor into it.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Creates a parser over an already tokenized formula.
    /// The token vector is expected to end with Token::EOF.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Parses the entire token stream and returns the AST.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if *self.current() == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expr = self.parse_conditional()?;

        if *self.current() != Token::EOF {
            return Err(ParseError::new(format!(
                "Unexpected token after expression: {}",
                self.current()
            )));
        }

        Ok(expr)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::EOF)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "Expected {}, found {}",
                expected,
                self.current()
            )))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new("Expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn unwind(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// Parses `test ? consequent : alternate` (right associative).
    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        self.enter()?;
        let test = self.parse_logical_or()?;

        let expr = if *self.current() == Token::Question {
            self.advance();
            let consequent = self.parse_conditional()?;
            self.expect(Token::Colon)?;
            let alternate = self.parse_conditional()?;
            Expression::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        } else {
            test
        };

        self.leave();
        Ok(expr)
    }

    fn parse_logical_or(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_logical_and()?;

        while *self.current() == Token::Or {
            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_logical_and()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOperator::Or,
                right: Box::new(right),
            };
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_equality()?;

        while *self.current() == Token::And {
            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_equality()?;
            left = Expression::Logical {
                left: Box::new(left),
                op: LogicalOperator::And,
                right: Box::new(right),
            };
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.current() {
                Token::Equal => BinaryOperator::Equal,
                Token::StrictEqual => BinaryOperator::StrictEqual,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::StrictNotEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };

            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_relational()?;
            left = binary(left, op, right);
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_relational(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current() {
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut wrapped = 0;
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current() {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Remainder,
                _ => break,
            };

            self.advance();
            self.enter()?;
            wrapped += 1;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }

        self.unwind(wrapped);
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current() {
            Token::Bang => UnaryOperator::Not,
            Token::Plus => UnaryOperator::Plus,
            Token::Minus => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };

        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();

        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parses primary expressions (literals, identifiers, calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(n)))
            }

            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }

            Token::Boolean(b) => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(b)))
            }

            Token::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }

            Token::Undefined => {
                self.advance();
                Ok(Expression::Literal(Literal::Undefined))
            }

            Token::Identifier(name) => {
                self.advance();

                if *self.current() == Token::LParen {
                    return self.parse_function_call(name);
                }

                Ok(Expression::Identifier(name))
            }

            Token::LParen => {
                self.advance();
                let expr = self.parse_conditional()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }

            Token::EOF => Err(ParseError::new("Unexpected end of expression")),

            Token::Illegal(ch) => Err(ParseError::new(format!("Illegal character: {}", ch))),

            token => Err(ParseError::new(format!("Unexpected token: {}", token))),
        }
    }

    /// Parses a function call like SUM(a, b, 10).
    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        // Consume the '('
        self.advance();

        let mut args = Vec::new();

        if *self.current() == Token::RParen {
            self.advance();
            return Ok(Expression::Call { name, args });
        }

        args.push(self.parse_conditional()?);

        while *self.current() == Token::Comma {
            self.advance();
            args.push(self.parse_conditional()?);
        }

        self.expect(Token::RParen)?;

        Ok(Expression::Call { name, args })
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Convenience function to parse a formula string directly.
/// Handles the optional leading '=' that marks a formula.
pub fn parse(input: &str) -> ParseResult<Expression> {
    let trimmed = input.trim_start();
    let body = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let tokens = tokenize(body)?;
    Parser::new(tokens).parse()
}
