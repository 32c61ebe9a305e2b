//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing, quoted strings with backslash
//! escapes, dotted field paths, and multi-character operators.
//!
//! SUPPORTED OPERATORS (matched longest-first):
//! - Three char: === !==
//! - Two char: >= <= && || == !=
//! - Single char: + - * / % > < ! ( ) , ? :
//!
//! Any other character yields Token::Illegal, which aborts tokenization.

use crate::parser::{ParseError, ParseResult};
use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('%') => Token::Percent,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some('?') => Token::Question,
            Some(':') => Token::Colon,

            Some('=') => self.read_equals_operator(),
            Some('!') => self.read_bang_operator(),
            Some('<') => self.read_relational(Token::LessThan, Token::LessEqual),
            Some('>') => self.read_relational(Token::GreaterThan, Token::GreaterEqual),
            Some('&') => self.read_doubled('&', Token::And),
            Some('|') => self.read_doubled('|', Token::Or),

            Some(quote @ ('"' | '\'')) => self.read_string(quote),

            Some(ch) if ch.is_ascii_digit() => self.read_number(ch),
            Some('.') if self.next_is(|c| c.is_ascii_digit()) => self.read_number('.'),

            Some(ch) if is_identifier_start(ch) => self.read_identifier(ch),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// True if the upcoming character satisfies `pred`.
    fn next_is(&self, pred: impl Fn(char) -> bool) -> bool {
        self.input.clone().peek().copied().map(&pred).unwrap_or(false)
    }

    /// True if the character after the upcoming one satisfies `pred`.
    fn second_is(&self, pred: impl Fn(char) -> bool) -> bool {
        let mut ahead = self.input.clone();
        ahead.next();
        ahead.peek().copied().map(&pred).unwrap_or(false)
    }

    /// Handles `==` and `===`. A lone `=` is not an operator.
    fn read_equals_operator(&mut self) -> Token {
        if self.input.peek() != Some(&'=') {
            return Token::Illegal('=');
        }
        self.input.next();
        if self.input.peek() == Some(&'=') {
            self.input.next();
            Token::StrictEqual
        } else {
            Token::Equal
        }
    }

    /// Handles `!`, `!=` and `!==`.
    fn read_bang_operator(&mut self) -> Token {
        if self.input.peek() != Some(&'=') {
            return Token::Bang;
        }
        self.input.next();
        if self.input.peek() == Some(&'=') {
            self.input.next();
            Token::StrictNotEqual
        } else {
            Token::NotEqual
        }
    }

    fn read_relational(&mut self, single: Token, with_equals: Token) -> Token {
        if self.input.peek() == Some(&'=') {
            self.input.next();
            with_equals
        } else {
            single
        }
    }

    /// `&&` and `||` only exist doubled.
    fn read_doubled(&mut self, ch: char, token: Token) -> Token {
        if self.input.peek() == Some(&ch) {
            self.input.next();
            token
        } else {
            Token::Illegal(ch)
        }
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            match ch {
                '\\' => match self.input.next() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some('r') => result.push('\r'),
                    Some(escaped) => result.push(escaped),
                    None => return Token::Illegal(quote),
                },
                c if c == quote => return Token::String(result),
                c => result.push(c),
            }
        }
        // Unterminated string literal
        Token::Illegal(quote)
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if is_identifier_part(ch) {
                ident.push(ch);
                self.input.next();
            } else if ch == '.' && self.second_is(is_identifier_start) {
                // Dotted field path: "order.total"
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match ident.to_ascii_lowercase().as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "undefined" => Token::Undefined,
            _ => Token::Identifier(ident),
        }
    }
}

/// Returns true if `ch` can start an identifier: letters, `_` and `$`.
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit()
}

/// Tokenizes the whole input. The first illegal character aborts the scan.
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        match lexer.next_token() {
            Token::EOF => {
                tokens.push(Token::EOF);
                return Ok(tokens);
            }
            Token::Illegal(ch) => {
                return Err(ParseError::new(format!("Illegal character: {}", ch)));
            }
            token => tokens.push(token),
        }
    }
}
