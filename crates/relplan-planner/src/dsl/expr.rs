//! Expression text → bound `Expr`.
//!
//! A small top-down operator precedence parser. Identifiers are resolved
//! against the input schema while parsing (case-sensitive, double quotes
//! allowed), so the result only contains column indexes.
//!
//! ```text
//! amount > 100 AND region = 'EU'
//! price * 1.2 AS gross
//! name IS NOT NULL OR NOT (id <> 7)
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use relplan_core::expr::{ArithOp, CompareOp, Expr};
use relplan_core::schema::Schema;
use relplan_core::types::Scalar;

use super::{DslError, Result};

const OR_PRECEDENCE: u8 = 5;
const AND_PRECEDENCE: u8 = 10;
const NOT_PRECEDENCE: u8 = 15;
const COMPARE_PRECEDENCE: u8 = 20;
const IS_PRECEDENCE: u8 = 25;
const ADD_PRECEDENCE: u8 = 30;
const MUL_PRECEDENCE: u8 = 40;
const UNARY_MINUS_PRECEDENCE: u8 = 50;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// Double-quoted identifier; never a keyword.
    Quoted(String),
    Number(String),
    Str(String),
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Mul,
    Div,
    LeftParen,
    RightParen,
    Eof,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) | Token::Number(s) => f.write_str(s),
            Token::Quoted(s) => write!(f, "\"{s}\""),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Eq => f.write_str("="),
            Token::Neq => f.write_str("<>"),
            Token::Lt => f.write_str("<"),
            Token::LtEq => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::GtEq => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Mul => f.write_str("*"),
            Token::Div => f.write_str("/"),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut chars: Peekable<Chars<'_>> = input.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let token = match c {
            '(' => single(&mut chars, Token::LeftParen),
            ')' => single(&mut chars, Token::RightParen),
            '+' => single(&mut chars, Token::Plus),
            '-' => single(&mut chars, Token::Minus),
            '*' => single(&mut chars, Token::Mul),
            '/' => single(&mut chars, Token::Div),
            '=' => {
                chars.next();
                // accept both = and ==
                chars.next_if_eq(&'=');
                Token::Eq
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err("expected '=' after '!'".into());
                }
                Token::Neq
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    Token::LtEq
                } else if chars.next_if_eq(&'>').is_some() {
                    Token::Neq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '\'' => Token::Str(delimited(&mut chars, '\'')?),
            '"' => Token::Quoted(delimited(&mut chars, '"')?),
            c if c.is_ascii_digit() || c == '.' => {
                let mut num = String::new();
                while let Some(c) = chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '.') {
                    num.push(c);
                }
                Token::Number(num)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    ident.push(c);
                }
                Token::Ident(ident)
            }
            other => return Err(format!("unexpected character '{other}'")),
        };
        tokens.push(token);
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn single(chars: &mut Peekable<Chars<'_>>, token: Token) -> Token {
    chars.next();
    token
}

/// Reads a quoted run; a doubled delimiter is an escaped delimiter.
fn delimited(chars: &mut Peekable<Chars<'_>>, delimiter: char) -> std::result::Result<String, String> {
    chars.next();
    let mut out = String::new();
    loop {
        match chars.next() {
            Some(c) if c == delimiter => {
                if chars.next_if_eq(&delimiter).is_some() {
                    out.push(delimiter);
                } else {
                    return Ok(out);
                }
            }
            Some(c) => out.push(c),
            None => return Err(format!("unterminated {delimiter}{out}")),
        }
    }
}

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    schema: &'s Schema,
}

impl<'s> Parser<'s> {
    fn new(text: &str, schema: &'s Schema) -> std::result::Result<Self, String> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
            schema,
        })
    }

    fn peek(&self) -> &Token {
        const EOF: &Token = &Token::Eof;
        self.tokens.get(self.pos).unwrap_or(EOF)
    }

    fn next_token(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> std::result::Result<(), String> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected {keyword}, found {}", self.peek()))
        }
    }

    fn expect_eof(&self) -> std::result::Result<(), String> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(format!("unexpected {other} after expression")),
        }
    }

    /// Main TDOP loop.
    fn parse_expr(&mut self, precedence: u8) -> std::result::Result<Expr, String> {
        let mut expr = self.parse_prefix()?;
        let mut next = self.next_precedence();
        while precedence < next {
            expr = self.parse_infix(expr, next)?;
            next = self.next_precedence();
        }
        Ok(expr)
    }

    fn parse_prefix(&mut self) -> std::result::Result<Expr, String> {
        match self.next_token() {
            t if t.is_keyword("NOT") => {
                Ok(Expr::Not(Box::new(self.parse_expr(NOT_PRECEDENCE)?)))
            }
            t if t.is_keyword("TRUE") => Ok(Expr::literal(Scalar::Bool(true))),
            t if t.is_keyword("FALSE") => Ok(Expr::literal(Scalar::Bool(false))),
            t if t.is_keyword("NULL") => Ok(Expr::literal(Scalar::Null)),
            Token::Ident(name) | Token::Quoted(name) => self.resolve(&name),
            Token::Number(num) => parse_number(&num).map(Expr::literal),
            Token::Str(s) => Ok(Expr::literal(Scalar::Str(s))),
            Token::Minus => match self.parse_expr(UNARY_MINUS_PRECEDENCE)? {
                Expr::Literal(Scalar::I32(v)) => Ok(Expr::literal(Scalar::I32(-v))),
                Expr::Literal(Scalar::I64(v)) => Ok(Expr::literal(Scalar::I64(-v))),
                Expr::Literal(Scalar::F64(v)) => Ok(Expr::literal(Scalar::F64(-v))),
                other => Ok(Expr::arithmetic(
                    ArithOp::Sub,
                    Expr::literal(Scalar::I32(0)),
                    other,
                )),
            },
            Token::Plus => self.parse_expr(UNARY_MINUS_PRECEDENCE),
            Token::LeftParen => {
                let expr = self.parse_expr(0)?;
                match self.next_token() {
                    Token::RightParen => Ok(expr),
                    other => Err(format!("expected ')', found {other}")),
                }
            }
            other => Err(format!("expected an operand, found {other}")),
        }
    }

    fn parse_infix(&mut self, left: Expr, precedence: u8) -> std::result::Result<Expr, String> {
        let token = self.next_token();
        if token.is_keyword("IS") {
            let negated = self.consume_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(if negated {
                Expr::IsNotNull(Box::new(left))
            } else {
                Expr::IsNull(Box::new(left))
            });
        }
        if token.is_keyword("AND") {
            let right = self.parse_expr(precedence)?;
            return Ok(flatten(left, right, true));
        }
        if token.is_keyword("OR") {
            let right = self.parse_expr(precedence)?;
            return Ok(flatten(left, right, false));
        }
        let op = match token {
            Token::Eq => BinaryOp::Compare(CompareOp::Eq),
            Token::Neq => BinaryOp::Compare(CompareOp::NotEq),
            Token::Lt => BinaryOp::Compare(CompareOp::Lt),
            Token::LtEq => BinaryOp::Compare(CompareOp::LtEq),
            Token::Gt => BinaryOp::Compare(CompareOp::Gt),
            Token::GtEq => BinaryOp::Compare(CompareOp::GtEq),
            Token::Plus => BinaryOp::Arith(ArithOp::Add),
            Token::Minus => BinaryOp::Arith(ArithOp::Sub),
            Token::Mul => BinaryOp::Arith(ArithOp::Mul),
            Token::Div => BinaryOp::Arith(ArithOp::Div),
            other => return Err(format!("expected an operator, found {other}")),
        };
        let right = self.parse_expr(precedence)?;
        Ok(match op {
            BinaryOp::Compare(op) => Expr::compare(op, left, right),
            BinaryOp::Arith(op) => Expr::arithmetic(op, left, right),
        })
    }

    fn next_precedence(&self) -> u8 {
        match self.peek() {
            t if t.is_keyword("OR") => OR_PRECEDENCE,
            t if t.is_keyword("AND") => AND_PRECEDENCE,
            t if t.is_keyword("IS") => IS_PRECEDENCE,
            Token::Eq | Token::Neq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => {
                COMPARE_PRECEDENCE
            }
            Token::Plus | Token::Minus => ADD_PRECEDENCE,
            Token::Mul | Token::Div => MUL_PRECEDENCE,
            _ => 0,
        }
    }

    fn resolve(&self, name: &str) -> std::result::Result<Expr, String> {
        self.schema
            .index_of(name)
            .map(Expr::column)
            .ok_or_else(|| format!("unknown column \"{name}\""))
    }
}

enum BinaryOp {
    Compare(CompareOp),
    Arith(ArithOp),
}

/// `a AND (b AND c)` and `(a AND b) AND c` both become `AND(a, b, c)`.
fn flatten(left: Expr, right: Expr, conjunction: bool) -> Expr {
    let mut items = Vec::new();
    for side in [left, right] {
        match (side, conjunction) {
            (Expr::And(inner), true) | (Expr::Or(inner), false) => items.extend(inner),
            (other, _) => items.push(other),
        }
    }
    if conjunction {
        Expr::And(items)
    } else {
        Expr::Or(items)
    }
}

fn parse_number(text: &str) -> std::result::Result<Scalar, String> {
    let invalid = || format!("invalid number {text}");
    if text.contains(['.', 'e', 'E']) {
        return text.parse::<f64>().map(Scalar::F64).map_err(|_| invalid());
    }
    let v = text.parse::<i64>().map_err(|_| invalid())?;
    Ok(i32::try_from(v).map(Scalar::I32).unwrap_or(Scalar::I64(v)))
}

fn expr_error(text: &str, message: String) -> DslError {
    DslError::Expr {
        text: text.to_string(),
        message,
    }
}

/// Parse a standalone expression over rows of `schema`.
pub fn parse_expr(text: &str, schema: &Schema) -> Result<Expr> {
    let run = || -> std::result::Result<Expr, String> {
        let mut parser = Parser::new(text, schema)?;
        let expr = parser.parse_expr(0)?;
        parser.expect_eof()?;
        Ok(expr)
    };
    run().map_err(|message| expr_error(text, message))
}

/// Parse `expr [AS alias]`.
pub fn parse_projection_item(text: &str, schema: &Schema) -> Result<(Expr, Option<String>)> {
    let run = || -> std::result::Result<(Expr, Option<String>), String> {
        let mut parser = Parser::new(text, schema)?;
        let expr = parser.parse_expr(0)?;
        let alias = if parser.consume_keyword("AS") {
            match parser.next_token() {
                Token::Ident(name) | Token::Quoted(name) => Some(name),
                other => return Err(format!("expected alias after AS, found {other}")),
            }
        } else {
            None
        };
        parser.expect_eof()?;
        Ok((expr, alias))
    };
    run().map_err(|message| expr_error(text, message))
}
