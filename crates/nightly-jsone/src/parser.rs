//! Pratt parser for JSON-e expressions.

use serde_json::Value;

use crate::error::{RenderError, Result};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::number_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    In,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Expression syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Property(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    Call(Box<Expr>, Vec<Expr>),
}

const UNARY_BP: u8 = 17;
const POSTFIX_BP: u8 = 19;

fn infix_binding(kind: &TokenKind) -> Option<(BinaryOp, u8, u8)> {
    let binding = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1, 2),
        TokenKind::AndAnd => (BinaryOp::And, 3, 4),
        TokenKind::In => (BinaryOp::In, 5, 6),
        TokenKind::EqEq => (BinaryOp::Eq, 7, 8),
        TokenKind::NotEq => (BinaryOp::NotEq, 7, 8),
        TokenKind::Lt => (BinaryOp::Lt, 9, 10),
        TokenKind::LtEq => (BinaryOp::LtEq, 9, 10),
        TokenKind::Gt => (BinaryOp::Gt, 9, 10),
        TokenKind::GtEq => (BinaryOp::GtEq, 9, 10),
        TokenKind::Plus => (BinaryOp::Add, 11, 12),
        TokenKind::Minus => (BinaryOp::Sub, 11, 12),
        TokenKind::Star => (BinaryOp::Mul, 13, 14),
        TokenKind::Slash => (BinaryOp::Div, 13, 14),
        // right-associative
        TokenKind::StarStar => (BinaryOp::Pow, 16, 15),
        _ => return None,
    };
    Some(binding)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    /// Offset just past the last consumed token
    consumed: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            peeked: None,
            consumed: 0,
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn advance(&mut self) -> Result<Option<Token>> {
        self.peek()?;
        let token = self.peeked.take();
        if let Some(t) = &token {
            self.consumed = t.end;
        }
        Ok(token)
    }

    fn expect(&mut self, expected: TokenKind, what: &str) -> Result<Token> {
        match self.advance()? {
            Some(token) if token.kind == expected => Ok(token),
            Some(token) => Err(RenderError::syntax(
                token.offset,
                format!("expected {what}, found {:?}", token.kind),
            )),
            None => Err(RenderError::syntax(
                self.consumed,
                format!("expected {what}, found end of input"),
            )),
        }
    }

    fn next_is(&mut self, kind: &TokenKind) -> Result<bool> {
        Ok(matches!(self.peek()?, Some(t) if &t.kind == kind))
    }

    fn expression(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.prefix()?;

        loop {
            let Some(token) = self.peek()? else {
                break;
            };

            if matches!(
                token.kind,
                TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
            ) {
                if POSTFIX_BP < min_bp {
                    break;
                }
                lhs = self.postfix(lhs)?;
                continue;
            }

            let Some((op, l_bp, r_bp)) = infix_binding(&token.kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance()?;
            let rhs = self.expression(r_bp)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr> {
        let Some(token) = self.advance()? else {
            return Err(RenderError::syntax(
                self.consumed,
                "unexpected end of expression",
            ));
        };

        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(number_value(n)?)),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::Bang => self.unary(UnaryOp::Not),
            TokenKind::Minus => self.unary(UnaryOp::Neg),
            TokenKind::Plus => self.unary(UnaryOp::Plus),
            TokenKind::LParen => {
                let inner = self.expression(0)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let items = self.list(TokenKind::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => self.object(),
            other => Err(RenderError::syntax(
                token.offset,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn unary(&mut self, op: UnaryOp) -> Result<Expr> {
        let operand = self.expression(UNARY_BP)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self, lhs: Expr) -> Result<Expr> {
        let Some(token) = self.advance()? else {
            return Ok(lhs);
        };

        match token.kind {
            TokenKind::Dot => match self.advance()? {
                Some(Token {
                    kind: TokenKind::Ident(name),
                    ..
                }) => Ok(Expr::Property(Box::new(lhs), name)),
                Some(other) => Err(RenderError::syntax(
                    other.offset,
                    "expected property name after '.'",
                )),
                None => Err(RenderError::syntax(
                    self.consumed,
                    "expected property name after '.'",
                )),
            },
            TokenKind::LParen => {
                let args = self.list(TokenKind::RParen, "')'")?;
                Ok(Expr::Call(Box::new(lhs), args))
            }
            TokenKind::LBracket => self.index(lhs),
            _ => unreachable!("postfix called on non-postfix token"),
        }
    }

    fn index(&mut self, lhs: Expr) -> Result<Expr> {
        let start = if self.next_is(&TokenKind::Colon)? {
            None
        } else {
            Some(Box::new(self.expression(0)?))
        };

        if !self.next_is(&TokenKind::Colon)? {
            self.expect(TokenKind::RBracket, "']'")?;
            return match start {
                Some(index) => Ok(Expr::Index(Box::new(lhs), index)),
                None => Err(RenderError::syntax(self.consumed, "empty index")),
            };
        }

        self.advance()?;
        let end = if self.next_is(&TokenKind::RBracket)? {
            None
        } else {
            Some(Box::new(self.expression(0)?))
        };
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::Slice(Box::new(lhs), start, end))
    }

    fn list(&mut self, close: TokenKind, what: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.next_is(&close)? {
            self.advance()?;
            return Ok(items);
        }
        loop {
            items.push(self.expression(0)?);
            if self.next_is(&TokenKind::Comma)? {
                self.advance()?;
                continue;
            }
            self.expect(close, what)?;
            return Ok(items);
        }
    }

    fn object(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        if self.next_is(&TokenKind::RBrace)? {
            self.advance()?;
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.advance()? {
                Some(Token {
                    kind: TokenKind::Ident(k) | TokenKind::Str(k),
                    ..
                }) => k,
                Some(other) => {
                    return Err(RenderError::syntax(
                        other.offset,
                        "object keys must be identifiers or strings",
                    ))
                }
                None => return Err(RenderError::syntax(self.consumed, "unterminated object")),
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.expression(0)?;
            entries.push((key, value));

            if self.next_is(&TokenKind::Comma)? {
                self.advance()?;
                continue;
            }
            self.expect(TokenKind::RBrace, "'}'")?;
            return Ok(Expr::Object(entries));
        }
    }
}

/// Parse a complete expression; trailing tokens are an error.
pub fn parse(source: &str) -> Result<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.expression(0)?;
    if let Some(token) = parser.advance()? {
        return Err(RenderError::syntax(
            token.offset,
            format!("unexpected trailing token {:?}", token.kind),
        ));
    }
    Ok(expr)
}

/// Parse the body of a `${...}` placeholder.
///
/// `source` starts right after `${`. Returns the expression and the number of
/// bytes consumed including the closing `}`.
pub fn parse_placeholder(source: &str) -> Result<(Expr, usize)> {
    let mut parser = Parser::new(source);
    let expr = parser.expression(0)?;
    let close = parser.expect(TokenKind::RBrace, "'}' closing interpolation")?;
    Ok((expr, close.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                lit(json!(1)),
                Box::new(Expr::Binary(BinaryOp::Mul, lit(json!(2)), lit(json!(3))))
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Pow,
                lit(json!(2)),
                Box::new(Expr::Binary(BinaryOp::Pow, lit(json!(3)), lit(json!(2))))
            )
        );
    }

    #[test]
    fn test_comparison_binds_tighter_than_logic() {
        let expr = parse("tasks_for == 'cron' || x").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Or,
                Box::new(Expr::Binary(
                    BinaryOp::Eq,
                    ident("tasks_for"),
                    lit(json!("cron"))
                )),
                ident("x")
            )
        );
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse("event.release['tag_name']").unwrap();
        assert_eq!(
            expr,
            Expr::Index(
                Box::new(Expr::Property(ident("event"), "release".into())),
                lit(json!("tag_name"))
            )
        );
    }

    #[test]
    fn test_call_with_arguments() {
        let expr = parse("as_slugid('decision')").unwrap();
        assert_eq!(
            expr,
            Expr::Call(ident("as_slugid"), vec![Expr::Literal(json!("decision"))])
        );
    }

    #[test]
    fn test_slices() {
        assert_eq!(
            parse("s[:3]").unwrap(),
            Expr::Slice(ident("s"), None, Some(lit(json!(3))))
        );
        assert_eq!(
            parse("s[1:]").unwrap(),
            Expr::Slice(ident("s"), Some(lit(json!(1))), None)
        );
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_binary() {
        let expr = parse("-a + b").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Unary(UnaryOp::Neg, ident("a"))),
                ident("b")
            )
        );
    }

    #[test]
    fn test_object_literal() {
        let expr = parse("{a: 1, 'b c': x}").unwrap();
        assert_eq!(
            expr,
            Expr::Object(vec![
                ("a".into(), Expr::Literal(json!(1))),
                ("b c".into(), Expr::Ident("x".into())),
            ])
        );
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(parse("a b"), Err(RenderError::Syntax { .. })));
    }

    #[test]
    fn test_placeholder_reports_consumed_length() {
        let (expr, consumed) = parse_placeholder("cron.task_id} tail").unwrap();
        assert_eq!(expr, Expr::Property(ident("cron"), "task_id".into()));
        assert_eq!(consumed, "cron.task_id}".len());
    }

    #[test]
    fn test_placeholder_without_close_is_error() {
        assert!(parse_placeholder("a + b").is_err());
    }
}
