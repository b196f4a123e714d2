//! Tokenizer for JSON-e expressions.
//!
//! The lexer is pull-based so that string interpolation can stop at the
//! closing `}` of a `${...}` placeholder without touching the text after it.

use crate::error::{RenderError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    In,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token
    pub offset: usize,
    /// Byte offset one past the last character of the token
    pub end: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, pos: 0 }
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let rest = &self.source[self.pos..];
        let Some(c) = rest.chars().next() else {
            return Ok(None);
        };
        let start = self.pos;

        if c.is_ascii_digit() {
            return self.number(start).map(Some);
        }
        if c == '_' || c.is_ascii_alphabetic() {
            return Ok(Some(self.word(start)));
        }
        if c == '"' || c == '\'' {
            return self.string(start, c).map(Some);
        }

        let two = rest.get(..2).unwrap_or("");
        let (kind, len) = match two {
            "**" => (TokenKind::StarStar, 2),
            "==" => (TokenKind::EqEq, 2),
            "!=" => (TokenKind::NotEq, 2),
            "<=" => (TokenKind::LtEq, 2),
            ">=" => (TokenKind::GtEq, 2),
            "&&" => (TokenKind::AndAnd, 2),
            "||" => (TokenKind::OrOr, 2),
            _ => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '!' => TokenKind::Bang,
                    '<' => TokenKind::Lt,
                    '>' => TokenKind::Gt,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    ',' => TokenKind::Comma,
                    ':' => TokenKind::Colon,
                    '.' => TokenKind::Dot,
                    other => {
                        return Err(RenderError::syntax(
                            start,
                            format!("unexpected character '{other}'"),
                        ))
                    }
                };
                (kind, c.len_utf8())
            }
        };

        self.pos += len;
        Ok(Some(Token {
            kind,
            offset: start,
            end: self.pos,
        }))
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let bytes = self.source.as_bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        // a fraction needs at least one digit after the dot, otherwise the
        // dot is left for property access
        if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }

        let text = &self.source[start..end];
        let value: f64 = text
            .parse()
            .map_err(|_| RenderError::syntax(start, format!("invalid number '{text}'")))?;

        self.pos = end;
        Ok(Token {
            kind: TokenKind::Number(value),
            offset: start,
            end,
        })
    }

    fn word(&mut self, start: usize) -> Token {
        let rest = &self.source[start..];
        let len = rest
            .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
            .unwrap_or(rest.len());
        let text = &rest[..len];

        let kind = match text {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "in" => TokenKind::In,
            _ => TokenKind::Ident(text.to_string()),
        };

        self.pos = start + len;
        Token {
            kind,
            offset: start,
            end: self.pos,
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token> {
        let body_start = start + quote.len_utf8();
        let body = &self.source[body_start..];
        let Some(len) = body.find(quote) else {
            return Err(RenderError::syntax(start, "unterminated string literal"));
        };

        self.pos = body_start + len + quote.len_utf8();
        Ok(Token {
            kind: TokenKind::Str(body[..len].to_string()),
            offset: start,
            end: self.pos,
        })
    }
}

/// Tokenize a complete expression.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("a == 'cron' && !b || c ** 2 >= 1"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqEq,
                TokenKind::Str("cron".into()),
                TokenKind::AndAnd,
                TokenKind::Bang,
                TokenKind::Ident("b".into()),
                TokenKind::OrOr,
                TokenKind::Ident("c".into()),
                TokenKind::StarStar,
                TokenKind::Number(2.0),
                TokenKind::GtEq,
                TokenKind::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_keywords_are_not_identifiers() {
        assert_eq!(
            kinds("x in [true, false, null]"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::In,
                TokenKind::LBracket,
                TokenKind::True,
                TokenKind::Comma,
                TokenKind::False,
                TokenKind::Comma,
                TokenKind::Null,
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_property_dot() {
        assert_eq!(
            kinds("1.5 + a.b"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Plus,
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_double_quoted_string_keeps_single_quotes() {
        assert_eq!(kinds("\"it's\""), vec![TokenKind::Str("it's".into())]);
    }

    #[test]
    fn test_unterminated_string_is_syntax_error() {
        let err = tokenize("'abc").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a # b").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { offset: 2, .. }));
    }

    #[test]
    fn test_lexer_stops_at_requested_point() {
        let mut lexer = Lexer::new("x } not an expression '");
        assert_eq!(
            lexer.next_token().unwrap().unwrap().kind,
            TokenKind::Ident("x".into())
        );
        let close = lexer.next_token().unwrap().unwrap();
        assert_eq!(close.kind, TokenKind::RBrace);
        assert_eq!(close.end, 3);
    }
}
