// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Tokenizer for pointcut and pattern text

use std::fmt;
use thiserror::Error;

/// Position in pattern text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self::new(1, 1)
    }

    fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedChar { ch: char, position: Position },

    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: Position },

    #[error("expected {expected}, found {found} at {position}")]
    Expected { expected: String, found: String, position: Position },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("{message} at {position}")]
    Invalid { message: String, position: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or glob such as `com.acme..*Service`
    Name(String),
    /// `..`
    Ellipsis,
    /// `...` after a type
    Varargs,
    /// Leading `.` of a member name, as in `Foo+.bar`
    Dot,
    Str(String),
    LParen,
    RParen,
    Comma,
    AndAnd,
    OrOr,
    Not,
    Plus,
    LBracket,
    RBracket,
    Lt,
    Gt,
    At,
    Eq,
    NotEq,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Name(n) => write!(f, "'{}'", n),
            TokenKind::Ellipsis => write!(f, "'..'"),
            TokenKind::Varargs => write!(f, "'...'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Str(s) => write!(f, "\"{}\"", s),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Not => write!(f, "'!'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::At => write!(f, "'@'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '*' | '.')
}

/// Split pattern text into tokens, ending with [`TokenKind::Eof`]
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut position = Position::start();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        let start = position;
        if ch.is_whitespace() {
            chars.next();
            position.advance(ch);
            continue;
        }
        if is_name_char(ch) {
            let mut run = String::new();
            while let Some(&c) = chars.peek() {
                if !is_name_char(c) {
                    break;
                }
                run.push(c);
                chars.next();
                position.advance(c);
            }
            push_name_run(&mut tokens, run, start);
            continue;
        }
        chars.next();
        position.advance(ch);
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '@' => TokenKind::At,
            '=' => TokenKind::Eq,
            '!' if chars.peek() == Some(&'=') => {
                chars.next();
                position.advance('=');
                TokenKind::NotEq
            }
            '!' => TokenKind::Not,
            '&' | '|' if chars.peek() == Some(&ch) => {
                chars.next();
                position.advance(ch);
                if ch == '&' { TokenKind::AndAnd } else { TokenKind::OrOr }
            }
            '"' => {
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    position.advance(c);
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                position.advance(escaped);
                                text.push(escaped);
                            }
                        }
                        c => text.push(c),
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { position: start });
                }
                TokenKind::Str(text)
            }
            other => return Err(ParseError::UnexpectedChar { ch: other, position: start }),
        };
        tokens.push(Token { kind, position: start });
    }

    tokens.push(Token { kind: TokenKind::Eof, position });
    Ok(tokens)
}

/// Name runs carry their own punctuation: `..` alone is an ellipsis, a
/// trailing `...` marks varargs and a leading single `.` starts a member name.
fn push_name_run(tokens: &mut Vec<Token>, run: String, start: Position) {
    match run.as_str() {
        ".." => tokens.push(Token { kind: TokenKind::Ellipsis, position: start }),
        "..." => tokens.push(Token { kind: TokenKind::Varargs, position: start }),
        _ => {
            let mut body = run.as_str();
            let mut column = start.column;
            if body.starts_with('.') && !body.starts_with("..") {
                tokens.push(Token { kind: TokenKind::Dot, position: start });
                body = &body[1..];
                column += 1;
            }
            let varargs = body.len() > 3 && body.ends_with("...");
            if varargs {
                body = &body[..body.len() - 3];
            }
            tokens.push(Token {
                kind: TokenKind::Name(body.to_string()),
                position: Position::new(start.line, column),
            });
            if varargs {
                tokens.push(Token {
                    kind: TokenKind::Varargs,
                    position: Position::new(start.line, column + body.chars().count()),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_names_and_operators() {
        assert_eq!(
            kinds("within(com.acme..*) && !args(..)"),
            vec![
                TokenKind::Name("within".into()),
                TokenKind::LParen,
                TokenKind::Name("com.acme..*".into()),
                TokenKind::RParen,
                TokenKind::AndAnd,
                TokenKind::Not,
                TokenKind::Name("args".into()),
                TokenKind::LParen,
                TokenKind::Ellipsis,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_varargs_member_names_and_strings() {
        assert_eq!(kinds("String..."), vec![TokenKind::Name("String".into()), TokenKind::Varargs, TokenKind::Eof]);
        assert_eq!(kinds("Foo+.bar"), vec![TokenKind::Name("Foo".into()), TokenKind::Plus, TokenKind::Dot, TokenKind::Name("bar".into()), TokenKind::Eof]);
        assert_eq!(kinds("@A(v!=\"x\\\"y\")")[4], TokenKind::NotEq);
        assert_eq!(kinds("\"x\\\"y\"")[0], TokenKind::Str("x\"y".into()));
    }

    #[test]
    fn test_errors_carry_positions() {
        assert_eq!(tokenize("a & b"), Err(ParseError::UnexpectedChar { ch: '&', position: Position::new(1, 3) }));
        assert!(matches!(tokenize("\"open"), Err(ParseError::UnterminatedString { .. })));
    }
}
