//! Type-expression grammar for the coercion engine.
//!
//! This crate is the single source of truth for the textual form of a
//! declared target type, used by the `coercion` registry, by schema
//! definition documents and by the CLI.
//!
//! ```text
//! expr    := primary ( '|' primary )*
//! primary := NAME ( '[' args? ']' )?
//! args    := arg ( ',' arg )* ','?
//! arg     := expr | STRING | INTEGER | '...'
//! ```
//!
//! A union is only meaningful as `T | None` (or `None | T`), which is
//! rewritten to `optional[T]`.

use std::fmt;

use thiserror::Error;

/// Maximum accepted length of a type expression.
pub const MAX_EXPR_LENGTH: usize = 4096;

/// Maximum nesting depth of bracketed arguments.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Errors from type-expression parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeExprError {
    /// The expression is empty or whitespace only.
    #[error("Empty type expression")]
    Empty,

    /// The expression exceeds [`MAX_EXPR_LENGTH`].
    #[error("Type expression too long ({len} bytes, max {MAX_EXPR_LENGTH})")]
    TooLong {
        /// Length of the rejected input in bytes.
        len: usize,
    },

    /// A character that cannot start or continue the current production.
    #[error("Unexpected {found:?} at offset {offset}, expected {expected}")]
    Unexpected {
        /// Byte offset of the offending character.
        offset: usize,
        /// The offending character.
        found: char,
        /// What the parser was looking for.
        expected: &'static str,
    },

    /// Input ended in the middle of a production.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEnd {
        /// What the parser was looking for.
        expected: &'static str,
    },

    /// A quoted string literal without its closing quote.
    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        offset: usize,
    },

    /// An integer literal that does not fit in `i64`.
    #[error("Integer literal at offset {offset} is out of range")]
    IntegerOutOfRange {
        /// Byte offset of the literal.
        offset: usize,
    },

    /// A union that is not of the form `T | None`.
    #[error("Unsupported union at offset {offset}: only `T | None` is accepted")]
    UnsupportedUnion {
        /// Byte offset of the first `|`.
        offset: usize,
    },

    /// Brackets nested deeper than [`MAX_NESTING_DEPTH`].
    #[error("Type expression nested deeper than {MAX_NESTING_DEPTH} levels")]
    TooDeep,
}

/// A parsed type expression: a name with optional bracketed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    /// The type name exactly as written (resolution is case-insensitive).
    pub name: String,
    /// Bracketed arguments; `None` when no brackets were written.
    pub args: Option<Vec<TypeArg>>,
    /// Byte offset of the name within the source expression.
    pub offset: usize,
}

/// One argument inside `name[...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    /// A nested type expression (also used for bare words such as `true`).
    Type(TypeExpr),
    /// A quoted string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// The `...` marker of a variadic tuple.
    Ellipsis,
}

impl TypeExpr {
    /// A bare name without arguments.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            args: None,
            offset: 0,
        }
    }

    /// Lower-cased name, the key used for registry lookups.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Arguments as a slice; empty when no brackets were written.
    #[must_use]
    pub fn args(&self) -> &[TypeArg] {
        self.args.as_deref().unwrap_or(&[])
    }

    /// Whether this is a bare word (no brackets) equal to `word`, ignoring case.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        self.args.is_none() && self.name.eq_ignore_ascii_case(word)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(args) = &self.args {
            f.write_str("[")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Type(t) => write!(f, "{t}"),
            TypeArg::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            TypeArg::Int(i) => write!(f, "{i}"),
            TypeArg::Ellipsis => f.write_str("..."),
        }
    }
}

/// Parse a type expression.
///
/// # Errors
/// Returns [`TypeExprError`] describing the first syntax problem found.
pub fn parse_type_expr(source: &str) -> Result<TypeExpr, TypeExprError> {
    if source.len() > MAX_EXPR_LENGTH {
        return Err(TypeExprError::TooLong { len: source.len() });
    }
    if source.trim().is_empty() {
        return Err(TypeExprError::Empty);
    }

    let mut parser = Parser {
        src: source,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(TypeExprError::Unexpected {
            offset: parser.pos,
            found: c,
            expected: "end of input",
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<(), TypeExprError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(TypeExprError::Unexpected {
                offset: self.pos,
                found: c,
                expected,
            }),
            None => Err(TypeExprError::UnexpectedEnd { expected }),
        }
    }

    fn expr(&mut self) -> Result<TypeExpr, TypeExprError> {
        let first = self.primary()?;
        self.skip_ws();
        if self.peek() != Some('|') {
            return Ok(first);
        }

        let union_offset = self.pos;
        let mut members = vec![first];
        while self.peek() == Some('|') {
            self.bump();
            members.push(self.primary()?);
            self.skip_ws();
        }

        // `T | None` and `None | T` only.
        if members.len() == 2 {
            let none_at = members.iter().position(|m| m.is_word("none"));
            if let Some(idx) = none_at {
                let inner = members.swap_remove(1 - idx);
                let offset = members[0].offset.min(inner.offset);
                return Ok(TypeExpr {
                    name: "optional".to_owned(),
                    args: Some(vec![TypeArg::Type(inner)]),
                    offset,
                });
            }
        }
        Err(TypeExprError::UnsupportedUnion {
            offset: union_offset,
        })
    }

    fn primary(&mut self) -> Result<TypeExpr, TypeExprError> {
        self.skip_ws();
        let offset = self.pos;
        let name = self.ident()?;
        self.skip_ws();

        if self.peek() != Some('[') {
            return Ok(TypeExpr {
                name,
                args: None,
                offset,
            });
        }
        self.bump();
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(TypeExprError::TooDeep);
        }

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                break;
            }
            args.push(self.arg()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(']') => break,
                Some(c) => {
                    return Err(TypeExprError::Unexpected {
                        offset: self.pos - c.len_utf8(),
                        found: c,
                        expected: "',' or ']'",
                    });
                }
                None => {
                    return Err(TypeExprError::UnexpectedEnd {
                        expected: "',' or ']'",
                    });
                }
            }
        }
        self.depth -= 1;

        Ok(TypeExpr {
            name,
            args: Some(args),
            offset,
        })
    }

    fn ident(&mut self) -> Result<String, TypeExprError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            Some(c) => {
                return Err(TypeExprError::Unexpected {
                    offset: self.pos,
                    found: c,
                    expected: "a type name",
                });
            }
            None => {
                return Err(TypeExprError::UnexpectedEnd {
                    expected: "a type name",
                });
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn arg(&mut self) -> Result<TypeArg, TypeExprError> {
        self.skip_ws();
        match self.peek() {
            Some('\'' | '"') => self.string().map(TypeArg::Str),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.integer().map(TypeArg::Int),
            Some('.') => {
                let offset = self.pos;
                if self.src[self.pos..].starts_with("...") {
                    self.pos += 3;
                    Ok(TypeArg::Ellipsis)
                } else {
                    Err(TypeExprError::Unexpected {
                        offset,
                        found: '.',
                        expected: "'...'",
                    })
                }
            }
            _ => self.expr().map(TypeArg::Type),
        }
    }

    fn string(&mut self) -> Result<String, TypeExprError> {
        let offset = self.pos;
        let Some(quote) = self.bump() else {
            return Err(TypeExprError::UnexpectedEnd {
                expected: "a string literal",
            });
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(TypeExprError::UnterminatedString { offset }),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(TypeExprError::UnterminatedString { offset }),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn integer(&mut self) -> Result<i64, TypeExprError> {
        let offset = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return match self.peek() {
                Some(c) => Err(TypeExprError::Unexpected {
                    offset: self.pos,
                    found: c,
                    expected: "a digit",
                }),
                None => Err(TypeExprError::UnexpectedEnd {
                    expected: "a digit",
                }),
            };
        }
        let text: String = self.src[offset..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        text.parse::<i64>()
            .map_err(|_| TypeExprError::IntegerOutOfRange { offset })
    }
}
