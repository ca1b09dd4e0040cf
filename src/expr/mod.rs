// Copyright 2025 Dynsql Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test expressions
//!
//! The small language used in `test` and `collection` attributes:
//!
//! - [`Lexer`] - Tokenizer for expression text
//! - [`Parser`] - Pratt parser that builds an [`Expr`]
//! - [`ast`] - Expression tree types
//! - [`error`] - [`ParseError`] and the [`SyntaxError`] wrapper
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use dynsql::expr::parse;
//! use dynsql::Value;
//!
//! let expr = parse("age > 18 and name != null").unwrap();
//! let mut env = HashMap::new();
//! env.insert("age", Value::integer(30));
//! env.insert("name", Value::text("alice"));
//! assert_eq!(expr.evaluate(&env).unwrap(), Value::boolean(true));
//! ```

pub mod ast;
pub mod error;
mod evaluator;
pub mod lexer;
pub mod parser;
pub mod precedence;
pub mod token;

pub use ast::{BinaryOp, Expr, Path, UnaryOp};
pub use error::{ParseError, SyntaxError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use precedence::Precedence;
pub use token::{Position, Token, TokenType, KEYWORDS, OPERATORS};

/// Parse a test expression
///
/// The returned [`SyntaxError`] keeps the expression text and exposes the
/// underlying [`ParseError`] through `source()`.
pub fn parse(text: &str) -> Result<Expr, SyntaxError> {
    Parser::new(text)
        .parse()
        .map_err(|cause| SyntaxError::new(text, cause))
}

/// Parse a parameter path such as `user.address.city` or `ids.0`
pub fn parse_path(text: &str) -> Result<Path, SyntaxError> {
    let trimmed = text.trim();
    match parse(trimmed)? {
        Expr::Path(path) => Ok(path),
        _ => Err(SyntaxError::new(
            trimmed,
            ParseError::new(
                format!("expected parameter path, got {:?}", trimmed),
                Position::new(0, 1),
            ),
        )),
    }
}

impl std::str::FromStr for Expr {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl std::str::FromStr for Path {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_parse_wraps_cause() {
        let err = parse("age >").unwrap_err();
        assert_eq!(err.expression(), "age >");
        let cause = err
            .source()
            .and_then(|s| s.downcast_ref::<ParseError>())
            .expect("cause must be a ParseError");
        assert!(cause.message.contains("unexpected end"));
        assert!(err.to_string().starts_with("syntax error: "));
    }

    #[test]
    fn test_parse_path() {
        let path = parse_path(" user.name ").unwrap();
        assert_eq!(path.segments(), ["user", "name"]);

        let path: Path = "ids.0".parse().unwrap();
        assert_eq!(path.to_string(), "ids.0");
    }

    #[test]
    fn test_parse_path_rejects_expressions() {
        let err = parse_path("a + 1").unwrap_err();
        assert!(err.cause().message.contains("expected parameter path"));
        assert!(parse_path("").is_err());
        assert!(parse_path("1").is_err());
    }

    #[test]
    fn test_from_str() {
        let expr: Expr = "id != null".parse().unwrap();
        assert_eq!(expr.to_string(), "(id != null)");
    }
}
