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

//! Expression error types
//!
//! [`ParseError`] is the raw tokenizer/parser failure. [`SyntaxError`] is
//! what the rest of the engine sees: it remembers the expression text and
//! the node that owned it, and exposes the parse failure as its source.

use std::fmt;

use thiserror::Error;

use super::token::Position;

/// A single parse error
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Position in the expression
    pub position: Position,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Format the error with a caret under the offending column
    pub fn format_error(&self, source: &str) -> String {
        let pointer = " ".repeat(self.position.column.saturating_sub(1)) + "^";
        format!("{}\n{}\n{}", self, source, pointer)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Malformed test expression or parameter path
#[derive(Error, Debug, Clone, PartialEq)]
#[error("syntax error: {cause}")]
pub struct SyntaxError {
    expression: String,
    node: Option<String>,
    #[source]
    cause: ParseError,
}

impl SyntaxError {
    /// Wrap a parse failure for the given expression text
    pub fn new(expression: impl Into<String>, cause: ParseError) -> Self {
        Self {
            expression: expression.into(),
            node: None,
            cause,
        }
    }

    /// Attribute the error to the node that owns the expression
    pub fn in_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// The expression text that failed to parse
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The node that owns the expression, if known
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// The underlying parse failure
    pub fn cause(&self) -> &ParseError {
        &self.cause
    }

    /// Unwrap into the underlying parse failure
    pub fn into_cause(self) -> ParseError {
        self.cause
    }
}
