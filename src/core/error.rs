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

//! Error types for Dynsql
//!
//! This module defines every condition the engine can report, from
//! load-time structural problems in a mapper document to evaluation
//! failures during a single render.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::expr::SyntaxError;

/// Result type alias for Dynsql operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Dynsql
///
/// Load-time errors name the offending node and attribute. Render-time
/// errors are scoped to the call that produced them and never affect the
/// registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // =========================================================================
    // Render results
    // =========================================================================
    /// The rendered statement is empty after trimming
    #[error("empty query")]
    EmptyQuery,

    /// A result map was required at the execution boundary but none is declared
    #[error("resultMap not set")]
    ResultMapNotSet,

    // =========================================================================
    // Resolution errors
    // =========================================================================
    /// No statement or fragment is registered under the name
    #[error("sql node {0} not found")]
    SqlNodeNotFound(String),

    /// A statement with the same qualified name is already registered
    #[error("statement {0} already exists")]
    StatementAlreadyExists(String),

    /// Include references nested deeper than the configured limit
    #[error("include {refid} exceeds maximum depth {limit}")]
    IncludeDepthExceeded { refid: String, limit: usize },

    /// A `#{...}` placeholder names a parameter that is not present
    #[error("parameter {0} not found")]
    ParameterNotFound(String),

    // =========================================================================
    // Load-time structural errors
    // =========================================================================
    /// A start marker has no matching close marker
    #[error("node {node} is not closed")]
    NodeUnclosed { node: String },

    /// A node is missing an attribute its semantics require
    #[error("node {node} requires attribute {attr}")]
    NodeAttributeRequired { node: String, attr: String },

    /// A node declares attributes that cannot be used together
    #[error("node {node} has conflicting attribute {attr}")]
    NodeAttributeConflict { node: String, attr: String },

    /// Malformed test expression or parameter path
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    /// Element name not recognised in a mapper document
    #[error("unknown node {0}")]
    UnknownNode(String),

    /// Document structure is invalid (misplaced elements, stray end tags)
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Underlying XML reader failure
    #[error("xml error: {0}")]
    Xml(#[source] Cause<quick_xml::Error>),

    /// I/O failure while reading a mapper document
    #[error("io error: {0}")]
    Io(#[source] Cause<std::io::Error>),

    /// Unrecognised configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Evaluation errors
    // =========================================================================
    /// Operator applied to incompatible operand types
    #[error("cannot apply {op} to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Checked integer arithmetic overflowed
    #[error("integer overflow")]
    IntegerOverflow,

    /// A foreach collection evaluated to something that cannot be iterated
    #[error("cannot iterate over {type_name}")]
    NotIterable { type_name: &'static str },
}

impl Error {
    /// Create a NodeUnclosed error
    pub fn unclosed(node: impl Into<String>) -> Self {
        Error::NodeUnclosed { node: node.into() }
    }

    /// Create a NodeAttributeRequired error
    pub fn attribute_required(node: impl Into<String>, attr: impl Into<String>) -> Self {
        Error::NodeAttributeRequired {
            node: node.into(),
            attr: attr.into(),
        }
    }

    /// Create a NodeAttributeConflict error
    pub fn attribute_conflict(node: impl Into<String>, attr: impl Into<String>) -> Self {
        Error::NodeAttributeConflict {
            node: node.into(),
            attr: attr.into(),
        }
    }

    /// Create a TypeMismatch error
    pub fn type_mismatch(op: impl Into<String>, left: &'static str, right: &'static str) -> Self {
        Error::TypeMismatch {
            op: op.into(),
            left,
            right,
        }
    }

    /// Returns true if this error was raised while loading a document
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::NodeUnclosed { .. }
                | Error::NodeAttributeRequired { .. }
                | Error::NodeAttributeConflict { .. }
                | Error::Syntax(_)
                | Error::UnknownNode(_)
                | Error::InvalidDocument(_)
                | Error::Xml(_)
                | Error::Io(_)
                | Error::StatementAlreadyExists(_)
        )
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(Cause::new(err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(Cause::new(quick_xml::Error::InvalidAttr(err)))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Cause::new(err))
    }
}

/// An underlying library error shared behind an `Arc`
///
/// Keeps [`Error`] cloneable while the original error stays reachable
/// through [`get_ref`](Cause::get_ref). Two causes are equal when their
/// messages are.
#[derive(Debug)]
pub struct Cause<E>(Arc<E>);

impl<E> Cause<E> {
    pub fn new(err: E) -> Self {
        Cause(Arc::new(err))
    }

    /// The original error
    pub fn get_ref(&self) -> &E {
        &self.0
    }
}

impl<E> Clone for Cause<E> {
    fn clone(&self) -> Self {
        Cause(Arc::clone(&self.0))
    }
}

impl<E: fmt::Display> PartialEq for Cause<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E: std::error::Error> std::error::Error for Cause<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::EmptyQuery.to_string(), "empty query");
        assert_eq!(Error::ResultMapNotSet.to_string(), "resultMap not set");
        assert_eq!(
            Error::SqlNodeNotFound("users.columns".to_string()).to_string(),
            "sql node users.columns not found"
        );
        assert_eq!(Error::unclosed("if").to_string(), "node if is not closed");
        assert_eq!(
            Error::attribute_required("if", "test").to_string(),
            "node if requires attribute test"
        );
        assert_eq!(
            Error::attribute_conflict("select", "resultType").to_string(),
            "node select has conflicting attribute resultType"
        );
    }

    #[test]
    fn test_load_error_classification() {
        assert!(Error::unclosed("where").is_load_error());
        assert!(Error::StatementAlreadyExists("a.b".into()).is_load_error());
        assert!(!Error::DivisionByZero.is_load_error());
        assert!(!Error::SqlNodeNotFound("x".into()).is_load_error());
    }

    #[test]
    fn test_io_error_keeps_cause() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "mapper.xml",
        ));
        assert_eq!(err.to_string(), "io error: mapper.xml");
        assert_eq!(err.clone(), err);

        let cause = err
            .source()
            .and_then(|source| source.downcast_ref::<Cause<std::io::Error>>())
            .unwrap();
        assert_eq!(cause.get_ref().kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::type_mismatch(">", "text", "integer");
        assert_eq!(err.to_string(), "cannot apply > to text and integer");
    }
}
