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

//! Abstract Syntax Tree for test expressions
//!
//! Trees are built once per node at load time and evaluated on every
//! render, so they are immutable and cheap to share.

use std::fmt;

use smallvec::SmallVec;

use crate::core::{Parameter, Value};

/// Dotted path into a parameter environment (`user.address.city`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// Create a single-segment path
    pub fn new(root: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(root.into());
        Self { segments }
    }

    /// Append a segment
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// All segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first segment, looked up directly in the environment
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Resolve against an environment
    ///
    /// Returns `None` when any segment is missing, so callers can tell an
    /// absent parameter from one explicitly bound to NULL.
    pub fn resolve(&self, env: &dyn Parameter) -> Option<Value> {
        let mut current = env.lookup(self.root())?;
        for segment in &self.segments[1..] {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`not`, `!`)
    Not,
    /// Arithmetic negation (`-`)
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "not "),
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
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
    Mod,
}

impl BinaryOp {
    /// Map an operator token or keyword to a binary operator
    pub fn from_literal(op: &str) -> Option<BinaryOp> {
        Some(match op {
            "and" | "&&" => BinaryOp::And,
            "or" | "||" => BinaryOp::Or,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            _ => return None,
        })
    }

    /// Canonical spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value (number, string, boolean, null)
    Literal(Value),
    /// Identifier or dotted path resolved against the environment
    Path(Path),
    /// Prefix operator
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Infix operator
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Membership test (`x in ids`, `x not in (1, 2)`)
    In {
        needle: Box<Expr>,
        haystack: Box<Expr>,
        negated: bool,
    },
    /// Parenthesized list (`(1, 2, 3)`)
    List(Vec<Expr>),
}

impl Expr {
    /// Create a binary expression
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a unary expression
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Returns the path if this expression is a bare path
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Expr::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Null) => write!(f, "null"),
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Path(p) => write!(f, "{}", p),
            Expr::Unary { op, operand } => write!(f, "({}{})", op, operand),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::In {
                needle,
                haystack,
                negated,
            } => {
                let op = if *negated { "not in" } else { "in" };
                write!(f, "({} {} {})", needle, op, haystack)
            }
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}
