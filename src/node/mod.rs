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

//! Statement node model
//!
//! A statement body is a tree of [`Node`]s built once at load time:
//!
//! - [`Node::Literal`] - SQL text emitted verbatim
//! - [`Node::Parameter`] - `#{path}`, one bind placeholder plus one argument
//! - [`Node::Substitution`] - `${path}`, the value's text spliced into the SQL
//! - [`Node::Conditional`] - `<if test>`
//! - [`Node::Choose`] - `<choose>` with `<when>` branches and `<otherwise>`
//! - [`Node::Loop`] - `<foreach>`
//! - [`Node::Include`] - `<include refid>`, resolved at render time
//! - [`Node::Trim`] - `<trim>`, `<where>` and `<set>`
//! - [`Node::Root`] - the statement body itself
//!
//! Trees are immutable after building and shared freely between renders.

pub mod builder;
pub mod schema;
pub mod text;

use std::fmt;

use crate::expr::{Expr, Path};

pub use builder::{build_document, Document, NodeBuilder};
pub use schema::{schema_for, Attributes, NodeSchema};
pub use text::parse_text;

/// Statement definition node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal SQL text
    Literal(String),
    /// Bind parameter (`#{path}`)
    Parameter(Path),
    /// Raw textual substitution (`${path}`)
    Substitution(Path),
    /// Children rendered when the test is truthy
    Conditional(Conditional),
    /// First matching branch
    Choose(Choose),
    /// Children rendered once per collection element
    Loop(Loop),
    /// Reference to another statement or fragment
    Include(Include),
    /// Children post-processed by prefix/suffix trimming
    Trim(Trim),
    /// Plain sequence of children
    Root(Vec<Node>),
}

impl Node {
    /// Element name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Node::Literal(_) => "text",
            Node::Parameter(_) => "#{}",
            Node::Substitution(_) => "${}",
            Node::Conditional(_) => "if",
            Node::Choose(_) => "choose",
            Node::Loop(_) => "foreach",
            Node::Include(_) => "include",
            Node::Trim(trim) => trim.element,
            Node::Root(_) => "root",
        }
    }

    /// Direct children, in order
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Conditional(c) => &c.children,
            Node::Loop(l) => &l.children,
            Node::Trim(t) => &t.children,
            Node::Root(children) => children,
            _ => &[],
        }
    }

    /// Count of bind parameters reachable without evaluating anything
    ///
    /// Loops count their body once; includes count as zero.
    pub fn static_parameter_count(&self) -> usize {
        match self {
            Node::Parameter(_) => 1,
            Node::Choose(choose) => choose
                .whens
                .iter()
                .flat_map(|w| w.children.iter())
                .chain(choose.otherwise.iter().flatten())
                .map(Node::static_parameter_count)
                .sum(),
            other => other
                .children()
                .iter()
                .map(Node::static_parameter_count)
                .sum(),
        }
    }
}

/// `<if test="...">`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub test: Expr,
    pub children: Vec<Node>,
}

/// `<choose>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Choose {
    pub whens: Vec<Conditional>,
    pub otherwise: Option<Vec<Node>>,
}

/// `<foreach>`
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Expression producing the collection
    pub collection: Expr,
    /// Name bound to each element
    pub item: String,
    /// Name bound to the list position or map key
    pub index: String,
    pub open: String,
    pub close: String,
    pub separator: String,
    pub children: Vec<Node>,
}

/// `<include refid="...">`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Reference as written; unqualified ids resolve in `namespace` first
    pub refid: String,
    /// Namespace of the document the include appeared in
    pub namespace: String,
}

impl Include {
    /// Names to try, in order
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        let qualified = (!self.refid.contains('.') && !self.namespace.is_empty())
            .then(|| format!("{}.{}", self.namespace, self.refid));
        qualified
            .into_iter()
            .chain(std::iter::once(self.refid.clone()))
    }
}

/// `<trim>`, `<where>`, `<set>`
#[derive(Debug, Clone, PartialEq)]
pub struct Trim {
    /// Element that produced this node
    pub element: &'static str,
    pub prefix: String,
    pub suffix: String,
    /// Leading tokens to strip, matched case-insensitively
    pub prefix_overrides: Vec<String>,
    /// Trailing tokens to strip, matched case-insensitively
    pub suffix_overrides: Vec<String>,
    pub children: Vec<Node>,
}

impl Trim {
    /// `<where>`: prefix `WHERE`, leading `AND`/`OR` removed
    pub fn where_clause(children: Vec<Node>) -> Self {
        Self {
            element: "where",
            prefix: "WHERE".to_string(),
            suffix: String::new(),
            prefix_overrides: vec!["AND".to_string(), "OR".to_string()],
            suffix_overrides: Vec::new(),
            children,
        }
    }

    /// `<set>`: prefix `SET`, trailing comma removed
    pub fn set_clause(children: Vec<Node>) -> Self {
        Self {
            element: "set",
            prefix: "SET".to_string(),
            suffix: String::new(),
            prefix_overrides: Vec::new(),
            suffix_overrides: vec![",".to_string()],
            children,
        }
    }

    /// Split a `|`-separated override list
    pub fn split_overrides(raw: &str) -> Vec<String> {
        raw.split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(text) => write!(f, "{}", text),
            Node::Parameter(path) => write!(f, "#{{{}}}", path),
            Node::Substitution(path) => write!(f, "${{{}}}", path),
            Node::Conditional(c) => {
                write!(f, "<if test=\"{}\">", c.test)?;
                write_children(f, &c.children)?;
                write!(f, "</if>")
            }
            Node::Choose(choose) => {
                write!(f, "<choose>")?;
                for when in &choose.whens {
                    write!(f, "<when test=\"{}\">", when.test)?;
                    write_children(f, &when.children)?;
                    write!(f, "</when>")?;
                }
                if let Some(otherwise) = &choose.otherwise {
                    write!(f, "<otherwise>")?;
                    write_children(f, otherwise)?;
                    write!(f, "</otherwise>")?;
                }
                write!(f, "</choose>")
            }
            Node::Loop(l) => {
                write!(
                    f,
                    "<foreach collection=\"{}\" item=\"{}\" index=\"{}\">",
                    l.collection, l.item, l.index
                )?;
                write_children(f, &l.children)?;
                write!(f, "</foreach>")
            }
            Node::Include(inc) => write!(f, "<include refid=\"{}\"/>", inc.refid),
            Node::Trim(t) => {
                write!(f, "<{}>", t.element)?;
                write_children(f, &t.children)?;
                write!(f, "</{}>", t.element)
            }
            Node::Root(children) => write_children(f, children),
        }
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[Node]) -> fmt::Result {
    for child in children {
        write!(f, "{}", child)?;
    }
    Ok(())
}
