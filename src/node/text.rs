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

//! Splitting element text into literal, parameter and substitution nodes

use std::borrow::Cow;

use super::Node;
use crate::core::{Error, Result};
use crate::expr::parse_path;

const BIND_OPEN: &str = "#{";
const SUBST_OPEN: &str = "${";

/// Split text into [`Node::Literal`], [`Node::Parameter`] and
/// [`Node::Substitution`] nodes
///
/// Whitespace runs that span a line break collapse to a single space, so
/// indented documents render as one-line SQL. Whitespace inside a line is
/// kept as written.
pub fn parse_text(text: &str) -> Result<Vec<Node>> {
    let text = collapse_line_breaks(text);
    let mut nodes = Vec::new();
    let mut rest: &str = &text;

    while let Some(start) = find_marker(rest) {
        let (literal, marked) = rest.split_at(start);
        if !literal.is_empty() {
            nodes.push(Node::Literal(literal.to_string()));
        }

        let marker = &marked[..2];
        let body = &marked[2..];
        let end = body.find('}').ok_or_else(|| Error::unclosed(marker))?;
        let inner = &body[..end];

        let path = parse_path(inner).map_err(|e| {
            let node = format!("{}{}}}", marker, inner);
            Error::Syntax(e.in_node(node))
        })?;

        nodes.push(if marker == BIND_OPEN {
            Node::Parameter(path)
        } else {
            Node::Substitution(path)
        });

        rest = &body[end + 1..];
    }

    if !rest.is_empty() {
        nodes.push(Node::Literal(rest.to_string()));
    }

    Ok(nodes)
}

fn find_marker(text: &str) -> Option<usize> {
    match (text.find(BIND_OPEN), text.find(SUBST_OPEN)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Collapse every whitespace run containing a line break into one space
///
/// Runs inside single- or double-quoted literals are kept as written.
fn collapse_line_breaks(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        if quote.is_none() && ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        flush_run(&mut out, &mut run);
        match quote {
            Some(q) if ch == q => quote = None,
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            _ => {}
        }
        out.push(ch);
    }
    flush_run(&mut out, &mut run);
    Cow::Owned(out)
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }
    if run.contains(['\n', '\r']) {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}
