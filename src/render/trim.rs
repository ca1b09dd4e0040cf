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

//! Prefix/suffix post-processing for `<trim>`, `<where>` and `<set>`

use crate::node::Trim;

/// Apply a trim node to its rendered content
///
/// Returns `None` when nothing remains after stripping overrides, in which
/// case the node emits nothing at all (not even its prefix).
pub fn apply(trim: &Trim, content: &str) -> Option<String> {
    let mut body = content.trim();
    if body.is_empty() {
        return None;
    }

    if let Some(rest) = trim
        .prefix_overrides
        .iter()
        .find_map(|token| strip_prefix_token(body, token))
    {
        body = rest.trim_start();
    }

    if let Some(rest) = trim
        .suffix_overrides
        .iter()
        .find_map(|token| strip_suffix_token(body, token))
    {
        body = rest.trim_end();
    }

    if body.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trim.prefix.len() + body.len() + trim.suffix.len() + 2);
    if !trim.prefix.is_empty() {
        out.push_str(&trim.prefix);
        out.push(' ');
    }
    out.push_str(body);
    if !trim.suffix.is_empty() {
        out.push(' ');
        out.push_str(&trim.suffix);
    }
    Some(out)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Strip a leading token, ignoring ASCII case
///
/// A token ending in a word character only matches at a word boundary, so
/// `OR` is not stripped from `ORDER`.
fn strip_prefix_token<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let n = token.len();
    if n == 0 || !text.is_char_boundary(n) || !text[..n].eq_ignore_ascii_case(token) {
        return None;
    }
    let rest = &text[n..];
    let needs_boundary = token.chars().next_back().is_some_and(is_word_char);
    if needs_boundary && rest.chars().next().is_some_and(is_word_char) {
        return None;
    }
    Some(rest)
}

/// Strip a trailing token, ignoring ASCII case
fn strip_suffix_token<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let n = token.len();
    if n == 0 || n > text.len() {
        return None;
    }
    let split = text.len() - n;
    if !text.is_char_boundary(split) || !text[split..].eq_ignore_ascii_case(token) {
        return None;
    }
    let rest = &text[..split];
    let needs_boundary = token.chars().next().is_some_and(is_word_char);
    if needs_boundary && rest.chars().next_back().is_some_and(is_word_char) {
        return None;
    }
    Some(rest)
}
