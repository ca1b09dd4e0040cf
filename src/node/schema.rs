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

//! Per-element attribute schema
//!
//! Each element declares the attributes it requires and the pairs it
//! refuses to see together. Validation runs when the start tag is read, so
//! a malformed statement fails at load instead of at first render.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::core::{Error, Result};

/// Attribute name to value, as read from a start tag
pub type Attributes = FxHashMap<String, String>;

/// Attribute rules for one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSchema {
    /// Element name
    pub name: &'static str,
    /// Attributes that must be present and non-empty
    pub required: &'static [&'static str],
    /// Attribute pairs that must not both be present; the second is reported
    pub exclusive: &'static [(&'static str, &'static str)],
    /// Attributes whose value is parsed as a test expression
    pub expressions: &'static [&'static str],
}

impl NodeSchema {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            required: &[],
            exclusive: &[],
            expressions: &[],
        }
    }

    const fn required(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }

    const fn exclusive(mut self, exclusive: &'static [(&'static str, &'static str)]) -> Self {
        self.exclusive = exclusive;
        self
    }

    const fn expressions(mut self, expressions: &'static [&'static str]) -> Self {
        self.expressions = expressions;
        self
    }

    /// Check required and mutually exclusive attributes
    pub fn validate(&self, attrs: &Attributes) -> Result<()> {
        for attr in self.required {
            let present = attrs.get(*attr).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(Error::attribute_required(self.name, *attr));
            }
        }

        for (first, second) in self.exclusive {
            if attrs.contains_key(*first) && attrs.contains_key(*second) {
                return Err(Error::attribute_conflict(self.name, *second));
            }
        }

        Ok(())
    }

    /// Returns true if the attribute holds a test expression
    pub fn is_expression(&self, attr: &str) -> bool {
        self.expressions.iter().any(|name| *name == attr)
    }
}

const STATEMENT_EXCLUSIVE: &[(&str, &str)] = &[("resultMap", "resultType")];

static SCHEMAS: LazyLock<FxHashMap<&'static str, NodeSchema>> = LazyLock::new(|| {
    [
        NodeSchema::new("mappers"),
        NodeSchema::new("mapper").required(&["namespace"]),
        NodeSchema::new("select")
            .required(&["id"])
            .exclusive(STATEMENT_EXCLUSIVE),
        NodeSchema::new("insert")
            .required(&["id"])
            .exclusive(STATEMENT_EXCLUSIVE),
        NodeSchema::new("update")
            .required(&["id"])
            .exclusive(STATEMENT_EXCLUSIVE),
        NodeSchema::new("delete")
            .required(&["id"])
            .exclusive(STATEMENT_EXCLUSIVE),
        NodeSchema::new("sql").required(&["id"]),
        NodeSchema::new("if")
            .required(&["test"])
            .expressions(&["test"]),
        NodeSchema::new("choose"),
        NodeSchema::new("when")
            .required(&["test"])
            .expressions(&["test"]),
        NodeSchema::new("otherwise"),
        NodeSchema::new("foreach")
            .required(&["collection"])
            .expressions(&["collection"]),
        NodeSchema::new("include").required(&["refid"]),
        NodeSchema::new("trim"),
        NodeSchema::new("where"),
        NodeSchema::new("set"),
    ]
    .into_iter()
    .map(|schema| (schema.name, schema))
    .collect()
});

/// Look up the schema for an element name
pub fn schema_for(name: &str) -> Option<&'static NodeSchema> {
    SCHEMAS.get(name)
}
