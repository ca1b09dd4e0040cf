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

//! Derived environments for loop bodies

use smallvec::SmallVec;

use crate::core::{Parameter, Value};

/// Environment layering a few bindings over a parent
///
/// Bindings shadow the parent; the parent is never modified.
pub struct Scope<'a> {
    parent: &'a dyn Parameter,
    bindings: SmallVec<[(&'a str, Value); 2]>,
}

impl<'a> Scope<'a> {
    /// Create an empty scope over `parent`
    pub fn new(parent: &'a dyn Parameter) -> Self {
        Self {
            parent,
            bindings: SmallVec::new(),
        }
    }

    /// Bind a name, replacing an earlier binding of the same name
    pub fn bind(&mut self, name: &'a str, value: Value) {
        match self.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((name, value)),
        }
    }
}

impl Parameter for Scope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .or_else(|| self.parent.lookup(name))
    }
}
