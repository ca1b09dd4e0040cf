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

//! Parameter environments
//!
//! A parameter environment is anything that can answer "what is the value
//! named `x`?". Dotted paths resolve their first segment through
//! [`Parameter::lookup`] and walk the remaining segments on the returned
//! [`Value`].
//!
//! Mapping-like sources (hash maps, B-tree maps, JSON objects, map values)
//! implement the trait here. Structure-like sources implement it by hand or
//! through the [`impl_parameter!`](crate::impl_parameter) macro.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use super::value::Value;

/// Name under which a bare scalar parameter is visible
pub const SCALAR_PARAM: &str = "param";

/// Read-only lookup capability over a parameter environment
pub trait Parameter {
    /// Look up a top-level name; `None` means absent
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<T: Parameter + ?Sized> Parameter for &T {
    fn lookup(&self, name: &str) -> Option<Value> {
        (**self).lookup(name)
    }
}

/// The empty environment
impl Parameter for () {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Maps expose their keys; any other non-null scalar is visible as `param`
impl Parameter for Value {
    fn lookup(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(entries) => entries.get(name).cloned(),
            Value::Null => None,
            other if name == SCALAR_PARAM => Some(other.clone()),
            _ => None,
        }
    }
}

impl<K, V, S> Parameter for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: Clone + Into<Value>,
    S: BuildHasher,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<K, V> Parameter for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Clone + Into<Value>,
{
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl Parameter for serde_json::Value {
    fn lookup(&self, name: &str) -> Option<Value> {
        match self {
            serde_json::Value::Object(entries) => entries.get(name).map(Value::from),
            serde_json::Value::Null => None,
            other if name == SCALAR_PARAM => Some(Value::from(other)),
            _ => None,
        }
    }
}
