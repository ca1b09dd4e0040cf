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

//! Parameter sources for rendering
//!
//! Anything implementing [`Parameter`] can be rendered against. This module
//! adds the ergonomic sources:
//!
//! - [`NamedParams`] and the [`named_params!`](crate::named_params) macro
//! - positional tuples via [`Params`] and [`params!`](crate::params), seen
//!   by statements as `param1`, `param2`, ... (and `param` when there is one)
//! - user structs via [`impl_parameter!`](crate::impl_parameter)
//!
//! # Examples
//!
//! ```
//! use dynsql::{named_params, Parameter, Value};
//!
//! let env = named_params! { id: 5, name: "alice", tags: vec!["a", "b"] };
//! assert_eq!(env.lookup("id"), Some(Value::integer(5)));
//! assert_eq!(env.lookup("tags").and_then(|t| t.len()), Some(2));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::{Parameter, Value, SCALAR_PARAM};

/// Trait for types that can be converted to parameter values
///
/// Implemented for common Rust types. User structs that should be usable
/// as nested values implement it by building a [`Value::map`].
pub trait ToParam {
    /// Convert self into a Value
    fn to_param(&self) -> Value;
}

macro_rules! impl_to_param_int {
    ($($t:ty),+) => {
        $(
            impl ToParam for $t {
                fn to_param(&self) -> Value {
                    Value::Integer(*self as i64)
                }
            }
        )+
    };
}

impl_to_param_int!(i64, i32, i16, i8, u32, u16, u8);

impl ToParam for usize {
    fn to_param(&self) -> Value {
        i64::try_from(*self)
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Float(*self as f64))
    }
}

impl ToParam for f64 {
    fn to_param(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToParam for f32 {
    fn to_param(&self) -> Value {
        Value::Float(*self as f64)
    }
}

impl ToParam for bool {
    fn to_param(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl ToParam for String {
    fn to_param(&self) -> Value {
        Value::text(self)
    }
}

impl ToParam for &str {
    fn to_param(&self) -> Value {
        Value::text(self)
    }
}

impl ToParam for Arc<str> {
    fn to_param(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToParam for DateTime<Utc> {
    fn to_param(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl ToParam for Value {
    fn to_param(&self) -> Value {
        self.clone()
    }
}

impl ToParam for serde_json::Value {
    fn to_param(&self) -> Value {
        Value::from(self)
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Value {
        match self {
            Some(v) => v.to_param(),
            None => Value::Null,
        }
    }
}

impl<T: ToParam> ToParam for Vec<T> {
    fn to_param(&self) -> Value {
        self.as_slice().to_param()
    }
}

impl<T: ToParam> ToParam for [T] {
    fn to_param(&self) -> Value {
        Value::List(self.iter().map(ToParam::to_param).collect())
    }
}

impl<T: ToParam, const N: usize> ToParam for [T; N] {
    fn to_param(&self) -> Value {
        self.as_slice().to_param()
    }
}

impl<K: AsRef<str>, T: ToParam> ToParam for BTreeMap<K, T> {
    fn to_param(&self) -> Value {
        Value::map(self.iter().map(|(k, v)| (k.as_ref(), v.to_param())))
    }
}

impl<K: AsRef<str>, T: ToParam, S> ToParam for HashMap<K, T, S> {
    fn to_param(&self) -> Value {
        Value::map(self.iter().map(|(k, v)| (k.as_ref(), v.to_param())))
    }
}

impl<T: ToParam> ToParam for &T {
    fn to_param(&self) -> Value {
        (*self).to_param()
    }
}

/// Trait for positional parameter lists
///
/// Implemented for tuples, arrays and vectors of values.
pub trait Params {
    /// Convert into a Vec of Values
    fn into_params(self) -> Vec<Value>;
}

impl Params for () {
    fn into_params(self) -> Vec<Value> {
        Vec::new()
    }
}

impl Params for &[Value] {
    fn into_params(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl Params for Vec<Value> {
    fn into_params(self) -> Vec<Value> {
        self
    }
}

impl<const N: usize> Params for [Value; N] {
    fn into_params(self) -> Vec<Value> {
        self.into_iter().collect()
    }
}

// Tuple implementations for 1-8 elements
macro_rules! impl_params_for_tuple {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T: ToParam),+> Params for ($($T,)+) {
            fn into_params(self) -> Vec<Value> {
                vec![$(self.$idx.to_param()),+]
            }
        }
    };
}

impl_params_for_tuple!(0: T0);
impl_params_for_tuple!(0: T0, 1: T1);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2, 3: T3);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_params_for_tuple!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);

/// Positional arguments exposed by name
///
/// The n-th value (1-based) is visible as `param{n}`. A single value is
/// also visible as `param`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positional {
    values: Vec<Value>,
}

impl Positional {
    /// Collect positional values
    pub fn new<P: Params>(params: P) -> Self {
        Self {
            values: params.into_params(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Parameter for Positional {
    fn lookup(&self, name: &str) -> Option<Value> {
        if name == SCALAR_PARAM && self.values.len() == 1 {
            return self.values.first().cloned();
        }
        let position: usize = name.strip_prefix(SCALAR_PARAM)?.parse().ok()?;
        position
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .cloned()
    }
}

/// Create a positional parameter list
///
/// Expands to a tuple, which implements [`Params`].
///
/// # Examples
///
/// ```
/// use dynsql::{params, Parameter, Positional, Value};
///
/// let env = Positional::new(params![1, "alice"]);
/// assert_eq!(env.lookup("param2"), Some(Value::text("alice")));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ()
    };
    ($($param:expr),+ $(,)?) => {
        ($($param,)+)
    };
}

/// Named parameter bindings
///
/// # Examples
///
/// ```
/// use dynsql::{NamedParams, Parameter, Value};
///
/// let params = NamedParams::new()
///     .add("id", 2)
///     .add("name", "Bob");
/// assert_eq!(params.lookup("name"), Some(Value::text("Bob")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    params: HashMap<String, Value>,
}

impl NamedParams {
    /// Create empty named params
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
        }
    }

    /// Add a named parameter (builder style)
    pub fn add<T: ToParam>(mut self, name: impl Into<String>, value: T) -> Self {
        self.params.insert(name.into(), value.to_param());
        self
    }

    /// Insert a named parameter
    pub fn insert<T: ToParam>(&mut self, name: impl Into<String>, value: T) {
        self.params.insert(name.into(), value.to_param());
    }

    /// Get the underlying HashMap
    pub fn into_inner(self) -> HashMap<String, Value> {
        self.params
    }

    /// Get a reference to the underlying HashMap
    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.params
    }
}

impl From<HashMap<String, Value>> for NamedParams {
    fn from(params: HashMap<String, Value>) -> Self {
        Self { params }
    }
}

impl Parameter for NamedParams {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.params.get(name).cloned()
    }
}

impl ToParam for NamedParams {
    fn to_param(&self) -> Value {
        self.params.to_param()
    }
}

/// Create named parameters
///
/// # Examples
///
/// ```
/// use dynsql::{named_params, Parameter, Value};
///
/// let params = named_params! { id: 1, active: true };
/// assert_eq!(params.lookup("active"), Some(Value::boolean(true)));
/// ```
#[macro_export]
macro_rules! named_params {
    () => {
        $crate::NamedParams::new()
    };
    ($($name:ident : $value:expr),+ $(,)?) => {
        {
            let mut params = $crate::NamedParams::new();
            $(
                params.insert(stringify!($name), $value);
            )+
            params
        }
    };
}

/// Implement [`Parameter`] and [`ToParam`] for a struct by listing the
/// fields statements may read
///
/// Every listed field must implement [`ToParam`].
///
/// # Examples
///
/// ```
/// use dynsql::{impl_parameter, Parameter, Value};
///
/// struct UserQuery {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl_parameter!(UserQuery { id, name });
///
/// let q = UserQuery { id: None, name: "bob".into() };
/// assert_eq!(q.lookup("id"), Some(Value::Null));
/// assert_eq!(q.lookup("name"), Some(Value::text("bob")));
/// assert_eq!(q.lookup("age"), None);
/// ```
#[macro_export]
macro_rules! impl_parameter {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Parameter for $ty {
            fn lookup(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                match name {
                    $(stringify!($field) => ::std::option::Option::Some(
                        $crate::ToParam::to_param(&self.$field),
                    ),)+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::ToParam for $ty {
            fn to_param(&self) -> $crate::Value {
                $crate::Value::map([
                    $((stringify!($field), $crate::ToParam::to_param(&self.$field)),)+
                ])
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_param_integers() {
        assert_eq!(42i64.to_param(), Value::Integer(42));
        assert_eq!(42i32.to_param(), Value::Integer(42));
        assert_eq!(42u8.to_param(), Value::Integer(42));
        assert_eq!(42usize.to_param(), Value::Integer(42));
    }

    #[test]
    fn test_to_param_strings_and_options() {
        assert_eq!("hello".to_param(), Value::text("hello"));
        assert_eq!(String::from("world").to_param(), Value::text("world"));
        assert_eq!(Some(42i64).to_param(), Value::Integer(42));
        assert!(Option::<i64>::None.to_param().is_null());
    }

    #[test]
    fn test_to_param_collections() {
        assert_eq!(vec![1i64, 2].to_param(), Value::list([1i64, 2]));
        assert_eq!([1i64, 2, 3].to_param().len(), Some(3));

        let mut map = BTreeMap::new();
        map.insert("a", 1i64);
        assert_eq!(map.to_param(), Value::map([("a", 1i64)]));
    }

    #[test]
    fn test_params_tuple() {
        let params = (1i64, "hello", 3.5f64).into_params();
        assert_eq!(
            params,
            vec![Value::Integer(1), Value::text("hello"), Value::Float(3.5)]
        );
    }

    #[test]
    fn test_params_macro() {
        let params = params![1, "hello"].into_params();
        assert_eq!(params.len(), 2);
        let empty: Vec<Value> = params![].into_params();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_positional_lookup() {
        let env = Positional::new((7i64,));
        assert_eq!(env.lookup("param"), Some(Value::Integer(7)));
        assert_eq!(env.lookup("param1"), Some(Value::Integer(7)));
        assert_eq!(env.lookup("param0"), None);
        assert_eq!(env.lookup("param2"), None);

        let env = Positional::new(params![1, "a"]);
        assert_eq!(env.lookup("param"), None);
        assert_eq!(env.lookup("param2"), Some(Value::text("a")));
        assert_eq!(env.lookup("other"), None);
    }

    #[test]
    fn test_named_params() {
        let params = named_params! { id: 1, name: "alice" };
        assert_eq!(params.lookup("id"), Some(Value::Integer(1)));
        assert_eq!(params.lookup("missing"), None);
        assert_eq!(params.as_map().len(), 2);
    }

    struct Filter {
        ids: Vec<i64>,
        owner: Option<String>,
    }

    crate::impl_parameter!(Filter { ids, owner });

    #[test]
    fn test_impl_parameter() {
        let filter = Filter {
            ids: vec![1, 2],
            owner: None,
        };
        assert_eq!(filter.lookup("ids"), Some(Value::list([1i64, 2])));
        assert_eq!(filter.lookup("owner"), Some(Value::Null));
        assert_eq!(
            filter.to_param(),
            Value::map([("ids", Value::list([1i64, 2])), ("owner", Value::Null)])
        );
    }
}
