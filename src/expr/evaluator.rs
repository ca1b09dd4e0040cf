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

//! Expression evaluation
//!
//! Evaluation is a pure function of the tree and the environment. Absent
//! identifiers evaluate to NULL so that `x != null` guards work for keys
//! the caller never supplied.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use crate::core::{Error, Parameter, Result, Value};

impl Expr {
    /// Evaluate this expression against a parameter environment
    pub fn evaluate(&self, env: &dyn Parameter) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path(path) => Ok(path.resolve(env).unwrap_or_default()),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(env)?;
                eval_unary(*op, value)
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    if !left.evaluate(env)?.is_truthy() {
                        return Ok(Value::boolean(false));
                    }
                    Ok(Value::boolean(right.evaluate(env)?.is_truthy()))
                }
                BinaryOp::Or => {
                    if left.evaluate(env)?.is_truthy() {
                        return Ok(Value::boolean(true));
                    }
                    Ok(Value::boolean(right.evaluate(env)?.is_truthy()))
                }
                _ => {
                    let l = left.evaluate(env)?;
                    let r = right.evaluate(env)?;
                    eval_binary(*op, &l, &r)
                }
            },
            Expr::In {
                needle,
                haystack,
                negated,
            } => {
                let needle = needle.evaluate(env)?;
                let found = match haystack.as_ref() {
                    Expr::List(items) => {
                        let mut found = false;
                        for item in items {
                            if loosely_equal(&needle, &item.evaluate(env)?) {
                                found = true;
                                break;
                            }
                        }
                        found
                    }
                    other => contains(&other.evaluate(env)?, &needle)?,
                };
                Ok(Value::boolean(found != *negated))
            }
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| item.evaluate(env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::list(values))
            }
        }
    }

    /// Evaluate and reduce to a truth value
    pub fn is_satisfied(&self, env: &dyn Parameter) -> Result<bool> {
        Ok(self.evaluate(env)?.is_truthy())
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::boolean(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Integer(v) => v
                .checked_neg()
                .map(Value::integer)
                .ok_or(Error::IntegerOverflow),
            Value::Float(v) => Ok(Value::float(-v)),
            other => Err(Error::type_mismatch(
                "unary -",
                other.type_name(),
                other.type_name(),
            )),
        },
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => left.equals(right).map(Value::boolean),
        BinaryOp::NotEq => left.equals(right).map(|eq| Value::boolean(!eq)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = left
                .compare(right)
                .map_err(|_| mismatch(op, left, right))?;
            Ok(Value::boolean(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, left, right)
        }
        BinaryOp::And => Ok(Value::boolean(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::boolean(left.is_truthy() || right.is_truthy())),
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(Error::DivisionByZero),
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Value::integer).ok_or(Error::IntegerOverflow)
        }
        (Value::Text(a), Value::Text(b)) if op == BinaryOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::text(joined))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let (Some(x), Some(y)) = (a.as_float64(), b.as_float64()) else {
                return Err(mismatch(op, left, right));
            };
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Mod if y == 0.0 => return Err(Error::DivisionByZero),
                BinaryOp::Div => x / y,
                _ => x % y,
            };
            Ok(Value::float(result))
        }
        _ => Err(mismatch(op, left, right)),
    }
}

/// Membership against an evaluated collection
///
/// NULL (an absent collection) contains nothing.
fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match haystack {
        Value::Null => Ok(false),
        Value::List(items) => Ok(items.iter().any(|item| loosely_equal(needle, item))),
        Value::Map(entries) => match needle {
            Value::Text(key) => Ok(entries.contains_key(key.as_ref())),
            other => Ok(entries.contains_key(&other.to_string())),
        },
        Value::Text(text) => match needle {
            Value::Text(part) => Ok(text.contains(part.as_ref())),
            other => Err(Error::type_mismatch("in", other.type_name(), "text")),
        },
        other => Err(Error::type_mismatch(
            "in",
            needle.type_name(),
            other.type_name(),
        )),
    }
}

/// Equality where values of unrelated types are simply unequal
fn loosely_equal(a: &Value, b: &Value) -> bool {
    matches!(a.equals(b), Ok(true))
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> Error {
    Error::type_mismatch(op.as_str(), left.type_name(), right.type_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use std::collections::HashMap;

    fn env() -> HashMap<String, Value> {
        let mut env = HashMap::new();
        env.insert("age".to_string(), Value::integer(30));
        env.insert("name".to_string(), Value::text("alice"));
        env.insert("empty".to_string(), Value::text(""));
        env.insert("score".to_string(), Value::float(2.5));
        env.insert("nan".to_string(), Value::float(f64::NAN));
        env.insert("ids".to_string(), Value::list([1i64, 2, 3]));
        env.insert("nothing".to_string(), Value::Null);
        let user = [("role", Value::text("ops")), ("level", Value::integer(3))];
        env.insert("user".to_string(), Value::map(user));
        env
    }

    fn eval(input: &str) -> Value {
        let expr = parse(input).unwrap_or_else(|e| panic!("{}: {}", input, e));
        expr.evaluate(&env())
            .unwrap_or_else(|e| panic!("{}: {}", input, e))
    }

    fn eval_err(input: &str) -> Error {
        let expr = parse(input).unwrap_or_else(|e| panic!("{}: {}", input, e));
        match expr.evaluate(&env()) {
            Ok(v) => panic!("expected {} to fail, got {}", input, v),
            Err(e) => e,
        }
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("age > 18"), Value::boolean(true));
        assert_eq!(eval("age >= 30"), Value::boolean(true));
        assert_eq!(eval("age < 30"), Value::boolean(false));
        assert_eq!(eval("score <= 2.5"), Value::boolean(true));
        assert_eq!(eval("age == 30.0"), Value::boolean(true));
        assert_eq!(eval("name == 'alice'"), Value::boolean(true));
        assert_eq!(eval("name != 'bob'"), Value::boolean(true));
    }

    #[test]
    fn test_nan_is_unequal_to_itself() {
        assert_eq!(eval("nan == nan"), Value::boolean(false));
        assert_eq!(eval("nan != nan"), Value::boolean(true));
        assert_eq!(eval("nan in (1, 2)"), Value::boolean(false));
    }

    #[test]
    fn test_absent_identifier_is_null() {
        assert_eq!(eval("missing == null"), Value::boolean(true));
        assert_eq!(eval("missing != null"), Value::boolean(false));
        assert_eq!(eval("nothing == nil"), Value::boolean(true));
        assert_eq!(eval("user.phone == null"), Value::boolean(true));
    }

    #[test]
    fn test_connectives_short_circuit() {
        assert_eq!(eval("name != null and name != ''"), Value::boolean(true));
        assert_eq!(eval("empty != null and empty != ''"), Value::boolean(false));
        // the right side would be a type mismatch
        assert_eq!(
            eval("missing != null and missing > 3"),
            Value::boolean(false)
        );
        assert_eq!(eval("age > 1 or missing > 3"), Value::boolean(true));
        assert_eq!(eval("not empty"), Value::boolean(true));
        assert_eq!(eval("!(age > 18)"), Value::boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("age + 1"), Value::integer(31));
        assert_eq!(eval("age * 2 - 10"), Value::integer(50));
        assert_eq!(eval("age / 4"), Value::integer(7));
        assert_eq!(eval("age % 7"), Value::integer(2));
        assert_eq!(eval("score * 2"), Value::float(5.0));
        assert_eq!(eval("-age"), Value::integer(-30));
        assert_eq!(eval("name + '!'"), Value::text("alice!"));
        assert_eq!(eval("age % 2 == 0"), Value::boolean(true));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval_err("age / 0"), Error::DivisionByZero);
        assert_eq!(eval_err("age % 0"), Error::DivisionByZero);
        assert_eq!(eval_err("score / 0"), Error::DivisionByZero);
    }

    #[test]
    fn test_overflow() {
        assert_eq!(eval_err("9223372036854775807 + 1"), Error::IntegerOverflow);
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            eval_err("name > 3"),
            Error::type_mismatch(">", "text", "integer")
        );
        assert!(matches!(eval_err("name == 3"), Error::TypeMismatch { .. }));
        assert!(matches!(
            eval_err("missing > 3"),
            Error::TypeMismatch { .. }
        ));
        assert!(matches!(eval_err("-name"), Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_membership() {
        assert_eq!(eval("2 in ids"), Value::boolean(true));
        assert_eq!(eval("5 in ids"), Value::boolean(false));
        assert_eq!(eval("5 not in ids"), Value::boolean(true));
        assert_eq!(eval("name in ('bob', 'alice')"), Value::boolean(true));
        assert_eq!(eval("'role' in user"), Value::boolean(true));
        assert_eq!(eval("'lic' in name"), Value::boolean(true));
        assert_eq!(eval("1 in missing"), Value::boolean(false));
        assert_eq!(eval("'x' in ids"), Value::boolean(false));
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval("user.role == 'ops'"), Value::boolean(true));
        assert_eq!(eval("user.level + 1"), Value::integer(4));
        assert_eq!(eval("ids.1"), Value::integer(2));
    }

    #[test]
    fn test_is_satisfied() {
        let expr = parse("ids").unwrap();
        assert!(expr.is_satisfied(&env()).unwrap());
        let expr = parse("missing").unwrap();
        assert!(!expr.is_satisfied(&env()).unwrap());
    }
}
