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

//! Operator precedence levels for the Pratt parser

/// Precedence levels (higher number = higher precedence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Precedence {
    /// Lowest precedence
    #[default]
    Lowest = 1,
    /// Logical OR (or, ||)
    Or = 2,
    /// Logical AND (and, &&)
    And = 3,
    /// Equality and membership (==, !=, in, not in)
    Equals = 4,
    /// Ordering comparisons (<, >, <=, >=)
    LessGreater = 5,
    /// Addition and subtraction (+, -)
    Sum = 6,
    /// Multiplication, division, remainder (*, /, %)
    Product = 7,
    /// Prefix operators (not, !, unary -)
    Prefix = 8,
    /// Path access (user.name)
    Dot = 9,
}

impl Precedence {
    /// Get precedence for an infix operator or keyword
    pub fn for_operator(op: &str) -> Precedence {
        match op {
            "or" | "||" => Precedence::Or,
            "and" | "&&" => Precedence::And,
            // "not" only appears in infix position as the start of "not in"
            "==" | "!=" | "in" | "not" => Precedence::Equals,
            "<" | ">" | "<=" | ">=" => Precedence::LessGreater,
            "+" | "-" => Precedence::Sum,
            "*" | "/" | "%" => Precedence::Product,
            "." => Precedence::Dot,
            _ => Precedence::Lowest,
        }
    }
}
