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

//! Render configuration
//!

use std::fmt;
use std::str::FromStr;

use crate::core::Error;

/// Bind placeholder style emitted for `#{...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Placeholder {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
    /// `:1`, `:2`, ... (Oracle)
    Colon,
    /// `@p1`, `@p2`, ... (SQL Server)
    AtP,
}

impl Placeholder {
    /// Append the placeholder for the 1-based argument `position`
    pub fn write_to(&self, out: &mut String, position: usize) {
        let marker = match self {
            Placeholder::Question => {
                out.push('?');
                return;
            }
            Placeholder::Dollar => "$",
            Placeholder::Colon => ":",
            Placeholder::AtP => "@p",
        };
        out.push_str(marker);
        out.push_str(&position.to_string());
    }

    /// Returns true if placeholders carry their position
    pub fn is_numbered(&self) -> bool {
        !matches!(self, Placeholder::Question)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Question => write!(f, "?"),
            Placeholder::Dollar => write!(f, "$N"),
            Placeholder::Colon => write!(f, ":N"),
            Placeholder::AtP => write!(f, "@pN"),
        }
    }
}

impl FromStr for Placeholder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "?" | "mysql" | "sqlite" | "sqlite3" => Ok(Placeholder::Question),
            "$" | "$n" | "postgres" | "postgresql" | "pgx" => Ok(Placeholder::Dollar),
            ":" | ":n" | "oracle" | "oci8" | "godror" => Ok(Placeholder::Colon),
            "@p" | "@pn" | "mssql" | "sqlserver" => Ok(Placeholder::AtP),
            _ => Err(Error::InvalidConfig(format!(
                "unknown placeholder style: {}",
                s
            ))),
        }
    }
}

/// Options that shape rendered SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Placeholder style
    /// Default: Question
    pub placeholder: Placeholder,

    /// Maximum include nesting before a render fails
    /// Default: 16
    pub max_include_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            placeholder: Placeholder::Question,
            max_include_depth: 16,
        }
    }
}

impl RenderConfig {
    /// Creates a RenderConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder style
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Set the include depth limit
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}
