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

//! # Dynsql - Dynamic SQL mapper engine
//!
//! Dynsql loads SQL statements declared in XML mapper documents and renders
//! them into final SQL text plus an ordered list of bind arguments. Statement
//! bodies mix literal SQL with dynamic elements that are evaluated against
//! the caller's parameters at render time.
//!
//! ## Key Features
//!
//! - **Conditionals** - `<if>`, `<choose>`/`<when>`/`<otherwise>` driven by a small expression language
//! - **Loops** - `<foreach>` over lists and maps with open/close/separator
//! - **Clause helpers** - `<where>`, `<set>` and `<trim>` strip dangling connectives
//! - **Fragments** - `<sql>` fragments reused through `<include>`, across documents
//! - **Placeholders** - `?`, `$N`, `:N` or `@pN` output per dialect
//! - **Atomic loading** - a document is registered entirely or not at all
//!
//! ## Quick Start
//!
//! ```rust
//! use dynsql::{named_params, Engine};
//!
//! let engine = Engine::from_xml(r#"
//!     <mapper namespace="users">
//!       <select id="search" resultMap="User">
//!         SELECT * FROM users
//!         <where>
//!           <if test="name != null">AND name = #{name}</if>
//!           <if test="age != null and age > 0">AND age > #{age}</if>
//!         </where>
//!       </select>
//!     </mapper>"#).unwrap();
//!
//! let stmt = engine.render("users.search", named_params! { age: 30 }).unwrap();
//! assert_eq!(stmt.sql(), "SELECT * FROM users WHERE age > ?");
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Engine, bound statements and parameter binding ([`api::Engine`])
//! - [`core`] - Core types ([`Value`], [`Parameter`], [`Error`])
//! - [`expr`] - Test/collection expression lexer, parser and evaluator
//! - [`node`] - Statement tree and the XML builder
//! - [`registry`] - Named statement registry and document loading
//! - [`render`] - Tree walker producing SQL and arguments
//! - [`config`] - Placeholder style and render limits

pub mod api;
pub mod config;
pub mod core;
pub mod expr;
pub mod node;
pub mod registry;
pub mod render;

// Re-export main types for convenience
pub use core::{Cause, Error, Parameter, Result, Value, SCALAR_PARAM};

// Re-export expression entry points
pub use expr::{parse as parse_expression, Expr, Path, SyntaxError};

// Re-export tree types
pub use node::{build_document, Document, Node};

// Re-export registry types
pub use registry::{Statement, StatementKind, StatementName, StatementRegistry};

// Re-export render types
pub use render::{RenderResult, Renderer};

// Re-export config types
pub use config::{Placeholder, RenderConfig};

// Re-export API types
pub use api::{BoundStatement, Engine, NamedParams, Params, Positional, ToParam};
