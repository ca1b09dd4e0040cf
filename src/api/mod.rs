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

//! Top-level mapper API
//!
//! # Quick Start
//!
//! ```
//! use dynsql::{named_params, params, Engine, Positional};
//!
//! let engine = Engine::from_xml(r#"
//!     <mapper namespace="orders">
//!       <sql id="columns">id, total</sql>
//!       <select id="byIds" resultType="Order">
//!         SELECT <include refid="columns"/> FROM orders
//!         WHERE id IN <foreach collection="ids" open="(" separator="," close=")">#{item}</foreach>
//!       </select>
//!       <select id="byOwner">SELECT * FROM orders WHERE owner = #{param}</select>
//!     </mapper>"#).unwrap();
//!
//! // Named parameters
//! let stmt = engine.render("orders.byIds", named_params! { ids: vec![1, 2, 3] }).unwrap();
//! assert_eq!(stmt.sql(), "SELECT id, total FROM orders WHERE id IN (?,?,?)");
//! assert_eq!(stmt.args().len(), 3);
//!
//! // A single positional value is visible as `param`
//! let stmt = engine.render("orders.byOwner", Positional::new(params!["alice"])).unwrap();
//! assert_eq!(stmt.args().len(), 1);
//! ```
//!
//! # Parameter Binding
//!
//! Anything implementing [`crate::Parameter`] can be passed: `()`,
//! [`NamedParams`], [`Positional`], maps, [`crate::Value`] trees,
//! `serde_json::Value`, or a struct wired up with
//! [`impl_parameter!`](crate::impl_parameter).

pub mod engine;
pub mod params;

pub use engine::{BoundStatement, Engine};
pub use params::{NamedParams, Params, Positional, ToParam};
