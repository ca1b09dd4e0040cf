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

//! Engine: the statement invocation boundary
//!
//! An [`Engine`] owns a registry handle and a [`RenderConfig`]. Callers ask
//! for a statement by name with some parameters and get back a
//! [`BoundStatement`]: final SQL, ordered arguments, and the statement's
//! metadata for the execution layer.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::RenderConfig;
use crate::core::{Error, Parameter, Result, Value};
use crate::registry::{Statement, StatementKind, StatementName, StatementRegistry};
use crate::render::{RenderResult, Renderer};

/// Mapper engine
///
/// Renders take a snapshot of the current registry and run without holding
/// any lock, so a [`reload`](Engine::reload) never blocks or disturbs
/// renders already in flight. Reloads themselves must be serialized by the
/// caller.
///
/// # Examples
///
/// ```
/// use dynsql::{named_params, Engine, Value};
///
/// let engine = Engine::from_xml(r#"
///     <mapper namespace="users">
///       <select id="find" resultMap="User">
///         SELECT * FROM users <where><if test="id != null">AND id = #{id}</if></where>
///       </select>
///     </mapper>"#).unwrap();
///
/// let stmt = engine.render("users.find", named_params! { id: 5 }).unwrap();
/// assert_eq!(stmt.sql(), "SELECT * FROM users WHERE id = ?");
/// assert_eq!(stmt.args(), &[Value::integer(5)]);
/// assert_eq!(stmt.result_map().unwrap(), "User");
/// ```
#[derive(Debug)]
pub struct Engine {
    registry: RwLock<Arc<StatementRegistry>>,
    config: RenderConfig,
}

impl Engine {
    /// Create an engine over a loaded registry with the default config
    pub fn new(registry: StatementRegistry) -> Self {
        Self::with_config(registry, RenderConfig::default())
    }

    /// Create an engine with an explicit config
    pub fn with_config(registry: StatementRegistry, config: RenderConfig) -> Self {
        Self {
            registry: RwLock::new(Arc::new(registry)),
            config,
        }
    }

    /// Build an engine from one mapper document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut registry = StatementRegistry::new();
        registry.load_str(xml)?;
        Ok(Self::new(registry))
    }

    /// Build an engine from mapper files, loaded in order
    pub fn from_files<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut registry = StatementRegistry::new();
        for path in paths {
            registry.load_file(path)?;
        }
        Ok(Self::new(registry))
    }

    /// The render configuration
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Snapshot of the current registry
    pub fn registry(&self) -> Arc<StatementRegistry> {
        self.registry.read().clone()
    }

    /// Replace the registry, returning the previous one
    ///
    /// Renders that already took a snapshot finish against the old registry.
    pub fn reload(&self, registry: StatementRegistry) -> Arc<StatementRegistry> {
        let next = Arc::new(registry);
        log::debug!("reloading registry with {} statements", next.len());
        std::mem::replace(&mut *self.registry.write(), next)
    }

    /// Render a statement by qualified name
    pub fn render<P: Parameter>(&self, name: &str, params: P) -> Result<BoundStatement> {
        let registry = self.registry();
        let statement = Arc::clone(registry.lookup(name)?);
        let result = Renderer::new(&registry, &self.config)
            .render_statement(&statement, &params)?;
        Ok(BoundStatement::new(statement, result))
    }
}

/// A rendered statement ready for the execution layer
#[derive(Debug, Clone)]
pub struct BoundStatement {
    statement: Arc<Statement>,
    sql: String,
    args: Vec<Value>,
}

impl BoundStatement {
    fn new(statement: Arc<Statement>, result: RenderResult) -> Self {
        let (sql, args) = result.into_parts();
        Self {
            statement,
            sql,
            args,
        }
    }

    /// The statement's qualified name
    pub fn name(&self) -> &StatementName {
        self.statement.name()
    }

    pub fn kind(&self) -> StatementKind {
        self.statement.kind()
    }

    /// Final SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind arguments, in placeholder order
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The declared result map
    ///
    /// Fails with [`Error::ResultMapNotSet`] when the statement declares
    /// none; the execution layer calls this only when it needs to bind rows
    /// onto a result map.
    pub fn result_map(&self) -> Result<&str> {
        self.statement.result_map().ok_or(Error::ResultMapNotSet)
    }

    /// The declared result type, if any
    pub fn result_type(&self) -> Option<&str> {
        self.statement.result_type()
    }

    /// The declared execution timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.statement.timeout()
    }

    /// Split into SQL text and arguments
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}
