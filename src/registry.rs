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

//! Statement Registry
//!
//! Maps qualified statement names (`namespace.id`) to built statements.
//! A registry is an ordinary value: build one, load documents into it, then
//! share it (usually behind an `Arc`) for read-only rendering. Nothing here
//! is global, so independent registries can coexist in one process.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{Error, Result};
use crate::node::{build_document, Node};

/// Qualified statement identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementName {
    namespace: String,
    id: String,
}

impl StatementName {
    /// Create a name from its namespace and id
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }

    /// Split `namespace.id` at the last dot; a bare id has an empty namespace
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((namespace, id)) => Self::new(namespace, id),
            None => Self::new("", qualified),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for StatementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}.{}", self.namespace, self.id)
        }
    }
}

/// Element a statement was declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Reusable `<sql>` fragment
    Sql,
}

impl StatementKind {
    /// Map an element name to a statement kind
    pub fn from_element(element: &str) -> Option<Self> {
        match element {
            "select" => Some(StatementKind::Select),
            "insert" => Some(StatementKind::Insert),
            "update" => Some(StatementKind::Update),
            "delete" => Some(StatementKind::Delete),
            "sql" => Some(StatementKind::Sql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Sql => "sql",
        }
    }

    /// Returns true for `<sql>` fragments
    pub fn is_fragment(&self) -> bool {
        matches!(self, StatementKind::Sql)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, fully built statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    name: StatementName,
    kind: StatementKind,
    body: Node,
    pub(crate) result_map: Option<String>,
    pub(crate) result_type: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl Statement {
    /// Create a statement whose body is a root node over `children`
    pub fn new(name: StatementName, kind: StatementKind, children: Vec<Node>) -> Self {
        Self {
            name,
            kind,
            body: Node::Root(children),
            result_map: None,
            result_type: None,
            timeout: None,
        }
    }

    /// Set the declared result map
    pub fn with_result_map(mut self, result_map: impl Into<String>) -> Self {
        self.result_map = Some(result_map.into());
        self
    }

    /// Set the declared result type
    pub fn with_result_type(mut self, result_type: impl Into<String>) -> Self {
        self.result_type = Some(result_type.into());
        self
    }

    /// Set the execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &StatementName {
        &self.name
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// The root node
    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn result_map(&self) -> Option<&str> {
        self.result_map.as_deref()
    }

    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Registry of built statements keyed by qualified name
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    statements: FxHashMap<String, Arc<Statement>>,
}

impl StatementRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statement
    ///
    /// Fails with [`Error::StatementAlreadyExists`] if the name is taken.
    pub fn register(&mut self, statement: Statement) -> Result<()> {
        let key = statement.name().to_string();
        if self.statements.contains_key(&key) {
            return Err(Error::StatementAlreadyExists(key));
        }
        log::debug!("registered {} {}", statement.kind(), key);
        self.statements.insert(key, Arc::new(statement));
        Ok(())
    }

    /// Look up a statement by qualified name
    pub fn lookup(&self, name: &str) -> Result<&Arc<Statement>> {
        self.statements
            .get(name)
            .ok_or_else(|| Error::SqlNodeNotFound(name.to_string()))
    }

    /// Returns true if a statement is registered under the name
    pub fn contains(&self, name: &str) -> bool {
        self.statements.contains_key(name)
    }

    /// Number of registered statements and fragments
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.statements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a mapper document and register every statement in it
    ///
    /// The document is fully built and checked for name collisions before
    /// anything is registered, so a failing document leaves the registry
    /// unchanged. Returns the number of statements added.
    pub fn load_str(&mut self, xml: &str) -> Result<usize> {
        let document = build_document(xml)?;

        let mut seen = FxHashSet::default();
        for statement in &document.statements {
            let key = statement.name().to_string();
            if self.statements.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(Error::StatementAlreadyExists(key));
            }
        }

        let count = document.statements.len();
        for statement in document.statements {
            self.register(statement)?;
        }

        log::debug!(
            "loaded mapper document ({}) with {} statements",
            document.namespaces.join(", "),
            count
        );
        Ok(count)
    }

    /// Read a mapper document from disk and load it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)?;
        log::debug!("loading mapper file {}", path.display());
        self.load_str(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"
        <mapper namespace="users">
          <sql id="columns">id, name</sql>
          <select id="all">SELECT <include refid="columns"/> FROM users</select>
        </mapper>"#;

    #[test]
    fn test_statement_name() {
        let name = StatementName::parse("app.users.find");
        assert_eq!(name.namespace(), "app.users");
        assert_eq!(name.id(), "find");
        assert_eq!(name.to_string(), "app.users.find");

        let bare = StatementName::parse("find");
        assert_eq!(bare.namespace(), "");
        assert_eq!(bare.to_string(), "find");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = StatementRegistry::new();
        let stmt = Statement::new(
            StatementName::new("users", "count"),
            StatementKind::Select,
            vec![Node::Literal("SELECT COUNT(*) FROM users".to_string())],
        );
        registry.register(stmt).unwrap();

        let found = registry.lookup("users.count").unwrap();
        assert_eq!(found.kind(), StatementKind::Select);
        assert!(registry.contains("users.count"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = StatementRegistry::new();
        let stmt = Statement::new(StatementName::new("a", "b"), StatementKind::Sql, vec![]);
        registry.register(stmt.clone()).unwrap();
        assert_eq!(
            registry.register(stmt).unwrap_err(),
            Error::StatementAlreadyExists("a.b".to_string())
        );
    }

    #[test]
    fn test_lookup_missing() {
        let registry = StatementRegistry::new();
        assert_eq!(
            registry.lookup("missing").unwrap_err(),
            Error::SqlNodeNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_load_str() {
        let mut registry = StatementRegistry::new();
        assert_eq!(registry.load_str(USERS).unwrap(), 2);
        assert_eq!(registry.names(), vec!["users.all", "users.columns"]);
        let columns = registry.lookup("users.columns").unwrap();
        assert!(columns.kind().is_fragment());
    }

    #[test]
    fn test_load_is_atomic() {
        let mut registry = StatementRegistry::new();
        registry.load_str(USERS).unwrap();

        // second document collides on users.all after adding users.other
        let colliding = r#"
            <mapper namespace="users">
              <select id="other">SELECT 1</select>
              <select id="all">SELECT 2</select>
            </mapper>"#;
        assert_eq!(
            registry.load_str(colliding).unwrap_err(),
            Error::StatementAlreadyExists("users.all".to_string())
        );
        assert!(!registry.contains("users.other"));
        assert_eq!(registry.len(), 2);

        // a broken document registers nothing either
        let broken = r#"<mapper namespace="orders"><select id="a">x</mapper>"#;
        assert_eq!(
            registry.load_str(broken).unwrap_err(),
            Error::unclosed("select")
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_within_document() {
        let mut registry = StatementRegistry::new();
        let doc = r#"<mapper namespace="n"><sql id="a">x</sql><sql id="a">y</sql></mapper>"#;
        assert_eq!(
            registry.load_str(doc).unwrap_err(),
            Error::StatementAlreadyExists("n.a".to_string())
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_file_missing() {
        let mut registry = StatementRegistry::new();
        let err = registry.load_file("/nonexistent/mapper.xml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
