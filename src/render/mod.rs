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

//! Renderer
//!
//! Walks a statement tree depth-first, left to right, against one
//! parameter environment. Text accumulates into a single buffer and bind
//! arguments into a list, so the n-th placeholder in the output always
//! corresponds to the n-th argument.
//!
//! Includes are resolved here, by name, through the registry. This keeps
//! forward references between documents legal; a depth limit from
//! [`RenderConfig`] stops include cycles.

pub mod scope;
pub mod trim;

use crate::config::RenderConfig;
use crate::core::{Error, Parameter, Result, Value};
use crate::node::{Choose, Include, Loop, Node};
use crate::registry::{Statement, StatementRegistry};

pub use scope::Scope;

/// Final SQL text and its ordered bind arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderResult {
    /// SQL text with placeholders
    pub sql: String,
    /// One argument per placeholder, in placeholder order
    pub args: Vec<Value>,
}

impl RenderResult {
    /// Split into SQL text and arguments
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

/// Accumulator shared by one render pass
#[derive(Default)]
struct Output {
    sql: String,
    args: Vec<Value>,
}

impl Output {
    /// Append literal text without doubling whitespace at the seam
    fn push_literal(&mut self, text: &str) {
        let text = match self.sql.chars().next_back() {
            Some(c) if !c.is_whitespace() => text,
            _ => text.trim_start(),
        };
        self.sql.push_str(text);
    }

    /// Append `text`, separating it from preceding text with one space
    fn push_separated(&mut self, text: &str) {
        let last = self.sql.chars().next_back();
        if last.is_some_and(|c| !c.is_whitespace()) {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
    }
}

/// Renders statements from a registry
#[derive(Clone, Copy)]
pub struct Renderer<'a> {
    registry: &'a StatementRegistry,
    config: &'a RenderConfig,
}

impl<'a> Renderer<'a> {
    /// Create a renderer over a registry
    pub fn new(registry: &'a StatementRegistry, config: &'a RenderConfig) -> Self {
        Self { registry, config }
    }

    /// Look up a statement by qualified name and render it
    pub fn render(&self, name: &str, env: &dyn Parameter) -> Result<RenderResult> {
        let statement = self.registry.lookup(name)?;
        self.render_statement(statement, env)
    }

    /// Render a statement
    pub fn render_statement(
        &self,
        statement: &Statement,
        env: &dyn Parameter,
    ) -> Result<RenderResult> {
        let result = self.render_node(statement.body(), env)?;
        log::trace!(
            "rendered {} with {} args",
            statement.name(),
            result.args.len()
        );
        Ok(result)
    }

    /// Render any node as a complete statement
    ///
    /// Fails with [`Error::EmptyQuery`] if no text remains.
    pub fn render_node(&self, node: &Node, env: &dyn Parameter) -> Result<RenderResult> {
        let mut out = Output::default();
        self.visit(node, env, &mut out, 0)?;

        let sql = out.sql.trim();
        if sql.is_empty() {
            return Err(Error::EmptyQuery);
        }

        Ok(RenderResult {
            sql: sql.to_string(),
            args: out.args,
        })
    }

    fn visit(
        &self,
        node: &Node,
        env: &dyn Parameter,
        out: &mut Output,
        depth: usize,
    ) -> Result<()> {
        match node {
            Node::Literal(text) => {
                out.push_literal(text);
                Ok(())
            }
            Node::Parameter(path) => {
                let value = path
                    .resolve(env)
                    .ok_or_else(|| Error::ParameterNotFound(path.to_string()))?;
                out.args.push(value);
                let placeholder = self.config.placeholder;
                placeholder.write_to(&mut out.sql, out.args.len());
                Ok(())
            }
            Node::Substitution(path) => {
                let value = path
                    .resolve(env)
                    .ok_or_else(|| Error::ParameterNotFound(path.to_string()))?;
                out.sql.push_str(&value.to_string());
                Ok(())
            }
            Node::Conditional(cond) => {
                if cond.test.is_satisfied(env)? {
                    self.visit_all(&cond.children, env, out, depth)?;
                }
                Ok(())
            }
            Node::Choose(choose) => self.visit_choose(choose, env, out, depth),
            Node::Loop(l) => self.visit_loop(l, env, out, depth),
            Node::Include(include) => self.visit_include(include, env, out, depth),
            Node::Trim(t) => {
                let start = out.sql.len();
                self.visit_all(&t.children, env, out, depth)?;
                let content = out.sql.split_off(start);
                if let Some(trimmed) = trim::apply(t, &content) {
                    // an unprefixed trim stays attached to an opening bracket
                    if t.prefix.is_empty() && out.sql.ends_with('(') {
                        out.sql.push_str(&trimmed);
                    } else {
                        out.push_separated(&trimmed);
                    }
                }
                Ok(())
            }
            Node::Root(children) => self.visit_all(children, env, out, depth),
        }
    }

    fn visit_all(
        &self,
        nodes: &[Node],
        env: &dyn Parameter,
        out: &mut Output,
        depth: usize,
    ) -> Result<()> {
        for node in nodes {
            self.visit(node, env, out, depth)?;
        }
        Ok(())
    }

    fn visit_choose(
        &self,
        choose: &Choose,
        env: &dyn Parameter,
        out: &mut Output,
        depth: usize,
    ) -> Result<()> {
        for when in &choose.whens {
            if when.test.is_satisfied(env)? {
                return self.visit_all(&when.children, env, out, depth);
            }
        }
        match &choose.otherwise {
            Some(children) => self.visit_all(children, env, out, depth),
            None => Ok(()),
        }
    }

    /// Render a loop body once per element
    ///
    /// Lists bind the position as the index, maps bind the key. An absent
    /// collection renders nothing. Iterations that render only whitespace
    /// are dropped so they do not leave stray separators.
    fn visit_loop(
        &self,
        l: &Loop,
        env: &dyn Parameter,
        out: &mut Output,
        depth: usize,
    ) -> Result<()> {
        let entries: Vec<(Value, Value)> = match l.collection.evaluate(env)? {
            Value::Null => return Ok(()),
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Value::integer(i as i64), item.clone()))
                .collect(),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, value)| (Value::text(key), value.clone()))
                .collect(),
            other => {
                return Err(Error::NotIterable {
                    type_name: other.type_name(),
                });
            }
        };

        let mut first = true;
        for (index, item) in entries {
            let mut scope = Scope::new(env);
            scope.bind(&l.index, index);
            scope.bind(&l.item, item);

            let start = out.sql.len();
            self.visit_all(&l.children, &scope, out, depth)?;
            let piece = out.sql.split_off(start);
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            let lead = if first { &l.open } else { &l.separator };
            out.sql.push_str(lead);
            out.sql.push_str(piece);
            first = false;
        }

        if !first {
            out.sql.push_str(&l.close);
        }
        Ok(())
    }

    fn visit_include(
        &self,
        include: &Include,
        env: &dyn Parameter,
        out: &mut Output,
        depth: usize,
    ) -> Result<()> {
        if depth >= self.config.max_include_depth {
            return Err(Error::IncludeDepthExceeded {
                refid: include.refid.clone(),
                limit: self.config.max_include_depth,
            });
        }

        let target = include
            .candidates()
            .find_map(|name| self.registry.lookup(&name).ok())
            .ok_or_else(|| Error::SqlNodeNotFound(include.refid.clone()))?;

        self.visit(target.body(), env, out, depth + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Placeholder;
    use std::collections::HashMap;

    fn registry(xml: &str) -> StatementRegistry {
        let mut registry = StatementRegistry::new();
        registry.load_str(xml).unwrap();
        registry
    }

    fn mapper(body: &str) -> StatementRegistry {
        registry(&format!(r#"<mapper namespace="t">{}</mapper>"#, body))
    }

    #[test]
    fn test_where_with_and_without_condition() {
        let reg = mapper(
            r#"<select id="find">SELECT * FROM users <where><if test="id != null">AND id = #{id}</if></where></select>"#,
        );
        let config = RenderConfig::default();
        let renderer = Renderer::new(&reg, &config);

        let mut env = HashMap::new();
        env.insert("id", Value::integer(5));
        let result = renderer.render("t.find", &env).unwrap();
        assert_eq!(result.sql, "SELECT * FROM users WHERE id = ?");
        assert_eq!(result.args, vec![Value::integer(5)]);

        let result = renderer.render("t.find", &()).unwrap();
        assert_eq!(result.sql, "SELECT * FROM users");
        assert!(result.args.is_empty());
    }

    #[test]
    fn test_foreach_separator() {
        let reg = mapper(
            r#"<sql id="list"><foreach collection="ids" item="i" separator=",">#{i}</foreach></sql>"#,
        );
        let config = RenderConfig::default();
        let env = Value::map([("ids", Value::list([1i64, 2, 3]))]);
        let result = Renderer::new(&reg, &config).render("t.list", &env).unwrap();
        assert_eq!(result.sql, "?,?,?");
        assert_eq!(
            result.args,
            vec![Value::integer(1), Value::integer(2), Value::integer(3)]
        );
    }

    #[test]
    fn test_foreach_open_close_and_index() {
        let reg = mapper(
            r#"<select id="q">SELECT * FROM t WHERE id IN <foreach collection="ids" item="id" index="i" open="(" close=")" separator=", ">#{id}</foreach></select>
               <select id="m">UPDATE t SET <foreach collection="fields" item="v" index="k" separator=", ">${k} = #{v}</foreach></select>"#,
        );
        let config = RenderConfig::default().with_placeholder(Placeholder::Dollar);
        let renderer = Renderer::new(&reg, &config);

        let env = Value::map([("ids", Value::list([7i64, 8]))]);
        let result = renderer.render("t.q", &env).unwrap();
        assert_eq!(result.sql, "SELECT * FROM t WHERE id IN ($1, $2)");

        let env = Value::map([(
            "fields",
            Value::map([("age", Value::integer(3)), ("name", Value::text("x"))]),
        )]);
        let result = renderer.render("t.m", &env).unwrap();
        assert_eq!(result.sql, "UPDATE t SET age = $1, name = $2");
        assert_eq!(result.args, vec![Value::integer(3), Value::text("x")]);
    }

    #[test]
    fn test_foreach_empty_and_absent() {
        let reg = mapper(
            r#"<select id="q">SELECT 1 <foreach collection="ids" open="(" close=")">#{item}</foreach></select>"#,
        );
        let config = RenderConfig::default();
        let renderer = Renderer::new(&reg, &config);

        let env = Value::map([("ids", Value::list(Vec::<i64>::new()))]);
        assert_eq!(renderer.render("t.q", &env).unwrap().sql, "SELECT 1");
        assert_eq!(renderer.render("t.q", &()).unwrap().sql, "SELECT 1");

        let env = Value::map([("ids", 5i64)]);
        assert_eq!(
            renderer.render("t.q", &env).unwrap_err(),
            Error::NotIterable {
                type_name: "integer",
            }
        );
    }

    #[test]
    fn test_choose() {
        let reg = mapper(
            r#"<select id="q">SELECT * FROM t ORDER BY <choose><when test="sort == 'name'">name</when><when test="sort == 'age'">age</when><otherwise>id</otherwise></choose></select>"#,
        );
        let config = RenderConfig::default();
        let renderer = Renderer::new(&reg, &config);

        let env = Value::map([("sort", "age")]);
        assert_eq!(
            renderer.render("t.q", &env).unwrap().sql,
            "SELECT * FROM t ORDER BY age"
        );
        assert_eq!(
            renderer.render("t.q", &()).unwrap().sql,
            "SELECT * FROM t ORDER BY id"
        );
    }

    #[test]
    fn test_set_clause() {
        let reg = mapper(
            r#"<update id="u">UPDATE users <set><if test="name != null">name = #{name},</if><if test="age != null">age = #{age},</if></set> WHERE id = #{id}</update>"#,
        );
        let config = RenderConfig::default();
        let env = Value::map([("name", Value::text("bob")), ("id", Value::integer(1))]);
        let result = Renderer::new(&reg, &config).render("t.u", &env).unwrap();
        assert_eq!(result.sql, "UPDATE users SET name = ? WHERE id = ?");
        assert_eq!(result.args, vec![Value::text("bob"), Value::integer(1)]);
    }

    #[test]
    fn test_unprefixed_trim_after_bracket() {
        let reg = mapper(
            r#"<insert id="i">INSERT INTO t VALUES(<trim suffixOverrides=","><if test="a != null">#{a},</if><if test="b != null">#{b},</if></trim>)</insert>
               <select id="s">SELECT id<trim prefixOverrides=","><if test="b != null">, b</if></trim> FROM t</select>"#,
        );
        let config = RenderConfig::default();
        let renderer = Renderer::new(&reg, &config);

        let env = Value::map([("a", 1i64), ("b", 2i64)]);
        let result = renderer.render("t.i", &env).unwrap();
        assert_eq!(result.sql, "INSERT INTO t VALUES(?,?)");
        assert_eq!(result.args, vec![Value::integer(1), Value::integer(2)]);

        // other seams keep their separating space
        assert_eq!(
            renderer.render("t.s", &env).unwrap().sql,
            "SELECT id b FROM t"
        );
    }

    #[test]
    fn test_include_and_missing_include() {
        let reg = mapper(
            r#"<sql id="cols">id, name</sql>
               <select id="q">SELECT <include refid="cols"/> FROM t</select>
               <select id="bad">SELECT <include refid="missing"/> FROM t</select>"#,
        );
        let config = RenderConfig::default();
        let renderer = Renderer::new(&reg, &config);
        assert_eq!(
            renderer.render("t.q", &()).unwrap().sql,
            "SELECT id, name FROM t"
        );
        assert_eq!(
            renderer.render("t.bad", &()).unwrap_err(),
            Error::SqlNodeNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_include_cycle_hits_depth_limit() {
        let reg = mapper(
            r#"<sql id="a">x <include refid="b"/></sql><sql id="b">y <include refid="a"/></sql>"#,
        );
        let config = RenderConfig::default().with_max_include_depth(4);
        let err = Renderer::new(&reg, &config).render("t.a", &()).unwrap_err();
        assert!(matches!(err, Error::IncludeDepthExceeded { limit: 4, .. }));
    }

    #[test]
    fn test_empty_query() {
        let reg = mapper(r#"<select id="q"><if test="false">SELECT 1</if></select>"#);
        let config = RenderConfig::default();
        assert_eq!(
            Renderer::new(&reg, &config).render("t.q", &()).unwrap_err(),
            Error::EmptyQuery
        );
    }

    #[test]
    fn test_missing_bind_parameter() {
        let reg = mapper(
            r#"<select id="q">SELECT * FROM t WHERE id = #{id}</select>"#,
        );
        let config = RenderConfig::default();
        assert_eq!(
            Renderer::new(&reg, &config).render("t.q", &()).unwrap_err(),
            Error::ParameterNotFound("id".to_string())
        );
    }

    #[test]
    fn test_scalar_parameter() {
        let reg = mapper(
            r#"<select id="q">SELECT * FROM t WHERE id = #{param}</select>"#,
        );
        let config = RenderConfig::default();
        let result = Renderer::new(&reg, &config)
            .render("t.q", &Value::integer(9))
            .unwrap();
        assert_eq!(result.args, vec![Value::integer(9)]);
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let reg = mapper(
            r#"<select id="q">SELECT 1 <if test="n / 0 > 1">x</if></select>"#,
        );
        let config = RenderConfig::default();
        let env = Value::map([("n", 4i64)]);
        let renderer = Renderer::new(&reg, &config);
        assert_eq!(
            renderer.render("t.q", &env).unwrap_err(),
            Error::DivisionByZero
        );
    }
}
