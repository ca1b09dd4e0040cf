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

//! Mapper document builder
//!
//! Reads a mapper document with quick-xml and keeps its own stack of open
//! elements. The XML reader's end-name checking is disabled so that a
//! missing close tag is reported as [`Error::NodeUnclosed`] naming the
//! innermost open element, rather than as a generic XML error.
//!
//! Attribute rules come from [`schema_for`]. Expression-valued attributes
//! are parsed as soon as the start tag is read.

use std::time::Duration;

use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::schema::{schema_for, Attributes, NodeSchema};
use super::text::parse_text;
use super::{Choose, Conditional, Include, Loop, Node, Trim};
use crate::core::{Error, Result};
use crate::expr::{self, Expr};
use crate::registry::{Statement, StatementKind, StatementName};

/// Default binding name for foreach elements
pub const DEFAULT_ITEM: &str = "item";
/// Default binding name for foreach positions or keys
pub const DEFAULT_INDEX: &str = "index";
/// Maximum depth of open elements in one document
pub const MAX_ELEMENT_DEPTH: usize = 64;

/// Output of building one mapper document
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Namespaces declared by the document, in order
    pub namespaces: Vec<String>,
    /// Every statement and fragment, in document order
    pub statements: Vec<Statement>,
}

/// Build a mapper document
pub fn build_document(xml: &str) -> Result<Document> {
    NodeBuilder::new().build(xml)
}

/// An element that has been opened but not yet closed
struct Frame {
    element: String,
    kind: FrameKind,
    children: Vec<Node>,
}

enum FrameKind {
    Mappers,
    Mapper {
        namespace: String,
    },
    Statement {
        kind: StatementKind,
        id: String,
        result_map: Option<String>,
        result_type: Option<String>,
        timeout: Option<Duration>,
    },
    If {
        test: Expr,
    },
    Choose(Choose),
    When {
        test: Expr,
    },
    Otherwise,
    Foreach {
        collection: Expr,
        item: String,
        index: String,
        open: String,
        close: String,
        separator: String,
    },
    Trim {
        prefix: String,
        suffix: String,
        prefix_overrides: Vec<String>,
        suffix_overrides: Vec<String>,
    },
    Where,
    Set,
    Include(Include),
}

impl FrameKind {
    /// Returns true if text and dynamic elements may appear inside
    fn accepts_content(&self) -> bool {
        matches!(
            self,
            FrameKind::Statement { .. }
                | FrameKind::If { .. }
                | FrameKind::When { .. }
                | FrameKind::Otherwise
                | FrameKind::Foreach { .. }
                | FrameKind::Trim { .. }
                | FrameKind::Where
                | FrameKind::Set
        )
    }
}

/// Stack-based builder for mapper documents
pub struct NodeBuilder {
    stack: Vec<Frame>,
    document: Document,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBuilder {
    /// Create a builder with an empty stack
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            document: Document::default(),
        }
    }

    /// Build every statement in the document
    pub fn build(mut self, xml: &str) -> Result<Document> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = false;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => return Err(self.xml_error(err)),
            };

            match event {
                Event::Start(e) => {
                    let (name, attrs) = read_start(&e)?;
                    self.open(name, attrs)?;
                }
                Event::Empty(e) => {
                    let (name, attrs) = read_start(&e)?;
                    self.open(name.clone(), attrs)?;
                    self.close(&name)?;
                }
                Event::End(e) => {
                    let name = decode_name(e.name().as_ref())?;
                    self.close(&name)?;
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    self.text(&text)?;
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(&e).map_err(quick_xml::Error::from)?;
                    self.text(text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctypes
                _ => {}
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(Error::unclosed(&frame.element));
        }
        if self.document.namespaces.is_empty() {
            return Err(Error::InvalidDocument(
                "document has no mapper element".to_string(),
            ));
        }

        Ok(self.document)
    }

    fn xml_error(&self, err: quick_xml::Error) -> Error {
        if let quick_xml::Error::IllFormed(
            IllFormedError::MissingEndTag(_) | IllFormedError::MismatchedEndTag { .. },
        ) = &err
        {
            if let Some(frame) = self.stack.last() {
                return Error::unclosed(&frame.element);
            }
        }
        Error::from(err)
    }

    fn current_namespace(&self) -> &str {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| match &frame.kind {
                FrameKind::Mapper { namespace } => Some(namespace.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn top_accepts_content(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|frame| frame.kind.accepts_content())
    }

    fn misplaced(&self, element: &str) -> Error {
        let parent = self
            .stack
            .last()
            .map(|frame| frame.element.as_str())
            .unwrap_or("document root");
        Error::InvalidDocument(format!("<{}> is not allowed inside {}", element, parent))
    }

    /// Handle a start tag
    fn open(&mut self, element: String, attrs: Attributes) -> Result<()> {
        if self.stack.len() >= MAX_ELEMENT_DEPTH {
            return Err(Error::InvalidDocument(format!(
                "<{}> is nested deeper than {} elements",
                element, MAX_ELEMENT_DEPTH
            )));
        }

        let schema = schema_for(&element)
            .ok_or_else(|| Error::UnknownNode(element.clone()))?;
        schema.validate(&attrs)?;

        let kind = match element.as_str() {
            "mappers" => {
                if !self.stack.is_empty() {
                    return Err(self.misplaced(&element));
                }
                FrameKind::Mappers
            }
            "mapper" => {
                let at_root = match self.stack.last() {
                    None => true,
                    Some(frame) => matches!(frame.kind, FrameKind::Mappers),
                };
                if !at_root {
                    return Err(self.misplaced(&element));
                }
                FrameKind::Mapper {
                    namespace: required(&attrs, "namespace"),
                }
            }
            "select" | "insert" | "update" | "delete" | "sql" => {
                if !matches!(
                    self.stack.last().map(|f| &f.kind),
                    Some(FrameKind::Mapper { .. })
                ) {
                    return Err(self.misplaced(&element));
                }
                self.statement_frame(&element, &attrs)?
            }
            "when" | "otherwise" => {
                let Some(Frame {
                    kind: FrameKind::Choose(choose),
                    ..
                }) = self.stack.last()
                else {
                    return Err(self.misplaced(&element));
                };
                if element == "otherwise" {
                    if choose.otherwise.is_some() {
                        return Err(Error::attribute_conflict("choose", "otherwise"));
                    }
                    FrameKind::Otherwise
                } else {
                    FrameKind::When {
                        test: parse_expression(schema, &attrs, "test")?,
                    }
                }
            }
            _ => {
                if !self.top_accepts_content() {
                    return Err(self.misplaced(&element));
                }
                self.dynamic_frame(&element, schema, &attrs)?
            }
        };

        self.stack.push(Frame {
            element,
            kind,
            children: Vec::new(),
        });
        Ok(())
    }

    fn statement_frame(&self, element: &str, attrs: &Attributes) -> Result<FrameKind> {
        let kind = StatementKind::from_element(element)
            .ok_or_else(|| Error::UnknownNode(element.to_string()))?;
        let id = required(attrs, "id");

        let timeout = match attrs.get("timeout") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    Error::InvalidDocument(format!("{} {}: invalid timeout {:?}", element, id, raw))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(FrameKind::Statement {
            kind,
            id,
            result_map: attrs.get("resultMap").cloned(),
            result_type: attrs.get("resultType").cloned(),
            timeout,
        })
    }

    fn dynamic_frame(
        &self,
        element: &str,
        schema: &NodeSchema,
        attrs: &Attributes,
    ) -> Result<FrameKind> {
        Ok(match element {
            "if" => FrameKind::If {
                test: parse_expression(schema, attrs, "test")?,
            },
            "choose" => FrameKind::Choose(Choose::default()),
            "foreach" => {
                let item = optional(attrs, "item").unwrap_or_else(|| DEFAULT_ITEM.to_string());
                let index = optional(attrs, "index").unwrap_or_else(|| DEFAULT_INDEX.to_string());
                if item == index {
                    return Err(Error::attribute_conflict(element, "index"));
                }
                FrameKind::Foreach {
                    collection: parse_expression(schema, attrs, "collection")?,
                    item,
                    index,
                    open: attrs.get("open").cloned().unwrap_or_default(),
                    close: attrs.get("close").cloned().unwrap_or_default(),
                    separator: attrs.get("separator").cloned().unwrap_or_default(),
                }
            }
            "trim" => FrameKind::Trim {
                prefix: attrs.get("prefix").cloned().unwrap_or_default(),
                suffix: attrs.get("suffix").cloned().unwrap_or_default(),
                prefix_overrides: attrs
                    .get("prefixOverrides")
                    .map(|raw| Trim::split_overrides(raw))
                    .unwrap_or_default(),
                suffix_overrides: attrs
                    .get("suffixOverrides")
                    .map(|raw| Trim::split_overrides(raw))
                    .unwrap_or_default(),
            },
            "where" => FrameKind::Where,
            "set" => FrameKind::Set,
            "include" => FrameKind::Include(Include {
                refid: required(attrs, "refid"),
                namespace: self.current_namespace().to_string(),
            }),
            other => return Err(self.misplaced(other)),
        })
    }

    /// Handle an end tag
    fn close(&mut self, element: &str) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(Error::InvalidDocument(format!(
                "unexpected closing tag </{}>",
                element
            )));
        };
        if frame.element != element {
            return Err(Error::unclosed(frame.element));
        }

        let Frame { kind, children, .. } = frame;
        match kind {
            FrameKind::Mappers => Ok(()),
            FrameKind::Mapper { namespace } => {
                log::trace!("built mapper {}", namespace);
                self.document.namespaces.push(namespace);
                Ok(())
            }
            FrameKind::Statement {
                kind,
                id,
                result_map,
                result_type,
                timeout,
            } => {
                let name = StatementName::new(self.current_namespace(), id);
                log::trace!("built {} {}", kind, name);
                let mut statement = Statement::new(name, kind, children);
                statement.result_map = result_map;
                statement.result_type = result_type;
                statement.timeout = timeout;
                self.document.statements.push(statement);
                Ok(())
            }
            FrameKind::If { test } => {
                self.append(Node::Conditional(Conditional { test, children }))
            }
            FrameKind::Choose(choose) => self.append(Node::Choose(choose)),
            FrameKind::When { test } => {
                self.with_parent_choose(|choose| choose.whens.push(Conditional { test, children }))
            }
            FrameKind::Otherwise => {
                self.with_parent_choose(|choose| choose.otherwise = Some(children))
            }
            FrameKind::Foreach {
                collection,
                item,
                index,
                open,
                close,
                separator,
            } => self.append(Node::Loop(Loop {
                collection,
                item,
                index,
                open,
                close,
                separator,
                children,
            })),
            FrameKind::Trim {
                prefix,
                suffix,
                prefix_overrides,
                suffix_overrides,
            } => self.append(Node::Trim(Trim {
                element: "trim",
                prefix,
                suffix,
                prefix_overrides,
                suffix_overrides,
                children,
            })),
            FrameKind::Where => self.append(Node::Trim(Trim::where_clause(children))),
            FrameKind::Set => self.append(Node::Trim(Trim::set_clause(children))),
            FrameKind::Include(include) => {
                if !children.is_empty() {
                    return Err(Error::InvalidDocument(format!(
                        "<include refid=\"{}\"> must be empty",
                        include.refid
                    )));
                }
                self.append(Node::Include(include))
            }
        }
    }

    /// Handle character data
    fn text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) if frame.kind.accepts_content() => {
                frame.children.extend(parse_text(text)?);
                Ok(())
            }
            _ if text.trim().is_empty() => Ok(()),
            // Reported when the include closes
            Some(frame) if matches!(frame.kind, FrameKind::Include(_)) => {
                frame.children.push(Node::Literal(text.to_string()));
                Ok(())
            }
            Some(frame) => Err(Error::InvalidDocument(format!(
                "text is not allowed inside {}",
                frame.element
            ))),
            None => Err(Error::InvalidDocument(
                "text is not allowed outside the mapper element".to_string(),
            )),
        }
    }

    fn append(&mut self, node: Node) -> Result<()> {
        match self.stack.last_mut() {
            Some(frame) if frame.kind.accepts_content() => {
                frame.children.push(node);
                Ok(())
            }
            _ => Err(self.misplaced(node.name())),
        }
    }

    fn with_parent_choose(&mut self, f: impl FnOnce(&mut Choose)) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame {
                kind: FrameKind::Choose(choose),
                ..
            }) => {
                f(choose);
                Ok(())
            }
            _ => Err(self.misplaced("when")),
        }
    }
}

fn decode_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|err| Error::from(quick_xml::Error::from(err)))
}

fn read_start(e: &BytesStart<'_>) -> Result<(String, Attributes)> {
    let name = decode_name(e.name().as_ref())?;
    let mut attrs = Attributes::default();
    for attr in e.attributes() {
        let attr = attr?;
        let key = decode_name(attr.key.as_ref())?;
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok((name, attrs))
}

/// Value of an attribute the schema already checked for
fn required(attrs: &Attributes, attr: &str) -> String {
    attrs
        .get(attr)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn optional(attrs: &Attributes, attr: &str) -> Option<String> {
    attrs
        .get(attr)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_expression(schema: &NodeSchema, attrs: &Attributes, attr: &str) -> Result<Expr> {
    debug_assert!(schema.is_expression(attr));
    let source = attrs.get(attr).map(String::as_str).unwrap_or_default();
    expr::parse(source).map_err(|e| Error::Syntax(e.in_node(schema.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(r#"<mapper namespace="users">{}</mapper>"#, body)
    }

    fn build_one(body: &str) -> Statement {
        let doc = build_document(&wrap(body)).unwrap();
        assert_eq!(doc.statements.len(), 1);
        doc.statements.into_iter().next().unwrap()
    }

    #[test]
    fn test_simple_statement() {
        let stmt = build_one(r#"<select id="all">SELECT * FROM users</select>"#);
        assert_eq!(stmt.name().to_string(), "users.all");
        assert_eq!(stmt.kind(), StatementKind::Select);
        assert_eq!(
            stmt.body(),
            &Node::Root(vec![Node::Literal("SELECT * FROM users".to_string())])
        );
    }

    #[test]
    fn test_nested_structure() {
        let stmt = build_one(
            r#"<select id="find">SELECT * FROM users <where><if test="id != null">AND id = #{id}</if></where></select>"#,
        );
        let children = stmt.body().children();
        assert_eq!(children.len(), 2);
        let Node::Trim(trim) = &children[1] else {
            panic!("expected where, got {:?}", children[1]);
        };
        assert_eq!(trim.element, "where");
        let Node::Conditional(cond) = &trim.children[0] else {
            panic!("expected if");
        };
        assert_eq!(cond.test.to_string(), "(id != null)");
        assert_eq!(cond.children.len(), 2);
    }

    #[test]
    fn test_unclosed_at_end_of_document() {
        let err = build_document(
            r#"<mapper namespace="users"><select id="a">SELECT <if test="x">a"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::unclosed("if"));
    }

    #[test]
    fn test_unclosed_before_parent_close() {
        let err = build_document(&wrap(r#"<select id="a">SELECT <if test="x">a</select>"#))
            .unwrap_err();
        assert_eq!(err, Error::unclosed("if"));
    }

    #[test]
    fn test_required_attributes() {
        let err = build_document(&wrap(r#"<select id="a"><if>x</if></select>"#)).unwrap_err();
        assert_eq!(err, Error::attribute_required("if", "test"));

        let err = build_document(&wrap(
            r#"<select id="a"><foreach item="i">#{i}</foreach></select>"#,
        ))
        .unwrap_err();
        assert_eq!(err, Error::attribute_required("foreach", "collection"));

        let err = build_document(&wrap(r#"<select>x</select>"#)).unwrap_err();
        assert_eq!(err, Error::attribute_required("select", "id"));

        let err = build_document(r#"<mapper><select id="a">x</select></mapper>"#).unwrap_err();
        assert_eq!(err, Error::attribute_required("mapper", "namespace"));
    }

    #[test]
    fn test_conflicting_attributes() {
        let err = build_document(&wrap(
            r#"<select id="a" resultMap="User" resultType="User">x</select>"#,
        ))
        .unwrap_err();
        assert_eq!(err, Error::attribute_conflict("select", "resultType"));

        let err = build_document(&wrap(
            r#"<select id="a"><foreach collection="ids" item="i" index="i">#{i}</foreach></select>"#,
        ))
        .unwrap_err();
        assert_eq!(err, Error::attribute_conflict("foreach", "index"));

        let err = build_document(&wrap(
            r#"<select id="a"><choose><otherwise>a</otherwise><otherwise>b</otherwise></choose></select>"#,
        ))
        .unwrap_err();
        assert_eq!(err, Error::attribute_conflict("choose", "otherwise"));
    }

    #[test]
    fn test_syntax_error_names_node() {
        let err = build_document(&wrap(
            r#"<select id="a"><if test="age &gt;">x</if></select>"#,
        ))
        .unwrap_err();
        match err {
            Error::Syntax(e) => {
                assert_eq!(e.node(), Some("if"));
                assert_eq!(e.expression(), "age >");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_choose_branches() {
        let stmt = build_one(
            r#"<select id="a">SELECT 1 <choose><when test="a">A</when><when test="b">B</when><otherwise>C</otherwise></choose></select>"#,
        );
        let Node::Choose(choose) = &stmt.body().children()[1] else {
            panic!("expected choose");
        };
        assert_eq!(choose.whens.len(), 2);
        assert_eq!(choose.otherwise, Some(vec![Node::Literal("C".to_string())]));
    }

    #[test]
    fn test_foreach_defaults() {
        let stmt = build_one(
            r#"<select id="a">IN <foreach collection="ids" open="(" close=")" separator=",">#{item}</foreach></select>"#,
        );
        let Node::Loop(l) = &stmt.body().children()[1] else {
            panic!("expected foreach");
        };
        assert_eq!(l.item, DEFAULT_ITEM);
        assert_eq!(l.index, DEFAULT_INDEX);
        assert_eq!(l.open, "(");
        assert_eq!(l.close, ")");
        assert_eq!(l.separator, ",");
    }

    #[test]
    fn test_include_records_namespace() {
        let stmt = build_one(
            r#"<select id="a">SELECT <include refid="columns"/> FROM t</select>"#,
        );
        assert_eq!(
            stmt.body().children()[1],
            Node::Include(Include {
                refid: "columns".to_string(),
                namespace: "users".to_string(),
            })
        );
    }

    #[test]
    fn test_statement_metadata() {
        let stmt = build_one(
            r#"<select id="a" resultMap="User" timeout="5">SELECT 1</select>"#,
        );
        assert_eq!(stmt.result_map(), Some("User"));
        assert_eq!(stmt.result_type(), None);
        assert_eq!(stmt.timeout(), Some(Duration::from_secs(5)));

        let err = build_document(&wrap(r#"<select id="a" timeout="soon">x</select>"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn test_unknown_and_misplaced_elements() {
        let err = build_document(&wrap(r#"<select id="a"><bogus/></select>"#)).unwrap_err();
        assert_eq!(err, Error::UnknownNode("bogus".to_string()));

        let err = build_document(&wrap(r#"<select id="a"><when test="x">a</when></select>"#))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));

        let err = build_document(r#"<select id="a">x</select>"#).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn test_multiple_mappers_and_cdata() {
        let doc = build_document(
            r#"<?xml version="1.0"?>
            <!-- two namespaces -->
            <mappers>
              <mapper namespace="a"><sql id="cols">id</sql></mapper>
              <mapper namespace="b"><select id="q"><![CDATA[SELECT * FROM t WHERE x < #{x}]]></select></mapper>
            </mappers>"#,
        )
        .unwrap();
        assert_eq!(doc.namespaces, vec!["a", "b"]);
        let names: Vec<_> = doc
            .statements
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.cols", "b.q"]);
        assert_eq!(doc.statements[1].body().static_parameter_count(), 1);
    }

    #[test]
    fn test_element_depth_limit() {
        let select = |depth: usize| {
            let open = r#"<if test="a">"#.repeat(depth);
            let close = "</if>".repeat(depth);
            wrap(&format!(r#"<select id="a">{}x{}</select>"#, open, close))
        };

        // mapper and select take two levels
        let doc = build_document(&select(MAX_ELEMENT_DEPTH - 2)).unwrap();
        assert_eq!(doc.statements.len(), 1);

        let err = build_document(&select(MAX_ELEMENT_DEPTH - 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)), "{:?}", err);

        let err = build_document(&select(5000)).unwrap_err();
        assert!(err.to_string().contains("nested deeper than 64"), "{}", err);
    }

    #[test]
    fn test_escaped_text() {
        let stmt = build_one(
            r#"<select id="a">SELECT * FROM t WHERE a &lt; #{a}</select>"#,
        );
        assert_eq!(
            stmt.body().children()[0],
            Node::Literal("SELECT * FROM t WHERE a < ".to_string())
        );
    }
}
