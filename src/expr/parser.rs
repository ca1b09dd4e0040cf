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

//! Test-expression parser using the Pratt parsing algorithm

use super::ast::{BinaryOp, Expr, Path, UnaryOp};
use super::error::ParseError;
use super::lexer::Lexer;
use super::precedence::Precedence;
use super::token::{Token, TokenType};
use crate::core::Value;

/// Maximum nesting of groups and prefix operators in one expression
pub const MAX_NESTING_DEPTH: usize = 256;

/// Expression parser
///
/// Parsing is single pass. The first error stops the parse; it is kept in
/// `errors` and returned from [`Parser::parse`].
pub struct Parser {
    /// The lexer providing tokens
    lexer: Lexer,
    /// Current token being examined
    pub(crate) cur_token: Token,
    /// Next token (peek)
    pub(crate) peek_token: Token,
    /// Collected errors
    errors: Vec<ParseError>,
    /// Current nesting of `parse_expression` calls
    depth: usize,
}

impl Parser {
    /// Create a new parser for the given input
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let cur_token = lexer.next_token();
        let peek_token = lexer.next_token();

        Parser {
            lexer,
            cur_token,
            peek_token,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Parse the whole input as a single expression
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.cur_token.is_eof() {
            return Err(ParseError::new("empty expression", self.cur_token.position));
        }

        let expr = self.parse_expression(Precedence::Lowest);

        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        match expr {
            Some(expr) if self.peek_token.is_eof() => Ok(expr),
            Some(_) => Err(ParseError::new(
                format!("unexpected token {}", self.peek_token),
                self.peek_token.position,
            )),
            None => Err(ParseError::new(
                "could not parse expression",
                self.cur_token.position,
            )),
        }
    }

    /// Advance to the next token
    pub(crate) fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    /// Check if the peek token is of the given type
    pub(crate) fn peek_token_is(&self, t: TokenType) -> bool {
        self.peek_token.token_type == t
    }

    /// Record an error at the given token
    fn add_error_at(&mut self, message: impl Into<String>, token: &Token) {
        // Only the first error is reported
        if self.errors.is_empty() {
            let message = match &token.error {
                Some(lex_error) => lex_error.clone(),
                None => message.into(),
            };
            self.errors.push(ParseError::new(message, token.position));
        }
    }

    /// Record an error at the current token
    fn add_error(&mut self, message: impl Into<String>) {
        let token = self.cur_token.clone();
        self.add_error_at(message, &token);
    }

    /// Get the precedence of the peek token
    fn peek_precedence(&self) -> Precedence {
        match self.peek_token.token_type {
            TokenType::Operator | TokenType::Keyword | TokenType::Punctuator => {
                Precedence::for_operator(&self.peek_token.literal)
            }
            _ => Precedence::Lowest,
        }
    }

    /// Check if the peek token can continue an expression as an infix operator
    fn is_infix_token(&self) -> bool {
        match self.peek_token.token_type {
            TokenType::Operator => BinaryOp::from_literal(&self.peek_token.literal).is_some(),
            TokenType::Keyword => matches!(
                self.peek_token.literal.as_str(),
                "and" | "or" | "in" | "not"
            ),
            TokenType::Punctuator => self.peek_token.literal == ".",
            _ => false,
        }
    }

    /// Parse an expression with the given precedence
    ///
    /// Fails once nesting exceeds [`MAX_NESTING_DEPTH`].
    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.add_error("expression nested too deeply");
            return None;
        }

        self.depth += 1;
        let expr = self.parse_expression_inner(precedence);
        self.depth -= 1;
        expr
    }

    fn parse_expression_inner(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix_expression()?;

        while !self.peek_token_is(TokenType::Eof) && precedence < self.peek_precedence() {
            if !self.is_infix_token() {
                return Some(left);
            }

            self.next_token();
            left = self.parse_infix_expression(left)?;
        }

        if self.peek_token.is_error() {
            let token = self.peek_token.clone();
            self.add_error_at("invalid token", &token);
            return None;
        }

        Some(left)
    }

    /// Parse a prefix expression (literals, paths, unary operators, groups)
    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        match self.cur_token.token_type {
            TokenType::Identifier => Some(Expr::Path(Path::new(self.cur_token.literal.clone()))),
            TokenType::Integer => self.parse_integer_literal(),
            TokenType::Float => self.parse_float_literal(),
            TokenType::String => Some(Expr::Literal(Value::text(&self.cur_token.literal))),
            TokenType::Keyword => self.parse_keyword_expression(),
            TokenType::Operator => self.parse_unary_expression(),
            TokenType::Punctuator if self.cur_token.literal == "(" => {
                self.parse_grouped_expression()
            }
            TokenType::Eof => {
                self.add_error("unexpected end of expression");
                None
            }
            _ => {
                self.add_error(format!("unexpected token {}", self.cur_token));
                None
            }
        }
    }

    /// Parse an integer literal
    fn parse_integer_literal(&mut self) -> Option<Expr> {
        match self.cur_token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Literal(Value::integer(value))),
            Err(e) => {
                self.add_error(format!(
                    "could not parse {} as integer: {}",
                    self.cur_token.literal, e
                ));
                None
            }
        }
    }

    /// Parse a float literal
    fn parse_float_literal(&mut self) -> Option<Expr> {
        match self.cur_token.literal.parse::<f64>() {
            Ok(value) => Some(Expr::Literal(Value::float(value))),
            Err(e) => {
                self.add_error(format!(
                    "could not parse {} as float: {}",
                    self.cur_token.literal, e
                ));
                None
            }
        }
    }

    /// Parse keyword literals and the `not` prefix
    fn parse_keyword_expression(&mut self) -> Option<Expr> {
        match self.cur_token.literal.as_str() {
            "null" | "nil" => Some(Expr::Literal(Value::Null)),
            "true" => Some(Expr::Literal(Value::boolean(true))),
            "false" => Some(Expr::Literal(Value::boolean(false))),
            "not" => {
                self.next_token();
                let operand = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::unary(UnaryOp::Not, operand))
            }
            _ => {
                self.add_error(format!("unexpected keyword {}", self.cur_token.literal));
                None
            }
        }
    }

    /// Parse a unary operator expression (`!x`, `-x`)
    fn parse_unary_expression(&mut self) -> Option<Expr> {
        let op = match self.cur_token.literal.as_str() {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            _ => {
                self.add_error(format!("unexpected operator {}", self.cur_token.literal));
                return None;
            }
        };

        self.next_token();

        // Fold negative number literals
        if op == UnaryOp::Neg {
            if self.cur_token.token_type == TokenType::Integer {
                if self.cur_token.literal == "9223372036854775808" {
                    return Some(Expr::Literal(Value::integer(i64::MIN)));
                }
                if let Ok(value) = self.cur_token.literal.parse::<i64>() {
                    if !self.peek_token.is_punctuator(".") {
                        return Some(Expr::Literal(Value::integer(-value)));
                    }
                }
            } else if self.cur_token.token_type == TokenType::Float {
                if let Ok(value) = self.cur_token.literal.parse::<f64>() {
                    return Some(Expr::Literal(Value::float(-value)));
                }
            }
        }

        let operand = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::unary(op, operand))
    }

    /// Parse a grouped expression or a parenthesized list
    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token(); // move past (

        if self.cur_token.is_punctuator(")") {
            return Some(Expr::List(Vec::new()));
        }

        let first = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token.is_punctuator(",") {
            let mut items = vec![first];
            while self.peek_token.is_punctuator(",") {
                self.next_token(); // consume comma
                self.next_token(); // move to next expression
                items.push(self.parse_expression(Precedence::Lowest)?);
            }
            self.expect_closing_paren()?;
            return Some(Expr::List(items));
        }

        self.expect_closing_paren()?;
        Some(first)
    }

    fn expect_closing_paren(&mut self) -> Option<()> {
        if self.peek_token.is_punctuator(")") {
            self.next_token();
            Some(())
        } else {
            let token = self.peek_token.clone();
            self.add_error_at(format!("expected ')', got {}", token), &token);
            None
        }
    }

    /// Parse an infix expression
    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        match self.cur_token.token_type {
            TokenType::Operator | TokenType::Keyword => match self.cur_token.literal.as_str() {
                "in" => self.parse_in_expression(left, false),
                "not" => {
                    if !self.peek_token.is_keyword("in") {
                        let token = self.peek_token.clone();
                        let message = format!("expected 'in' after 'not', got {}", token);
                        self.add_error_at(message, &token);
                        return None;
                    }
                    self.next_token();
                    self.parse_in_expression(left, true)
                }
                _ => self.parse_binary_expression(left),
            },
            TokenType::Punctuator => self.parse_path_segment(left),
            _ => {
                self.add_error(format!("unexpected infix token {}", self.cur_token));
                None
            }
        }
    }

    /// Parse a binary operator expression
    fn parse_binary_expression(&mut self, left: Expr) -> Option<Expr> {
        let Some(op) = BinaryOp::from_literal(&self.cur_token.literal) else {
            self.add_error(format!("unknown operator {}", self.cur_token.literal));
            return None;
        };
        let precedence = Precedence::for_operator(&self.cur_token.literal);

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expr::binary(op, left, right))
    }

    /// Parse a membership test; `cur_token` is the `in` keyword
    fn parse_in_expression(&mut self, left: Expr, negated: bool) -> Option<Expr> {
        self.next_token();
        let haystack = self.parse_expression(Precedence::Equals)?;

        Some(Expr::In {
            needle: Box::new(left),
            haystack: Box::new(haystack),
            negated,
        })
    }

    /// Extend a path with `.segment`
    fn parse_path_segment(&mut self, left: Expr) -> Option<Expr> {
        let Expr::Path(mut path) = left else {
            self.add_error("path access on a non-path expression");
            return None;
        };

        self.next_token();
        match self.cur_token.token_type {
            // Keywords are valid field names after a dot (`filter.in`)
            TokenType::Identifier | TokenType::Integer | TokenType::Keyword => {
                path.push(self.cur_token.literal.clone());
                Some(Expr::Path(path))
            }
            // `rows.0.1` lexes the trailing indices as the float `0.1`
            TokenType::Float
                if self
                    .cur_token
                    .literal
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b == b'.') =>
            {
                for index in self.cur_token.literal.split('.') {
                    path.push(index);
                }
                Some(Expr::Path(path))
            }
            _ => {
                self.add_error(format!(
                    "expected field name after '.', got {}",
                    self.cur_token
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        Parser::new(input)
            .parse()
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", input, e))
    }

    fn parse_err(input: &str) -> ParseError {
        match Parser::new(input).parse() {
            Ok(expr) => panic!("expected {:?} to fail, got {}", input, expr),
            Err(e) => e,
        }
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(parse("age"), Expr::Path(Path::new("age")));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("42"), Expr::Literal(Value::integer(42)));
        assert_eq!(parse("-7"), Expr::Literal(Value::integer(-7)));
        assert_eq!(parse("2.5"), Expr::Literal(Value::float(2.5)));
        assert_eq!(parse("'x'"), Expr::Literal(Value::text("x")));
        assert_eq!(parse("nil"), Expr::Literal(Value::Null));
        assert_eq!(parse("TRUE"), Expr::Literal(Value::boolean(true)));
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(
            parse("age > 18 and name != null").to_string(),
            "((age > 18) and (name != null))"
        );
        assert_eq!(parse("a or b and c").to_string(), "(a or (b and c))");
        assert_eq!(parse("a + b * c > 10").to_string(), "((a + (b * c)) > 10)");
        assert_eq!(parse("1 - 2 - 3").to_string(), "((1 - 2) - 3)");
        assert_eq!(parse("(a or b) and c").to_string(), "((a or b) and c)");
    }

    #[test]
    fn test_not_binds_tighter_than_comparison() {
        assert_eq!(parse("not a == b").to_string(), "((not a) == b)");
        assert_eq!(parse("!(a == b)").to_string(), "(not (a == b))");
    }

    #[test]
    fn test_symbolic_connectives() {
        assert_eq!(parse("a && b || c").to_string(), "((a and b) or c)");
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(parse("user.address.city").to_string(), "user.address.city");
        assert_eq!(parse("ids.0").to_string(), "ids.0");
        assert_eq!(parse("rows.0.1").to_string(), "rows.0.1");
        assert_eq!(
            parse("user.name == 'bob'").to_string(),
            "(user.name == 'bob')"
        );
    }

    #[test]
    fn test_parse_membership() {
        assert_eq!(parse("id in ids").to_string(), "(id in ids)");
        assert_eq!(
            parse("status not in ('a', 'b')").to_string(),
            "(status not in ('a', 'b'))"
        );
        assert_eq!(parse("x in xs and y").to_string(), "((x in xs) and y)");
    }

    #[test]
    fn test_truncated_expression() {
        let err = parse_err("age >");
        assert!(err.message.contains("unexpected end"), "{}", err);
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_err("(a and b");
        assert!(err.message.contains("expected ')'"), "{}", err);
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_err("a b");
        assert!(err.message.contains("unexpected token"), "{}", err);
    }

    #[test]
    fn test_lexer_error_surfaces() {
        let err = parse_err("a = 1");
        assert!(err.message.contains("=="), "{}", err);
        assert_eq!(err.position.column, 3);
    }

    #[test]
    fn test_empty_expression() {
        let err = parse_err("   ");
        assert_eq!(err.message, "empty expression");
    }

    #[test]
    fn test_nesting_limit() {
        let depth = MAX_NESTING_DEPTH - 1;
        let ok = format!("{}a{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&ok), Expr::Path(Path::new("a")));

        let deep = format!("{}a{}", "(".repeat(5000), ")".repeat(5000));
        let err = parse_err(&deep);
        assert_eq!(err.message, "expression nested too deeply");

        let err = parse_err(&format!("{}a", "!".repeat(5000)));
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn test_not_without_in() {
        let err = parse_err("a not b");
        assert!(err.message.contains("expected 'in'"), "{}", err);
    }
}
