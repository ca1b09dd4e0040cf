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

//! Test-expression lexer (tokenizer)

use super::token::{
    is_keyword, is_operator, is_operator_char, is_punctuator, Position, Token, TokenType,
};

/// Lexer for tokenizing test expressions
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input (points to current char)
    position: usize,
    /// Current reading position in input (after current char)
    read_position: usize,
    /// Current character under examination
    ch: char,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            read_position: 0,
            ch: '\0',
        };
        lexer.read_char();
        lexer
    }

    /// Read the next character
    fn read_char(&mut self) {
        if self.read_position >= self.input.len() {
            self.ch = '\0';
            self.position = self.input.len();
        } else {
            self.ch = self.input[self.read_position];
            self.position = self.read_position;
        }
        self.read_position += 1;
    }

    /// Peek at the next character without advancing
    fn peek_char(&self) -> char {
        self.input.get(self.read_position).copied().unwrap_or('\0')
    }

    fn pos(&self) -> Position {
        Position::new(self.position, self.position + 1)
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let pos = self.pos();

        if self.at_end() {
            return Token::eof(pos);
        }

        match self.ch {
            '\'' | '"' => self.read_string_literal(pos),

            c if c.is_ascii_digit() => {
                let literal = self.read_number();
                if literal.contains(['.', 'e', 'E']) {
                    Token::new(TokenType::Float, literal, pos)
                } else {
                    Token::new(TokenType::Integer, literal, pos)
                }
            }

            c if is_punctuator(c) => {
                self.read_char();
                Token::new(TokenType::Punctuator, c.to_string(), pos)
            }

            c if is_operator_char(c) => self.read_operator(pos),

            c if c.is_alphabetic() || c == '_' => {
                let literal = self.read_identifier();
                if is_keyword(&literal) {
                    Token::new(TokenType::Keyword, literal.to_ascii_lowercase(), pos)
                } else {
                    Token::new(TokenType::Identifier, literal, pos)
                }
            }

            c => {
                self.read_char();
                Token::error(
                    format!("unrecognized character: {:?}", c),
                    c.to_string(),
                    pos,
                )
            }
        }
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while !self.at_end() && self.ch.is_whitespace() {
            self.read_char();
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while !self.at_end() && (self.ch.is_alphanumeric() || self.ch == '_') {
            result.push(self.ch);
            self.read_char();
        }
        result
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> String {
        let mut result = String::new();

        while self.ch.is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
        }

        // A dot only belongs to the number when a digit follows
        if self.ch == '.' && self.peek_char().is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
            while self.ch.is_ascii_digit() {
                result.push(self.ch);
                self.read_char();
            }
        }

        if (self.ch == 'e' || self.ch == 'E')
            && (self.peek_char().is_ascii_digit() || matches!(self.peek_char(), '+' | '-'))
        {
            result.push(self.ch);
            self.read_char();
            if self.ch == '+' || self.ch == '-' {
                result.push(self.ch);
                self.read_char();
            }
            while self.ch.is_ascii_digit() {
                result.push(self.ch);
                self.read_char();
            }
        }

        result
    }

    /// Read a quoted string literal, resolving backslash escapes
    fn read_string_literal(&mut self, pos: Position) -> Token {
        let quote = self.ch;
        let mut result = String::new();
        self.read_char(); // consume opening quote

        loop {
            if self.at_end() {
                return Token::error("unterminated string literal", result, pos);
            }
            match self.ch {
                c if c == quote => {
                    self.read_char();
                    return Token::new(TokenType::String, result, pos);
                }
                '\\' => {
                    self.read_char();
                    if self.at_end() {
                        return Token::error("unterminated string literal", result, pos);
                    }
                    result.push(match self.ch {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                    self.read_char();
                }
                c => {
                    result.push(c);
                    self.read_char();
                }
            }
        }
    }

    /// Read an operator, preferring the two-character form
    fn read_operator(&mut self, pos: Position) -> Token {
        let first = self.ch;
        let pair: String = [first, self.peek_char()].iter().collect();

        if is_operator(&pair) {
            self.read_char();
            self.read_char();
            return Token::new(TokenType::Operator, pair, pos);
        }

        self.read_char();
        let single = first.to_string();
        if is_operator(&single) {
            return Token::new(TokenType::Operator, single, pos);
        }

        let hint = match first {
            '=' => "unexpected '=', use '==' for equality",
            '&' => "unexpected '&', use '&&' or 'and'",
            '|' => "unexpected '|', use '||' or 'or'",
            _ => "unrecognized operator",
        };
        Token::error(hint, single, pos)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<(TokenType, String)> {
        Lexer::new(input)
            .map(|t| (t.token_type, t.literal))
            .collect()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            tokens("age >= 18"),
            vec![
                (TokenType::Identifier, "age".to_string()),
                (TokenType::Operator, ">=".to_string()),
                (TokenType::Integer, "18".to_string()),
            ]
        );
    }

    #[test]
    fn test_keywords_are_lowercased() {
        let toks = tokens("a AND b Or NOT c");
        assert_eq!(toks[1], (TokenType::Keyword, "and".to_string()));
        assert_eq!(toks[3], (TokenType::Keyword, "or".to_string()));
        assert_eq!(toks[4], (TokenType::Keyword, "not".to_string()));
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            tokens("user.address.city"),
            vec![
                (TokenType::Identifier, "user".to_string()),
                (TokenType::Punctuator, ".".to_string()),
                (TokenType::Identifier, "address".to_string()),
                (TokenType::Punctuator, ".".to_string()),
                (TokenType::Identifier, "city".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        let toks = tokens(r#"name != '' and title == "it\'s""#);
        assert_eq!(toks[2], (TokenType::String, String::new()));
        assert_eq!(toks[6], (TokenType::String, "it's".to_string()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("3.25")[0].0, TokenType::Float);
        assert_eq!(tokens("1e3")[0].0, TokenType::Float);
        assert_eq!(tokens("42")[0].0, TokenType::Integer);
        // list index segment followed by another segment
        let toks = tokens("ids.0.name");
        assert_eq!(toks[2], (TokenType::Integer, "0".to_string()));
        assert_eq!(toks[3], (TokenType::Punctuator, ".".to_string()));
    }

    #[test]
    fn test_bad_operator() {
        let mut lexer = Lexer::new("a = 1");
        lexer.next_token();
        let tok = lexer.next_token();
        assert!(tok.is_error());
        assert!(tok.error.unwrap().contains("=="));
    }

    #[test]
    fn test_unterminated_string() {
        let tok = Lexer::new("'abc").next_token();
        assert!(tok.is_error());
        assert_eq!(tok.error.as_deref(), Some("unterminated string literal"));
    }
}
