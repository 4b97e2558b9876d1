// Copyright 2023 Greptime Team
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

//! Hand written lexer feeding the grmtools parser.
//!
//! The query language is context sensitive: `*` is a wildcard inside a
//! filter but a multiplication in a formula, `avg` is an aggregation in front
//! of a `:` but a metric after it, and tag values may contain `:` and `/`.
//! The lexer therefore tracks a small [Context] stack instead of relying on a
//! generated DFA.

use cfgrammar::NewlineCache;
use lazy_static::lazy_static;
use lrlex::{DefaultLexeme, DefaultLexerTypes, LRNonStreamingLexer};
use lrpar::Lexeme;
use regex::Regex;

use crate::parser::token::*;

pub type LexemeType = DefaultLexeme<TokenId>;

lazy_static! {
    static ref TAG_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z_./](?:[A-Za-z0-9_./-]*[A-Za-z0-9_./])?$").unwrap();
    static ref TAG_VALUE_RE: Regex =
        Regex::new(r"^(?:\*|\*?[A-Za-z0-9_./:-]+\*?)$").unwrap();
    static ref METRIC_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]*)*$").unwrap();
}

/// Sub-language selected by the zero width start token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Query,
    Formula,
}

/// Token level rules that can be checked without building a parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRule {
    TagName,
    TagValue,
    /// template variable name, without the leading `$`
    TemplateVariable,
    MetricName,
}

/// Checks a single token against the lexical rules of the query language.
/// Never panics, whatever the input.
pub fn is_valid_token(rule: TokenRule, token: &str) -> bool {
    match rule {
        TokenRule::TagName | TokenRule::TemplateVariable => TAG_NAME_RE.is_match(token),
        TokenRule::TagValue => TAG_VALUE_RE.is_match(token),
        TokenRule::MetricName => METRIC_NAME_RE.is_match(token),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: usize,
    pub message: String,
}

impl LexError {
    fn new(position: usize, message: String) -> Self {
        Self { position, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Query,
    Filter,
    Grouping,
    Arguments,
    Formula,
}

pub fn lexer(
    input: &str,
    syntax: Syntax,
) -> Result<LRNonStreamingLexer<'_, '_, DefaultLexerTypes<TokenId>>, LexError> {
    let lexemes = Lexer::new(input, syntax)
        .tokenize()?
        .into_iter()
        .map(Ok)
        .collect();
    Ok(LRNonStreamingLexer::new(input, lexemes, NewlineCache::new()))
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    ctx: Context,
    prev: Option<TokenId>,
    expect_value: bool,
    lexemes: Vec<LexemeType>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_chunk_end(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == '}'
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, syntax: Syntax) -> Self {
        let ctx = match syntax {
            Syntax::Query => Context::Query,
            Syntax::Formula => Context::Formula,
        };
        let mut lexer = Self {
            input,
            pos: 0,
            ctx,
            prev: None,
            expect_value: false,
            lexemes: vec![],
        };
        let start = match syntax {
            Syntax::Query => T_START_QUERY,
            Syntax::Formula => T_START_FORMULA,
        };
        lexer.push(start, 0);
        lexer
    }

    fn tokenize(mut self) -> Result<Vec<LexemeType>, LexError> {
        loop {
            if !self.expect_value {
                self.skip_whitespace();
            }
            let Some(c) = self.peek() else {
                break;
            };
            match self.ctx {
                Context::Query => self.lex_query(c)?,
                Context::Filter => self.lex_filter(c)?,
                Context::Grouping => self.lex_grouping(c)?,
                Context::Arguments => self.lex_arguments(c)?,
                Context::Formula => self.lex_formula(c)?,
            }
        }
        if self.expect_value {
            return Err(LexError::new(self.pos, "missing tag value".into()));
        }
        Ok(self.lexemes)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset..)?.chars().next()
    }

    fn skip_whitespace(&mut self) {
        self.scan_while(char::is_whitespace);
    }

    /// Advances over the longest prefix matching `pred`, returning it.
    fn scan_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let len = self.input[start..]
            .find(|c: char| !pred(c))
            .unwrap_or(self.input.len() - start);
        self.pos += len;
        &self.input[start..self.pos]
    }

    /// Pushes a token ending at the current position.
    fn push(&mut self, tok: TokenId, start: usize) {
        self.lexemes
            .push(LexemeType::new(tok, start, self.pos - start));
        self.prev = Some(tok);
    }

    fn single(&mut self, tok: TokenId, c: char) {
        let start = self.pos;
        self.pos += c.len_utf8();
        self.push(tok, start);
    }

    fn unexpected(&self, c: char) -> LexError {
        LexError::new(self.pos, format!("unexpected character {c:?}"))
    }

    fn lex_query(&mut self, c: char) -> Result<(), LexError> {
        match c {
            '{' => {
                self.ctx = if self.prev == Some(T_BY) {
                    Context::Grouping
                } else {
                    Context::Filter
                };
                self.single(T_LEFT_BRACE, c);
            }
            '(' => {
                if matches!(self.prev, Some(T_ROLLUP) | Some(T_FILL)) {
                    self.ctx = Context::Arguments;
                }
                self.single(T_LEFT_PAREN, c);
            }
            ')' => self.single(T_RIGHT_PAREN, c),
            ':' => self.single(T_COLON, c),
            '.' => self.lex_method()?,
            c if is_word_char(c) => self.lex_word()?,
            _ => return Err(self.unexpected(c)),
        }
        Ok(())
    }

    /// `.as_count`, `.as_rate`, `.rollup` and `.fill`, with the dot folded
    /// into the keyword
    fn lex_method(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        let tok = match self.scan_while(is_word_char) {
            "as_count" => T_AS_COUNT,
            "as_rate" => T_AS_RATE,
            "rollup" => T_ROLLUP,
            "fill" => T_FILL,
            "" => return Err(LexError::new(start, "expected function after '.'".into())),
            other => {
                return Err(LexError::new(
                    start,
                    format!("unknown query function '.{other}'"),
                ))
            }
        };
        self.push(tok, start);
        Ok(())
    }

    /// true when the text at the current `.` is a `.word(` function call
    fn method_call_ahead(&self) -> bool {
        let rest = &self.input[self.pos + 1..];
        let len = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        len > 0 && rest[len..].starts_with('(')
    }

    fn lex_word(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let word = self.scan_while(is_word_char);

        if self.prev == Some(T_START_QUERY) && self.peek() == Some(':') {
            self.push(T_IDENTIFIER, start);
            return Ok(());
        }

        if matches!(self.prev, Some(T_START_QUERY) | Some(T_COLON)) {
            while self.peek() == Some('.') && !self.method_call_ahead() {
                self.pos += 1;
                self.scan_while(is_word_char);
            }
            let name = &self.input[start..self.pos];
            if !is_valid_token(TokenRule::MetricName, name) {
                return Err(LexError::new(start, format!("invalid metric name '{name}'")));
            }
            self.push(T_METRIC_NAME, start);
            return Ok(());
        }

        if word == "by" {
            self.push(T_BY, start);
            return Ok(());
        }
        Err(LexError::new(start, format!("unexpected word '{word}'")))
    }

    fn lex_template_variable(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        let name = self.scan_while(|c| !is_chunk_end(c) && c != ':');
        // a bare `$` is a legal, if suspect, template variable
        if !name.is_empty() && !is_valid_token(TokenRule::TemplateVariable, name) {
            return Err(LexError::new(
                start,
                format!("invalid template variable '${name}'"),
            ));
        }
        self.push(T_TMPL_VAR, start);
        Ok(())
    }

    fn lex_tag_name(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let name = self.scan_while(|c| !is_chunk_end(c) && c != ':');
        if !is_valid_token(TokenRule::TagName, name) {
            return Err(LexError::new(start, format!("invalid tag name '{name}'")));
        }
        self.push(T_TAG_NAME, start);
        Ok(())
    }

    fn lex_filter(&mut self, c: char) -> Result<(), LexError> {
        if self.expect_value {
            self.expect_value = false;
            let start = self.pos;
            let value = self.scan_while(|c| !is_chunk_end(c));
            if value.is_empty() {
                return Err(LexError::new(start, "missing tag value".into()));
            }
            if !is_valid_token(TokenRule::TagValue, value) {
                return Err(LexError::new(start, format!("invalid tag value '{value}'")));
            }
            self.push(T_TAG_VALUE, start);
            return Ok(());
        }

        match c {
            '}' => {
                self.ctx = Context::Query;
                self.single(T_RIGHT_BRACE, c);
            }
            ',' => self.single(T_COMMA, c),
            '!' => self.single(T_NOT, c),
            ':' if self.prev == Some(T_TAG_NAME) => {
                self.single(T_COLON, c);
                self.expect_value = true;
            }
            '$' => self.lex_template_variable()?,
            '*' if self.prev == Some(T_LEFT_BRACE) => self.single(T_WILDCARD, c),
            ':' => return Err(self.unexpected(c)),
            _ => self.lex_tag_name()?,
        }
        Ok(())
    }

    fn lex_grouping(&mut self, c: char) -> Result<(), LexError> {
        match c {
            '}' => {
                self.ctx = Context::Query;
                self.single(T_RIGHT_BRACE, c);
            }
            ',' => self.single(T_COMMA, c),
            '$' => self.lex_template_variable()?,
            ':' => return Err(self.unexpected(c)),
            _ => self.lex_tag_name()?,
        }
        Ok(())
    }

    fn lex_arguments(&mut self, c: char) -> Result<(), LexError> {
        match c {
            ')' => {
                self.ctx = Context::Query;
                self.single(T_RIGHT_PAREN, c);
            }
            ',' => self.single(T_COMMA, c),
            c if c.is_ascii_digit() => {
                let start = self.pos;
                self.scan_while(|c| c.is_ascii_digit());
                if self.peek().is_some_and(is_word_char) {
                    return Err(LexError::new(start, "invalid number".into()));
                }
                self.push(T_NUMBER, start);
            }
            c if is_word_char(c) => {
                let start = self.pos;
                self.scan_while(is_word_char);
                self.push(T_IDENTIFIER, start);
            }
            _ => return Err(self.unexpected(c)),
        }
        Ok(())
    }

    fn lex_formula(&mut self, c: char) -> Result<(), LexError> {
        match c {
            '+' => self.single(T_ADD, c),
            '-' => self.single(T_SUB, c),
            '*' => self.single(T_MUL, c),
            '/' => self.single(T_DIV, c),
            ',' => self.single(T_COMMA, c),
            '(' => self.single(T_LEFT_PAREN, c),
            ')' => self.single(T_RIGHT_PAREN, c),
            '\'' | '"' => self.lex_string(c)?,
            c if c.is_ascii_digit() => self.lex_number()?,
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos;
                self.scan_while(is_word_char);
                self.push(T_IDENTIFIER, start);
            }
            _ => return Err(self.unexpected(c)),
        }
        Ok(())
    }

    /// `12`, `1.5`, `.5`, `5.`, `1e-7`
    fn lex_number(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.scan_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.pos += 1;
            self.scan_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+') | Some('-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1 + sign;
                self.scan_while(|c| c.is_ascii_digit());
            }
        }
        if self.peek().is_some_and(|c| is_word_char(c) || c == '.') {
            return Err(LexError::new(
                start,
                format!("invalid number '{}'", &self.input[start..=self.pos]),
            ));
        }
        self.push(T_NUMBER, start);
        Ok(())
    }

    fn lex_string(&mut self, quote: char) -> Result<(), LexError> {
        let start = self.pos;
        let mut chars = self.input[start + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                self.pos = start + 1 + i + 1;
                self.push(T_STRING, start);
                return Ok(());
            }
        }
        Err(LexError::new(start, "unterminated string".into()))
    }
}
