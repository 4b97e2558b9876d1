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

//! Helpers called from the grammar actions in `query.y`.

use lrlex::DefaultLexerTypes;
use lrpar::{Lexeme, NonStreamingLexer, Span};

use crate::parser::lex::LexemeType;
use crate::parser::token::TokenId;
use crate::parser::{ParseTree, Rule};

type Lexer<'a, 'input> = &'a dyn NonStreamingLexer<'input, DefaultLexerTypes<TokenId>>;

// caller MUST pay attention to the index out of bounds issue
pub fn span_to_string(lexer: Lexer<'_, '_>, span: Span) -> String {
    lexer.span_str(span).to_string()
}

pub fn leaf(
    rule: Rule,
    lexer: Lexer<'_, '_>,
    lexeme: &Result<LexemeType, LexemeType>,
) -> Result<ParseTree, String> {
    let span = lexeme
        .as_ref()
        .map_err(|l| format!("missing {rule} at position {}", l.span().start()))?
        .span();
    Ok(ParseTree::new(
        rule,
        span_to_string(lexer, span),
        span.start(),
        span.end(),
    ))
}

pub fn node(rule: Rule, lexer: Lexer<'_, '_>, span: Span, children: Vec<ParseTree>) -> ParseTree {
    ParseTree::new(rule, span_to_string(lexer, span), span.start(), span.end())
        .with_children(children)
}

pub fn append(mut nodes: Vec<ParseTree>, next: ParseTree) -> Result<Vec<ParseTree>, String> {
    nodes.push(next);
    Ok(nodes)
}

/// The query production has independently optional parts; absent ones are
/// simply not present as children.
pub fn query_node(
    lexer: Lexer<'_, '_>,
    span: Span,
    parts: Vec<Option<ParseTree>>,
    post_functions: Vec<ParseTree>,
) -> Result<ParseTree, String> {
    let children = parts.into_iter().flatten().chain(post_functions).collect();
    Ok(node(Rule::Query, lexer, span, children))
}

pub fn binary(
    lexer: Lexer<'_, '_>,
    span: Span,
    lhs: ParseTree,
    op: &Result<LexemeType, LexemeType>,
    rhs: ParseTree,
) -> Result<ParseTree, String> {
    let op = leaf(Rule::Operator, lexer, op)?;
    Ok(node(Rule::BinaryExpr, lexer, span, vec![lhs, op, rhs]))
}

/// `- 5` is a single literal, whatever whitespace sits after the sign
pub fn negative_number(
    lexer: Lexer<'_, '_>,
    span: Span,
    number: &Result<LexemeType, LexemeType>,
) -> Result<ParseTree, String> {
    let number = leaf(Rule::Number, lexer, number)?;
    Ok(ParseTree::new(
        Rule::Number,
        format!("-{}", number.text),
        span.start(),
        span.end(),
    ))
}
