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

use lrpar::{LexError as _, LexParseError, Lexeme};
use tracing::debug;

use crate::error::ParseError;
use crate::parser::lex::{self, Syntax};
use crate::parser::token::token_display;
use crate::parser::visitor::{visit_formula, visit_query};
use crate::parser::{Expr, ParseTree};
use crate::query::QueryState;

/// Parses `input` into a concrete parse tree of the given sub-language.
///
/// A syntactically invalid input yields [ParseError::Syntax]; a valid
/// sentence followed by trailing input, whether the lexer or the grammar
/// stumbles on it, yields [ParseError::IncompletelyConsumed].
pub fn parse(input: &str, syntax: Syntax) -> Result<ParseTree, ParseError> {
    debug!(input, ?syntax, "parsing");
    let result = parse_tree(input, syntax).map_err(|failure| classify(input, syntax, failure));
    if let Err(err) = &result {
        debug!(input, error = %err, "failed to parse");
    }
    result
}

/// Parses and visits a query: `avg:aws.ec2.cpuutilization{role:cache} by {az}`.
pub fn parse_query(input: &str) -> Result<QueryState, ParseError> {
    visit_query(&parse(input, Syntax::Query)?)
}

/// Parses and visits a formula: `(abs(cpu) * 2 - reqs) / log2(cpu)`.
pub fn parse_formula(input: &str) -> Result<Expr, ParseError> {
    visit_formula(&parse(input, Syntax::Formula)?)
}

fn syntax_error(input: &str, position: usize, message: String) -> ParseError {
    ParseError::Syntax {
        input: input.into(),
        position,
        message,
    }
}

/// Where and why the lexer or the grammar gave up.
struct Failure {
    position: usize,
    message: String,
}

fn classify(input: &str, syntax: Syntax, failure: Failure) -> ParseError {
    let Failure { position, message } = failure;
    if input[position..].trim().is_empty() {
        syntax_error(input, position, "unexpected end of input".into())
    } else if is_complete_prefix(input, position, syntax) {
        ParseError::IncompletelyConsumed {
            input: input.into(),
            position,
        }
    } else {
        syntax_error(input, position, message)
    }
}

fn is_complete_prefix(input: &str, position: usize, syntax: Syntax) -> bool {
    let prefix = &input[..position];
    !prefix.trim().is_empty() && parse_tree(prefix, syntax).is_ok()
}

/// Runs the lexer and the grammar over `input`.
fn parse_tree(input: &str, syntax: Syntax) -> Result<ParseTree, Failure> {
    let lexer = lex::lexer(input, syntax).map_err(|e| Failure {
        position: e.position,
        message: e.message,
    })?;
    let (res, errs) = crate::query_y::parse(&lexer);

    if let Some(err) = errs.first() {
        return Err(match err {
            LexParseError::ParseError(e) => {
                let lexeme = e.lexeme();
                let span = lexeme.span();
                let text = &input[span.start()..span.end()];
                Failure {
                    position: span.start(),
                    message: format!("unexpected {} {text:?}", token_display(lexeme.tok_id())),
                }
            }
            LexParseError::LexError(e) => Failure {
                position: e.span().start(),
                message: "invalid token".into(),
            },
        });
    }

    match res {
        Some(Ok(tree)) => Ok(tree),
        Some(Err(message)) => Err(Failure {
            position: 0,
            message,
        }),
        None => Err(Failure {
            position: 0,
            message: "empty parse result".into(),
        }),
    }
}
