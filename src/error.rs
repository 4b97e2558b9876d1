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

use thiserror::Error;

/// Errors raised while constructing a query, either through the builder or
/// while resolving keywords of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct QueryValidationError(pub String);

impl QueryValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// a function argument is missing, has the wrong type, or is out of its domain
    #[error("{0}")]
    InvalidArgument(String),

    #[error(
        "identifier(s) {} in the formula '{formula}' not present in any query",
        quote_names(.identifiers)
    )]
    UnresolvedIdentifiers {
        identifiers: Vec<String>,
        formula: String,
    },
}

fn quote_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn tail<'a>(input: &'a str, position: &usize) -> &'a str {
    input.get(*position..).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error at position {position} of {input:?}: {message}")]
    Syntax {
        input: String,
        position: usize,
        message: String,
    },

    /// A valid sentence followed by trailing input.
    #[error("input {input:?} not completely consumed, unexpected {:?} at position {position}", tail(.input, .position))]
    IncompletelyConsumed { input: String, position: usize },

    #[error("{message} (at position {position})")]
    Invalid { position: usize, message: String },

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Query(#[from] QueryValidationError),
}

impl ParseError {
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Syntax { position, .. }
            | ParseError::IncompletelyConsumed { position, .. }
            | ParseError::Invalid { position, .. } => Some(*position),
            ParseError::Formula(_) | ParseError::Query(_) => None,
        }
    }
}
