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

//! Formulas combine named queries with arithmetic and function calls.

pub mod functions;

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt::{self, Display};

use tracing::debug;

use crate::error::{FormulaError, ParseError};
use crate::parser::{parse_formula, Expr, Identifier};
use crate::query::QueryState;
use crate::util::{walk_expr, ExprVisitor};

/// Dictionary form of a formula, as handed to dashboard definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize))]
pub struct FormulaDefinition {
    pub formula: String,
    #[cfg_attr(feature = "ser", serde(skip_serializing_if = "Option::is_none"))]
    pub alias: Option<String>,
}

#[cfg(feature = "ser")]
impl FormulaDefinition {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// A formula expression with an optional display alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Formula {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parses the textual form, e.g. `(abs(cpu) * 2 - reqs) / log2(cpu)`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_formula(text).map(Self::new)
    }

    /// Checks that every identifier refers to one of `queries`.
    pub fn validate(&self, queries: &[QueryState]) -> Result<(), FormulaError> {
        validate_identifiers(&self.expr, queries.iter().map(|q| q.name.as_str()))
    }

    pub fn as_dict(&self) -> FormulaDefinition {
        FormulaDefinition {
            formula: self.expr.to_string(),
            alias: self.alias.clone(),
        }
    }
}

impl From<Expr> for Formula {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

struct IdentifierCollector {
    names: Vec<String>,
}

impl ExprVisitor for IdentifierCollector {
    type Error = Infallible;

    fn pre_visit(&mut self, expr: &Expr) -> Result<bool, Self::Error> {
        if let Expr::Identifier(Identifier { name }) = expr {
            self.names.push(name.clone());
        }
        Ok(true)
    }
}

/// Names of the identifier leaves of `expr`, in walk order, repeats included.
pub fn find_identifiers(expr: &Expr) -> Vec<String> {
    let mut collector = IdentifierCollector { names: vec![] };
    if let Err(never) = walk_expr(&mut collector, expr) {
        match never {}
    }
    collector.names
}

/// Fails with the sorted, deduplicated identifiers of `expr` that are not
/// among `names`.
pub fn validate_identifiers<'a>(
    expr: &Expr,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), FormulaError> {
    let defined: HashSet<&str> = names.into_iter().collect();
    let mut unresolved: Vec<String> = find_identifiers(expr)
        .into_iter()
        .filter(|name| !defined.contains(name.as_str()))
        .collect();
    if unresolved.is_empty() {
        return Ok(());
    }
    unresolved.sort();
    unresolved.dedup();
    debug!(?unresolved, formula = %expr, "unresolved formula identifiers");
    Err(FormulaError::UnresolvedIdentifiers {
        identifiers: unresolved,
        formula: expr.to_string(),
    })
}
